//! The fixed, ordered catalog of demonstration operations.
//!
//! Each [`Operation`] is a named descriptor that can be executed on its own
//! against any [`BookStore`]; [`catalog`] lists them in run order.

use std::fmt;

use mongodb::bson::{self, Bson, Document};
use serde::de::DeserializeOwned;

use crate::errors::AppError;
use crate::models::{UpdateOutcome, fields};
use crate::pipeline::{Accumulator, GroupKey, Pipeline, ProjectField, Stage};
use crate::query_builder::{Filter, FindQuery, IndexKeys, Patch, Projection, SortKeys, SortOrder};
use crate::store::BookStore;

/// Books per page in the pagination examples.
pub const PAGE_SIZE: i64 = 5;

/// Price applied by the point update.
pub const REPRICED_TO: f64 = 13.99;

pub const RECENT_YEAR: i32 = 2010;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Find(FindQuery),
    Update { filter: Filter, patch: Patch },
    Delete(Filter),
    Aggregate(Pipeline),
    CreateIndex(IndexKeys),
    Explain(FindQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Documents(Vec<Document>),
    Updated(UpdateOutcome),
    Deleted(u64),
    IndexCreated(String),
    Explained(Document),
}

impl Outcome {
    pub fn documents(&self) -> Option<&[Document]> {
        match self {
            Outcome::Documents(documents) => Some(documents),
            _ => None,
        }
    }

    /// Decodes returned documents into `T`. Non-document outcomes decode to nothing.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, AppError> {
        self.documents()
            .unwrap_or_default()
            .iter()
            .map(|d| bson::from_document(d.clone()).map_err(AppError::from))
            .collect()
    }
}

fn write_json(f: &mut fmt::Formatter<'_>, value: Bson) -> fmt::Result {
    let json = serde_json::to_string_pretty(&value.into_relaxed_extjson()).map_err(|_| fmt::Error)?;
    f.write_str(&json)
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Documents(documents) => write_json(
                f,
                Bson::Array(documents.iter().cloned().map(Bson::Document).collect()),
            ),
            Outcome::Updated(outcome) => write!(
                f,
                "{} (matched {})",
                outcome.modified, outcome.matched
            ),
            Outcome::Deleted(count) => write!(f, "{count}"),
            Outcome::IndexCreated(name) => f.write_str(name),
            Outcome::Explained(stats) => write_json(f, Bson::Document(stats.clone())),
        }
    }
}

/// A named step of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: &'static str,
    /// Heading printed before the result.
    pub label: &'static str,
    pub action: Action,
}

impl Operation {
    fn new(name: &'static str, label: &'static str, action: Action) -> Self {
        Self {
            name,
            label,
            action,
        }
    }

    pub async fn execute(&self, store: &dyn BookStore) -> Result<Outcome, AppError> {
        let outcome = match &self.action {
            Action::Find(query) => Outcome::Documents(store.find(query).await?),
            Action::Update { filter, patch } => {
                Outcome::Updated(store.update_one(filter, patch).await?)
            }
            Action::Delete(filter) => Outcome::Deleted(store.delete_one(filter).await?),
            Action::Aggregate(pipeline) => Outcome::Documents(store.aggregate(pipeline).await?),
            Action::CreateIndex(keys) => Outcome::IndexCreated(store.create_index(keys).await?),
            Action::Explain(query) => Outcome::Explained(store.explain(query).await?),
        };
        Ok(outcome)
    }
}

pub fn finance_books() -> Operation {
    Operation::new(
        "finance_books",
        "Finance books",
        Action::Find(FindQuery::new(Filter::eq(fields::GENRE, "Finance"))),
    )
}

pub fn published_after_2010() -> Operation {
    Operation::new(
        "published_after_2010",
        "Books published after 2010",
        Action::Find(FindQuery::new(Filter::gt(fields::PUBLISHED_YEAR, RECENT_YEAR))),
    )
}

pub fn books_by_paulo_coelho() -> Operation {
    Operation::new(
        "books_by_paulo_coelho",
        "Books by Paulo Coelho",
        Action::Find(FindQuery::new(Filter::eq(fields::AUTHOR, "Paulo Coelho"))),
    )
}

pub fn reprice_rich_dad_poor_dad() -> Operation {
    Operation::new(
        "reprice_rich_dad_poor_dad",
        "Update result",
        Action::Update {
            filter: Filter::eq(fields::TITLE, "Rich Dad Poor Dad"),
            patch: Patch::set(fields::PRICE, REPRICED_TO),
        },
    )
}

pub fn delete_the_alchemist() -> Operation {
    Operation::new(
        "delete_the_alchemist",
        "Delete result",
        Action::Delete(Filter::eq(fields::TITLE, "The Alchemist")),
    )
}

pub fn in_stock_after_2010() -> Operation {
    Operation::new(
        "in_stock_after_2010",
        "In-stock books after 2010",
        Action::Find(FindQuery::new(
            Filter::eq(fields::IN_STOCK, true).and(Filter::gt(fields::PUBLISHED_YEAR, RECENT_YEAR)),
        )),
    )
}

pub fn title_author_price() -> Operation {
    Operation::new(
        "title_author_price",
        "Books with projection",
        Action::Find(FindQuery::all().project(
            Projection::include(&[fields::TITLE, fields::AUTHOR, fields::PRICE]).without_id(),
        )),
    )
}

pub fn by_price_ascending() -> Operation {
    Operation::new(
        "by_price_ascending",
        "Books sorted by price ascending",
        Action::Find(FindQuery::all().sort_by(SortKeys::by(fields::PRICE, SortOrder::Asc))),
    )
}

pub fn by_price_descending() -> Operation {
    Operation::new(
        "by_price_descending",
        "Books sorted by price descending",
        Action::Find(FindQuery::all().sort_by(SortKeys::by(fields::PRICE, SortOrder::Desc))),
    )
}

pub fn first_page() -> Operation {
    Operation::new(
        "first_page",
        "Page 1 (5 books)",
        Action::Find(FindQuery::all().page(0, PAGE_SIZE)),
    )
}

pub fn second_page() -> Operation {
    Operation::new(
        "second_page",
        "Page 2 (5 books)",
        Action::Find(FindQuery::all().page(PAGE_SIZE as u64, PAGE_SIZE)),
    )
}

pub fn average_price_by_genre() -> Operation {
    let pipeline = Pipeline::new()
        .then(
            Stage::group(GroupKey::Field(fields::GENRE.into()))
                .accumulate("avg_price", Accumulator::Avg(fields::PRICE.into())),
        )
        .then(Stage::Sort(SortKeys::by(fields::ID, SortOrder::Asc)));

    Operation::new(
        "average_price_by_genre",
        "Average price by genre",
        Action::Aggregate(pipeline),
    )
}

/// Ties on the count go to the alphabetically first author.
pub fn author_with_most_books() -> Operation {
    let pipeline = Pipeline::new()
        .then(Stage::group(GroupKey::Field(fields::AUTHOR.into())).accumulate("count", Accumulator::Count))
        .then(Stage::Sort(
            SortKeys::by("count", SortOrder::Desc).then(fields::ID, SortOrder::Asc),
        ))
        .then(Stage::Limit(1));

    Operation::new(
        "author_with_most_books",
        "Author with most books",
        Action::Aggregate(pipeline),
    )
}

pub fn books_by_decade() -> Operation {
    let pipeline = Pipeline::new()
        .then(
            Stage::group(GroupKey::Decade(fields::PUBLISHED_YEAR.into()))
                .accumulate("count", Accumulator::Count),
        )
        .then(Stage::Sort(SortKeys::by(fields::ID, SortOrder::Asc)))
        .then(Stage::project(&[
            ("decade", ProjectField::DecadeLabel(fields::ID.into())),
            ("count", ProjectField::Include),
            (fields::ID, ProjectField::Exclude),
        ]));

    Operation::new(
        "books_by_decade",
        "Books grouped by decade",
        Action::Aggregate(pipeline),
    )
}

pub fn index_title() -> Operation {
    Operation::new(
        "index_title",
        "Created index on title",
        Action::CreateIndex(IndexKeys::ascending(&[fields::TITLE])),
    )
}

pub fn index_author_year() -> Operation {
    Operation::new(
        "index_author_year",
        "Created compound index on author and published_year",
        Action::CreateIndex(IndexKeys::ascending(&[fields::AUTHOR, fields::PUBLISHED_YEAR])),
    )
}

pub fn explain_title_lookup() -> Operation {
    Operation::new(
        "explain_title_lookup",
        "Explain result for query on title",
        Action::Explain(FindQuery::new(Filter::eq(fields::TITLE, "Atomic Habits"))),
    )
}

/// All operations in run order.
pub fn catalog() -> Vec<Operation> {
    vec![
        finance_books(),
        published_after_2010(),
        books_by_paulo_coelho(),
        reprice_rich_dad_poor_dad(),
        delete_the_alchemist(),
        in_stock_after_2010(),
        title_author_price(),
        by_price_ascending(),
        by_price_descending(),
        first_page(),
        second_page(),
        average_price_by_genre(),
        author_with_most_books(),
        books_by_decade(),
        index_title(),
        index_author_year(),
        explain_title_lookup(),
    ]
}
