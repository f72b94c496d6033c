//! Typed query model rendered to BSON filter, sort and projection documents.
//!
//! Queries are built as values so that the catalog can describe each
//! operation up front and any [`BookStore`](crate::store::BookStore) can
//! execute it: the MongoDB store renders them with [`Filter::to_document`]
//! and friends, the in-memory store evaluates them directly.

use mongodb::bson::{Bson, Document, doc};
use mongodb::options::FindOptions;

/// A predicate over document fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals value.
    Eq(String, Bson),
    /// Field is strictly greater than value.
    Gt(String, Bson),
    /// Every inner filter matches.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Bson>) -> Self {
        Self::Eq(field.to_string(), value.into())
    }

    pub fn gt(field: &str, value: impl Into<Bson>) -> Self {
        Self::Gt(field.to_string(), value.into())
    }

    /// Combines two filters, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Self {
        let mut parts = match self {
            Filter::All => Vec::new(),
            Filter::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Filter::All => {}
            Filter::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        match parts.len() {
            0 => Filter::All,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    /// Renders the filter as a query document.
    ///
    /// Conjunctions over distinct fields collapse into a single document
    /// (`{a: 1, b: {$gt: 2}}`); otherwise an explicit `$and` is emitted.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => Document::new(),
            Filter::Eq(field, value) => doc! { field.as_str(): value.clone() },
            Filter::Gt(field, value) => doc! { field.as_str(): { "$gt": value.clone() } },
            Filter::And(parts) => {
                let rendered: Vec<Document> = parts.iter().map(Filter::to_document).collect();
                let mut merged = Document::new();
                let mut disjoint = true;
                for part in &rendered {
                    for (key, value) in part {
                        if merged.contains_key(key) || key.starts_with('$') {
                            disjoint = false;
                        }
                        merged.insert(key.clone(), value.clone());
                    }
                }
                if disjoint {
                    merged
                } else {
                    doc! { "$and": rendered }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Ordered list of `(field, direction)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortKeys(Vec<(String, SortOrder)>);

impl SortKeys {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn by(field: &str, order: SortOrder) -> Self {
        Self::new().then(field, order)
    }

    pub fn then(mut self, field: &str, order: SortOrder) -> Self {
        self.0.push((field.to_string(), order));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortOrder)> {
        self.0.iter().map(|(field, order)| (field.as_str(), *order))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        for (field, order) in self.iter() {
            document.insert(field, order.as_i32());
        }
        document
    }
}

/// Inclusion projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub fields: Vec<String>,
    pub include_id: bool,
}

impl Projection {
    pub fn include(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            include_id: true,
        }
    }

    pub fn without_id(mut self) -> Self {
        self.include_id = false;
        self
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        if !self.include_id {
            document.insert("_id", 0);
        }
        for field in &self.fields {
            document.insert(field.as_str(), 1);
        }
        document
    }
}

/// A find request: filter plus optional projection, sort and page window.
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub projection: Option<Projection>,
    pub sort: Option<SortKeys>,
    pub skip: u64,
    pub limit: Option<i64>,
}

impl FindQuery {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            projection: None,
            sort: None,
            skip: 0,
            limit: None,
        }
    }

    pub fn all() -> Self {
        Self::new(Filter::All)
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort_by(mut self, sort: SortKeys) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Window of `limit` documents starting at `offset`.
    pub fn page(self, offset: u64, limit: i64) -> Self {
        self.skip(offset).limit(limit)
    }

    pub fn to_find_options(&self) -> FindOptions {
        let mut options = FindOptions::default();
        options.projection = self.projection.as_ref().map(Projection::to_document);
        options.sort = self.sort.as_ref().map(SortKeys::to_document);
        if self.skip > 0 {
            options.skip = Some(self.skip);
        }
        options.limit = self.limit;
        options
    }
}

/// Partial-field update applied with `$set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub set: Vec<(String, Bson)>,
}

impl Patch {
    pub fn set(field: &str, value: impl Into<Bson>) -> Self {
        Self::default().and_set(field, value)
    }

    pub fn and_set(mut self, field: &str, value: impl Into<Bson>) -> Self {
        self.set.push((field.to_string(), value.into()));
        self
    }

    pub fn to_document(&self) -> Document {
        let mut fields = Document::new();
        for (field, value) in &self.set {
            fields.insert(field.as_str(), value.clone());
        }
        doc! { "$set": fields }
    }
}

/// Key specification of a single-field or compound index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKeys(SortKeys);

impl IndexKeys {
    pub fn new(keys: SortKeys) -> Self {
        Self(keys)
    }

    pub fn ascending(fields: &[&str]) -> Self {
        Self(
            fields
                .iter()
                .fold(SortKeys::new(), |keys, field| keys.then(field, SortOrder::Asc)),
        )
    }

    pub fn keys(&self) -> &SortKeys {
        &self.0
    }

    /// Index name the store derives from the keys, e.g. `author_1_published_year_1`.
    pub fn name(&self) -> String {
        self.0
            .iter()
            .map(|(field, order)| format!("{field}_{}", order.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn to_document(&self) -> Document {
        self.0.to_document()
    }
}
