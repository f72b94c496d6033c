//! Integration tests against a running MongoDB server.
//!
//! To run these tests you need a reachable server and `BOOKSTORE_HOST` set
//! (`BOOKSTORE_PORT` and `BOOKSTORE_DATABASE` are honoured too).
//!
//! Run with: `BOOKSTORE_HOST=127.0.0.1 cargo test -p seed-data --test live_mongo`
//!
//! Each test works in its own uniquely named collection and drops it at the
//! end, so they can safely run against a development database.

use bookstore::catalog::{self, Outcome};
use bookstore::config::{HOST_VAR, StoreConfig};
use bookstore::database::{Database, MongoBooks};
use bookstore::errors::AppError;
use bookstore::models::{Book, DecadeCount, UpdateOutcome, fields};
use bookstore::pipeline::{Accumulator, GroupKey, Pipeline, Stage};
use bookstore::query_builder::{FindQuery, SortKeys, SortOrder};
use bookstore::run_queries;
use bookstore::store::BookStore;
use mongodb::bson::{self, oid::ObjectId};
use seed_data::prelude::*;

/// Connect to a fresh collection, skipping tests if `BOOKSTORE_HOST` is not set.
async fn get_test_database() -> Option<(Database, MongoBooks)> {
    if std::env::var(HOST_VAR).is_err() {
        eprintln!("Skipping test: {HOST_VAR} not set");
        return None;
    }

    let config = match StoreConfig::from_env() {
        Ok(config) => config.with_collection(format!("books_test_{}", ObjectId::new().to_hex())),
        Err(e) => {
            eprintln!("Skipping test: {e}");
            return None;
        }
    };

    match Database::connect(&config).await {
        Ok(database) => {
            let books = database.books();
            Some((database, books))
        }
        Err(e) => {
            eprintln!("Skipping test: Failed to connect to database: {e}");
            None
        }
    }
}

async fn cleanup(database: Database, books: MongoBooks) {
    let _ = books.drop().await;
    database.close().await;
}

async fn seed(books: &MongoBooks) {
    Seeder::new(books.clone())
        .seed_books(&seed_books())
        .await
        .expect("Failed to seed books");
}

async fn find_books(books: &MongoBooks, query: &FindQuery) -> Vec<Book> {
    books
        .find(query)
        .await
        .unwrap()
        .into_iter()
        .map(|d| bson::from_document(d).unwrap())
        .collect()
}

#[tokio::test]
async fn test_seed_then_lookup_then_delete() {
    let Some((database, books)) = get_test_database().await else {
        return;
    };

    let seeder = Seeder::new(books.clone());
    let inserted = seeder
        .seed_books(&seed_books())
        .await
        .expect("Failed to seed books");
    assert_eq!(inserted, SEED_BOOK_COUNT);
    assert_eq!(books.count_books().await.unwrap(), SEED_BOOK_COUNT as u64);

    let lookup = catalog::books_by_paulo_coelho();
    let found: Vec<Book> = lookup.execute(&books).await.unwrap().decode().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "The Alchemist");

    let delete = catalog::delete_the_alchemist();
    assert_eq!(delete.execute(&books).await.unwrap(), Outcome::Deleted(1));
    assert_eq!(delete.execute(&books).await.unwrap(), Outcome::Deleted(0));

    let found: Vec<Book> = lookup.execute(&books).await.unwrap().decode().unwrap();
    assert!(found.is_empty());

    cleanup(database, books).await;
}

#[tokio::test]
async fn test_decades_and_indexes_match_the_engine() {
    let Some((database, books)) = get_test_database().await else {
        return;
    };

    seed(&books).await;

    let decades: Vec<DecadeCount> = catalog::books_by_decade()
        .execute(&books)
        .await
        .unwrap()
        .decode()
        .unwrap();
    let nineties = decades
        .iter()
        .find(|d| d.decade == "1990s")
        .expect("1997 should land in the 1990s");
    assert_eq!(nineties.count, 2);

    let Outcome::Explained(before) = catalog::explain_title_lookup().execute(&books).await.unwrap()
    else {
        panic!("expected execution statistics");
    };
    assert_eq!(before.get_i32("nReturned").unwrap(), 1);
    assert_eq!(
        before.get_i32("totalDocsExamined").unwrap(),
        SEED_BOOK_COUNT as i32
    );

    for _ in 0..2 {
        assert_eq!(
            catalog::index_title().execute(&books).await.unwrap(),
            Outcome::IndexCreated("title_1".to_string())
        );
    }

    let Outcome::Explained(after) = catalog::explain_title_lookup().execute(&books).await.unwrap()
    else {
        panic!("expected execution statistics");
    };
    assert_eq!(after.get_i32("nReturned").unwrap(), 1);
    assert_eq!(after.get_i32("totalKeysExamined").unwrap(), 1);
    assert_eq!(after.get_i32("totalDocsExamined").unwrap(), 1);

    cleanup(database, books).await;
}

#[tokio::test]
async fn test_full_catalog_runs_to_completion() {
    let Some((database, books)) = get_test_database().await else {
        return;
    };

    seed(&books).await;

    let ran = run_queries(&books).await.expect("Catalog failed");
    assert_eq!(ran, catalog::catalog().len());
    assert_eq!(books.count_books().await.unwrap(), SEED_BOOK_COUNT as u64 - 1);

    cleanup(database, books).await;
}

#[tokio::test]
async fn test_repeated_reprice_reports_no_modification() {
    let Some((database, books)) = get_test_database().await else {
        return;
    };
    seed(&books).await;

    let reprice = catalog::reprice_rich_dad_poor_dad();
    assert_eq!(
        reprice.execute(&books).await.unwrap(),
        Outcome::Updated(UpdateOutcome { matched: 1, modified: 1 })
    );
    assert_eq!(
        reprice.execute(&books).await.unwrap(),
        Outcome::Updated(UpdateOutcome { matched: 1, modified: 0 })
    );

    cleanup(database, books).await;
}

#[tokio::test]
async fn test_sorted_pages_concatenate_to_full_listing() {
    let Some((database, books)) = get_test_database().await else {
        return;
    };
    seed(&books).await;

    let sort = SortKeys::by(fields::PRICE, SortOrder::Asc).then(fields::TITLE, SortOrder::Asc);
    let first = find_books(&books, &FindQuery::all().sort_by(sort.clone()).page(0, 5)).await;
    let second = find_books(&books, &FindQuery::all().sort_by(sort.clone()).page(5, 5)).await;
    let whole = find_books(&books, &FindQuery::all().sort_by(sort).limit(10)).await;

    assert_eq!(first.len(), 5);
    assert_eq!(second.len(), 5);
    let joined: Vec<Book> = first.into_iter().chain(second).collect();
    assert_eq!(joined, whole);

    cleanup(database, books).await;
}

#[tokio::test]
async fn test_genre_averages_weight_back_to_total() {
    let Some((database, books)) = get_test_database().await else {
        return;
    };
    seed(&books).await;

    let pipeline = Pipeline::new().then(
        Stage::group(GroupKey::Field(fields::GENRE.into()))
            .accumulate("avg_price", Accumulator::Avg(fields::PRICE.into()))
            .accumulate("count", Accumulator::Count),
    );
    let weighted: f64 = books
        .aggregate(&pipeline)
        .await
        .unwrap()
        .iter()
        .map(|g| g.get_f64("avg_price").unwrap() * f64::from(g.get_i32("count").unwrap()))
        .sum();
    let total: f64 = seed_books().iter().map(|b| b.price).sum();
    assert!((weighted - total).abs() < 1e-9, "{weighted} vs {total}");

    cleanup(database, books).await;
}

#[tokio::test]
async fn test_duplicate_ids_surface_as_duplicate_key() {
    let Some((database, books)) = get_test_database().await else {
        return;
    };
    seed(&books).await;

    let stored = find_books(&books, &FindQuery::all()).await;
    let err = Seeder::new(books.clone())
        .seed_books(&stored)
        .await
        .unwrap_err();
    assert!(
        matches!(err, SeedError::Store(AppError::DuplicateKey(_))),
        "unexpected error: {err}"
    );
    assert_eq!(books.count_books().await.unwrap(), SEED_BOOK_COUNT as u64);

    cleanup(database, books).await;
}
