//! Database seeding utilities.

use bookstore::errors::AppError;
use bookstore::models::Book;
use bookstore::query_builder::Filter;
use bookstore::store::BookStore;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Store error: {0}")]
    Store(#[from] AppError),
    #[error("Nothing to seed")]
    EmptyBatch,
    #[error("Inserted {inserted} of {expected} books")]
    Incomplete { expected: usize, inserted: usize },
}

/// Loads books into a [`BookStore`].
pub struct Seeder<S> {
    store: S,
}

impl<S: BookStore> Seeder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Inserts all books in a single bulk operation and returns how many
    /// the store reports as inserted.
    pub async fn seed_books(&self, books: &[Book]) -> Result<usize, SeedError> {
        if books.is_empty() {
            return Err(SeedError::EmptyBatch);
        }

        info!("Seeding {} books...", books.len());

        let inserted = self.store.insert_books(books).await?;
        if inserted != books.len() {
            return Err(SeedError::Incomplete {
                expected: books.len(),
                inserted,
            });
        }

        info!("{} books inserted", inserted);
        Ok(inserted)
    }

    /// Deletes every book in the collection.
    ///
    /// **WARNING**: not limited to seeded records.
    pub async fn clear_all(&self) -> Result<u64, SeedError> {
        info!("Clearing all books...");
        let deleted = self.store.delete_many(&Filter::All).await?;
        info!("Cleared {} books", deleted);
        Ok(deleted)
    }

    /// Returns a reference to the store for advanced usage.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{SEED_BOOK_COUNT, seed_books};
    use bookstore::memory::MemoryStore;
    use bookstore::query_builder::FindQuery;
    use mongodb::bson;

    #[tokio::test]
    async fn test_seed_reports_inserted_count() {
        let seeder = Seeder::new(MemoryStore::new());
        let inserted = seeder.seed_books(&seed_books()).await.unwrap();
        assert_eq!(inserted, SEED_BOOK_COUNT);
        assert_eq!(seeder.store().count_books().await.unwrap(), SEED_BOOK_COUNT as u64);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let seeder = Seeder::new(MemoryStore::new());
        let err = seeder.seed_books(&[]).await.unwrap_err();
        assert!(matches!(err, SeedError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let seeder = Seeder::new(MemoryStore::new());
        seeder.seed_books(&seed_books()).await.unwrap();
        assert_eq!(seeder.clear_all().await.unwrap(), SEED_BOOK_COUNT as u64);
        assert_eq!(seeder.store().count_books().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_surfaces_store_error() {
        let seeder = Seeder::new(MemoryStore::new());
        seeder.seed_books(&seed_books()).await.unwrap();

        let stored: Vec<Book> = seeder
            .store()
            .find(&FindQuery::all())
            .await
            .unwrap()
            .into_iter()
            .map(bson::from_document)
            .collect::<Result<_, _>>()
            .unwrap();

        let err = seeder.seed_books(&stored).await.unwrap_err();
        assert!(
            matches!(err, SeedError::Store(AppError::DuplicateKey(_))),
            "unexpected error: {err}"
        );
        assert_eq!(seeder.store().count_books().await.unwrap(), SEED_BOOK_COUNT as u64);
    }
}
