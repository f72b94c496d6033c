//! Sample data for the bookstore collection.
//!
//! This crate holds the fixed batch of ten books and the [`db::Seeder`] that
//! loads them, either into MongoDB or into the in-memory store for tests.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seed_data::prelude::*;
//!
//! let database = Database::connect(&StoreConfig::from_env()?).await?;
//! let inserted = Seeder::new(database.books()).seed_books(&seed_books()).await?;
//! database.close().await;
//! ```

pub mod db;
pub mod fixtures;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::db::{SeedError, Seeder};
    pub use crate::fixtures::{SEED_BOOK_COUNT, seed_books};
    pub use bookstore::config::StoreConfig;
    pub use bookstore::database::Database;
    pub use bookstore::models::Book;
}
