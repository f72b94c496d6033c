//! Database integration for seeding books.
//!
//! The [`Seeder`] inserts the fixed batch into any
//! [`BookStore`](bookstore::store::BookStore) in one bulk operation.

mod seeder;

pub use seeder::{SeedError, Seeder};
