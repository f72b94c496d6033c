//! The seam between the catalog/seeder and a concrete document store.

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::errors::AppError;
use crate::models::{Book, UpdateOutcome};
use crate::pipeline::Pipeline;
use crate::query_builder::{Filter, FindQuery, IndexKeys, Patch};

/// Operations the bookstore needs from a document collection.
///
/// Calls are issued one at a time; implementations need no coordination
/// beyond being shareable across the runtime.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Inserts all books in one bulk operation and returns how many were inserted.
    async fn insert_books(&self, books: &[Book]) -> Result<usize, AppError>;

    async fn count_books(&self) -> Result<u64, AppError>;

    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, AppError>;

    /// Applies `patch` to the first document matching `filter`.
    async fn update_one(&self, filter: &Filter, patch: &Patch) -> Result<UpdateOutcome, AppError>;

    /// Removes the first document matching `filter`.
    async fn delete_one(&self, filter: &Filter) -> Result<u64, AppError>;

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError>;

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, AppError>;

    /// Creates an index and returns its name. Repeating an identical request
    /// returns the same name.
    async fn create_index(&self, keys: &IndexKeys) -> Result<String, AppError>;

    /// Execution statistics for `query`.
    async fn explain(&self, query: &FindQuery) -> Result<Document, AppError>;
}
