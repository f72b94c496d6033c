pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod query_builder;
pub mod store;

use tracing::info;

use crate::{catalog::catalog, errors::AppError, store::BookStore};

/// Runs every catalog operation in order, printing each result before the
/// next one starts. The first failure stops the run.
pub async fn run_queries(store: &dyn BookStore) -> Result<usize, AppError> {
    let operations = catalog();

    for operation in &operations {
        info!(operation = operation.name, "Running");
        let outcome = operation.execute(store).await?;
        println!("{}: {}", operation.label, outcome);
    }

    Ok(operations.len())
}
