//! Inserts the sample books into the configured collection.
//!
//! Run with:
//! ```
//! cargo run -p seed-data --bin seed
//! ```

use std::process::ExitCode;

use seed_data::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let database = match Database::connect(&config).await {
        Ok(database) => database,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Seeding {}.{}", config.database, config.collection);

    let result = Seeder::new(database.books())
        .seed_books(&seed_books())
        .await;
    database.close().await;

    match result {
        Ok(inserted) => {
            println!("{inserted} books inserted.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
