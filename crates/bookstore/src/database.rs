use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::errors::AppError;
use crate::models::{Book, UpdateOutcome};
use crate::pipeline::Pipeline;
use crate::query_builder::{Filter, FindQuery, IndexKeys, Patch};
use crate::store::BookStore;

/// Server error code for a unique index violation (E11000).
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Surfaces a unique index violation as [`AppError::DuplicateKey`] so callers
/// see the same error from every store.
fn map_write_error(err: mongodb::error::Error) -> AppError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .iter()
            .flatten()
            .find(|e| e.code == DUPLICATE_KEY_CODE)
            .map(|e| e.message.clone()),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE => {
            Some(e.message.clone())
        }
        _ => None,
    };

    match duplicate {
        Some(message) => AppError::DuplicateKey(message),
        None => AppError::Database(err),
    }
}

/// An open connection to the document store.
///
/// Acquired once per run and released with [`Database::close`] on every
/// exit path.
pub struct Database {
    client: Client,
    config: StoreConfig,
}

impl Database {
    /// Connects and pings the server so that an unreachable store fails here
    /// rather than on the first query.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AppError> {
        let client = Client::with_uri_str(config.uri()).await?;

        if let Err(e) = client.database("admin").run_command(doc! { "ping": 1 }).await {
            client.shutdown().await;
            return Err(e.into());
        }

        info!("Connected to {}", config.uri());

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Handle to the configured book collection.
    pub fn books(&self) -> MongoBooks {
        MongoBooks::new(
            self.client.database(&self.config.database),
            &self.config.collection,
        )
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub async fn close(self) {
        self.client.shutdown().await;
        info!("Connection closed");
    }
}

/// [`BookStore`] backed by a MongoDB collection.
#[derive(Clone, Debug)]
pub struct MongoBooks {
    database: mongodb::Database,
    collection: Collection<Document>,
}

impl MongoBooks {
    pub fn new(database: mongodb::Database, collection: &str) -> Self {
        let collection = database.collection::<Document>(collection);
        Self {
            database,
            collection,
        }
    }

    pub fn name(&self) -> &str {
        self.collection.name()
    }

    /// Drops the whole collection, indexes included.
    pub async fn drop(&self) -> Result<(), AppError> {
        self.collection.drop().await?;
        Ok(())
    }

    fn explain_command(&self, query: &FindQuery) -> Document {
        let mut find = doc! {
            "find": self.collection.name(),
            "filter": query.filter.to_document(),
        };
        if let Some(projection) = &query.projection {
            find.insert("projection", projection.to_document());
        }
        if let Some(sort) = &query.sort {
            find.insert("sort", sort.to_document());
        }
        if query.skip > 0 {
            find.insert("skip", query.skip as i64);
        }
        if let Some(limit) = query.limit {
            find.insert("limit", limit);
        }
        doc! { "explain": find, "verbosity": "executionStats" }
    }
}

#[async_trait]
impl BookStore for MongoBooks {
    async fn insert_books(&self, books: &[Book]) -> Result<usize, AppError> {
        let result = self
            .collection
            .clone_with_type::<Book>()
            .insert_many(books)
            .await
            .map_err(map_write_error)?;
        Ok(result.inserted_ids.len())
    }

    async fn count_books(&self) -> Result<u64, AppError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, AppError> {
        let filter = query.filter.to_document();
        debug!(%filter, "find");

        let cursor = self
            .collection
            .find(filter)
            .with_options(query.to_find_options())
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_one(&self, filter: &Filter, patch: &Patch) -> Result<UpdateOutcome, AppError> {
        let result = self
            .collection
            .update_one(filter.to_document(), patch.to_document())
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64, AppError> {
        let result = self.collection.delete_one(filter.to_document()).await?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
        let result = self.collection.delete_many(filter.to_document()).await?;
        Ok(result.deleted_count)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, AppError> {
        let cursor = self.collection.aggregate(pipeline.to_documents()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn create_index(&self, keys: &IndexKeys) -> Result<String, AppError> {
        let model = IndexModel::builder().keys(keys.to_document()).build();
        let result = self.collection.create_index(model).await?;
        Ok(result.index_name)
    }

    async fn explain(&self, query: &FindQuery) -> Result<Document, AppError> {
        let response = self
            .database
            .run_command(self.explain_command(query))
            .await?;

        response
            .get_document("executionStats")
            .cloned()
            .map_err(|_| AppError::MissingField("executionStats".to_string()))
    }
}
