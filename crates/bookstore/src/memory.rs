//! In-process [`BookStore`] that evaluates the typed query model directly.
//!
//! Semantics follow MongoDB for the query shapes the catalog uses:
//! comparisons only match within a type bracket, sorting uses the BSON
//! type order, `$avg` yields doubles and `$sum: 1` yields 32-bit counts.
//! Natural order is insertion order.
//!
//! Built for tests only (or with the `memory` feature). There is no query
//! planner: `explain` always reports a collection scan.

use std::cmp::Ordering;

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{Book, UpdateOutcome};
use crate::pipeline::{Accumulator, GroupKey, Pipeline, ProjectField, Stage};
use crate::query_builder::{Filter, FindQuery, IndexKeys, Patch, Projection, SortKeys, SortOrder};
use crate::store::BookStore;

const ID_INDEX: &str = "_id_";

struct State {
    documents: Vec<Document>,
    indexes: Vec<(String, IndexKeys)>,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                documents: Vec::new(),
                indexes: vec![(ID_INDEX.to_string(), IndexKeys::ascending(&["_id"]))],
            }),
        }
    }

    /// Names of all indexes, `_id_` first.
    pub async fn index_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.indexes.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Position of a value in the BSON comparison order. Missing sorts as null.
fn type_rank(value: Option<&Bson>) -> u8 {
    match value {
        None | Some(Bson::Null) => 1,
        Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 2,
        Some(Bson::String(_)) => 3,
        Some(Bson::Document(_)) => 4,
        Some(Bson::Array(_)) => 5,
        Some(Bson::Binary(_)) => 6,
        Some(Bson::ObjectId(_)) => 7,
        Some(Bson::Boolean(_)) => 8,
        Some(Bson::DateTime(_)) => 9,
        Some(_) => 10,
    }
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };

    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ => Ordering::Equal,
    }
}

fn matches(filter: &Filter, document: &Document) -> bool {
    match filter {
        Filter::All => true,
        Filter::Eq(field, value) => {
            let actual = document.get(field);
            type_rank(actual) == type_rank(Some(value))
                && compare_values(actual, Some(value)) == Ordering::Equal
        }
        Filter::Gt(field, value) => {
            let actual = document.get(field);
            actual.is_some()
                && type_rank(actual) == type_rank(Some(value))
                && compare_values(actual, Some(value)) == Ordering::Greater
        }
        Filter::And(parts) => parts.iter().all(|part| matches(part, document)),
    }
}

/// First field the filter pins with an equality, the one an index can serve.
fn sort_documents(documents: &mut [Document], keys: &SortKeys) {
    documents.sort_by(|a, b| {
        for (field, order) in keys.iter() {
            let ordering = compare_values(a.get(field), b.get(field));
            let ordering = match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn project(document: &Document, projection: &Projection) -> Document {
    document
        .iter()
        .filter(|(key, _)| {
            if key.as_str() == "_id" {
                projection.include_id
            } else {
                projection.fields.iter().any(|f| f == *key)
            }
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn apply_limit(documents: &mut Vec<Document>, limit: i64) {
    // Zero means no limit; a negative limit behaves like its absolute value.
    if limit != 0 {
        documents.truncate(limit.unsigned_abs() as usize);
    }
}

fn run_find(documents: &[Document], query: &FindQuery) -> Vec<Document> {
    let mut selected: Vec<Document> = documents
        .iter()
        .filter(|d| matches(&query.filter, d))
        .cloned()
        .collect();

    if let Some(sort) = &query.sort {
        sort_documents(&mut selected, sort);
    }

    let mut selected: Vec<Document> = selected
        .into_iter()
        .skip(query.skip as usize)
        .collect();

    if let Some(limit) = query.limit {
        apply_limit(&mut selected, limit);
    }

    match &query.projection {
        Some(projection) => selected.iter().map(|d| project(d, projection)).collect(),
        None => selected,
    }
}

fn group_key(key: &GroupKey, document: &Document) -> Bson {
    match key {
        GroupKey::Field(field) => document.get(field).cloned().unwrap_or(Bson::Null),
        GroupKey::Decade(field) => document
            .get(field)
            .and_then(numeric)
            .map(|v| Bson::Double((v / 10.0).floor()))
            .unwrap_or(Bson::Null),
    }
}

fn accumulate(accumulator: &Accumulator, members: &[&Document]) -> Bson {
    match accumulator {
        Accumulator::Avg(field) => {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|d| d.get(field).and_then(numeric))
                .collect();
            if values.is_empty() {
                Bson::Null
            } else {
                Bson::Double(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Accumulator::Count => Bson::Int32(members.len() as i32),
    }
}

fn run_group(
    documents: &[Document],
    key: &GroupKey,
    accumulators: &[(String, Accumulator)],
) -> Vec<Document> {
    let mut groups: Vec<(Bson, Vec<&Document>)> = Vec::new();
    for document in documents {
        let value = group_key(key, document);
        match groups.iter_mut().find(|(k, _)| *k == value) {
            Some((_, members)) => members.push(document),
            None => groups.push((value, vec![document])),
        }
    }

    groups
        .into_iter()
        .map(|(value, members)| {
            let mut output = doc! { "_id": value };
            for (name, accumulator) in accumulators {
                output.insert(name.as_str(), accumulate(accumulator, &members));
            }
            output
        })
        .collect()
}

fn decade_label(value: Option<&Bson>) -> Bson {
    match value.and_then(numeric) {
        Some(bucket) => Bson::String(format!("{}s", (bucket * 10.0) as i64)),
        None => Bson::Null,
    }
}

fn run_project(document: &Document, fields: &[(String, ProjectField)]) -> Document {
    let excluded = |key: &str| {
        fields
            .iter()
            .any(|(name, field)| name == key && *field == ProjectField::Exclude)
    };
    let inclusion = fields
        .iter()
        .any(|(_, field)| *field != ProjectField::Exclude);

    if !inclusion {
        return document
            .iter()
            .filter(|(key, _)| !excluded(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
    }

    let mut output: Document = document
        .iter()
        .filter(|(key, _)| {
            if key.as_str() == "_id" {
                !excluded(key)
            } else {
                fields
                    .iter()
                    .any(|(name, field)| name == *key && *field == ProjectField::Include)
            }
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (name, field) in fields {
        if let ProjectField::DecadeLabel(source) = field {
            output.insert(name.as_str(), decade_label(document.get(source)));
        }
    }
    output
}

fn run_pipeline(documents: &[Document], pipeline: &Pipeline) -> Vec<Document> {
    let mut current = documents.to_vec();
    for stage in pipeline.stages() {
        current = match stage {
            Stage::Group { key, accumulators } => run_group(&current, key, accumulators),
            Stage::Sort(keys) => {
                sort_documents(&mut current, keys);
                current
            }
            Stage::Limit(n) => {
                apply_limit(&mut current, *n);
                current
            }
            Stage::Project(fields) => current.iter().map(|d| run_project(d, fields)).collect(),
        };
    }
    current
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn insert_books(&self, books: &[Book]) -> Result<usize, AppError> {
        let mut prepared = Vec::with_capacity(books.len());
        for book in books {
            let fields = bson::to_document(book)?;
            let mut document = match fields.get("_id") {
                Some(_) => Document::new(),
                None => doc! { "_id": ObjectId::new() },
            };
            for (key, value) in fields {
                document.insert(key, value);
            }
            prepared.push(document);
        }

        let mut state = self.state.lock().await;
        for (i, document) in prepared.iter().enumerate() {
            let id = document.get("_id");
            let taken = state
                .documents
                .iter()
                .chain(&prepared[..i])
                .any(|existing| existing.get("_id") == id);
            if taken {
                return Err(AppError::DuplicateKey(format!("_id {:?}", id)));
            }
        }

        let inserted = prepared.len();
        state.documents.extend(prepared);
        Ok(inserted)
    }

    async fn count_books(&self) -> Result<u64, AppError> {
        Ok(self.state.lock().await.documents.len() as u64)
    }

    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, AppError> {
        let state = self.state.lock().await;
        Ok(run_find(&state.documents, query))
    }

    async fn update_one(&self, filter: &Filter, patch: &Patch) -> Result<UpdateOutcome, AppError> {
        let mut state = self.state.lock().await;
        let Some(document) = state.documents.iter_mut().find(|d| matches(filter, d)) else {
            return Ok(UpdateOutcome::default());
        };

        let mut changed = false;
        for (field, value) in &patch.set {
            if document.get(field) != Some(value) {
                document.insert(field.as_str(), value.clone());
                changed = true;
            }
        }

        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(changed),
        })
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        match state.documents.iter().position(|d| matches(filter, d)) {
            Some(index) => {
                state.documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        let before = state.documents.len();
        state.documents.retain(|d| !matches(filter, d));
        Ok((before - state.documents.len()) as u64)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> Result<Vec<Document>, AppError> {
        let state = self.state.lock().await;
        Ok(run_pipeline(&state.documents, pipeline))
    }

    async fn create_index(&self, keys: &IndexKeys) -> Result<String, AppError> {
        let name = keys.name();
        let mut state = self.state.lock().await;

        if let Some((_, existing)) = state.indexes.iter().find(|(n, _)| *n == name) {
            return if existing == keys {
                Ok(name)
            } else {
                Err(AppError::IndexConflict(name))
            };
        }

        state.indexes.push((name.clone(), keys.clone()));
        Ok(name)
    }

    /// Reports a plain collection scan. Index selection belongs to the
    /// engine, so only the counters are meaningful here.
    async fn explain(&self, query: &FindQuery) -> Result<Document, AppError> {
        let state = self.state.lock().await;
        let returned = run_find(&state.documents, query).len() as i32;

        Ok(doc! {
            "executionSuccess": true,
            "nReturned": returned,
            "executionTimeMillis": 0,
            "totalKeysExamined": 0,
            "totalDocsExamined": state.documents.len() as i32,
            "executionStages": {
                "stage": "COLLSCAN",
                "nReturned": returned,
            },
        })
    }
}
