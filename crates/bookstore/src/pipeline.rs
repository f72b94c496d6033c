//! Aggregation pipeline stages.

use mongodb::bson::{Bson, Document, doc};

use crate::query_builder::SortKeys;

/// What documents are grouped by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    /// The value of a field.
    Field(String),
    /// `floor(field / 10)` of a numeric field.
    Decade(String),
}

impl GroupKey {
    fn to_bson(&self) -> Bson {
        match self {
            GroupKey::Field(field) => Bson::String(format!("${field}")),
            GroupKey::Decade(field) => Bson::Document(doc! {
                "$floor": { "$divide": [format!("${field}"), 10] }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accumulator {
    /// Mean of a numeric field.
    Avg(String),
    /// Number of documents in the group.
    Count,
}

impl Accumulator {
    fn to_bson(&self) -> Bson {
        match self {
            Accumulator::Avg(field) => Bson::Document(doc! { "$avg": format!("${field}") }),
            Accumulator::Count => Bson::Document(doc! { "$sum": 1 }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectField {
    Include,
    Exclude,
    /// Renders a decade bucket held in the named field as `"<bucket * 10>s"`.
    DecadeLabel(String),
}

impl ProjectField {
    fn to_bson(&self) -> Bson {
        match self {
            ProjectField::Include => Bson::Int32(1),
            ProjectField::Exclude => Bson::Int32(0),
            ProjectField::DecadeLabel(source) => Bson::Document(doc! {
                "$concat": [
                    { "$toString": { "$toInt": { "$multiply": [format!("${source}"), 10] } } },
                    "s"
                ]
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Group {
        key: GroupKey,
        accumulators: Vec<(String, Accumulator)>,
    },
    Sort(SortKeys),
    Limit(i64),
    Project(Vec<(String, ProjectField)>),
}

impl Stage {
    pub fn group(key: GroupKey) -> Self {
        Stage::Group {
            key,
            accumulators: Vec::new(),
        }
    }

    /// Adds an accumulator to a group stage. No-op on other stages.
    pub fn accumulate(mut self, output: &str, accumulator: Accumulator) -> Self {
        if let Stage::Group { accumulators, .. } = &mut self {
            accumulators.push((output.to_string(), accumulator));
        }
        self
    }

    pub fn project(fields: &[(&str, ProjectField)]) -> Self {
        Stage::Project(
            fields
                .iter()
                .map(|(name, field)| (name.to_string(), field.clone()))
                .collect(),
        )
    }

    pub fn to_document(&self) -> Document {
        match self {
            Stage::Group { key, accumulators } => {
                let mut group = doc! { "_id": key.to_bson() };
                for (output, accumulator) in accumulators {
                    group.insert(output.as_str(), accumulator.to_bson());
                }
                doc! { "$group": group }
            }
            Stage::Sort(keys) => doc! { "$sort": keys.to_document() },
            Stage::Limit(n) => doc! { "$limit": *n },
            Stage::Project(fields) => {
                let mut project = Document::new();
                for (name, field) in fields {
                    project.insert(name.as_str(), field.to_bson());
                }
                doc! { "$project": project }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline(Vec<Stage>);

impl Pipeline {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn then(mut self, stage: Stage) -> Self {
        self.0.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.0
    }

    pub fn to_documents(&self) -> Vec<Document> {
        self.0.iter().map(Stage::to_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::SortOrder;

    #[test]
    fn test_group_by_field_with_average() {
        let stage = Stage::group(GroupKey::Field("genre".into()))
            .accumulate("avg_price", Accumulator::Avg("price".into()));
        assert_eq!(
            stage.to_document(),
            doc! { "$group": { "_id": "$genre", "avg_price": { "$avg": "$price" } } }
        );
    }

    #[test]
    fn test_group_by_decade() {
        let stage =
            Stage::group(GroupKey::Decade("published_year".into())).accumulate("count", Accumulator::Count);
        assert_eq!(
            stage.to_document(),
            doc! {
                "$group": {
                    "_id": { "$floor": { "$divide": ["$published_year", 10] } },
                    "count": { "$sum": 1 }
                }
            }
        );
    }

    #[test]
    fn test_accumulate_ignored_outside_group() {
        let stage = Stage::Limit(1).accumulate("count", Accumulator::Count);
        assert_eq!(stage, Stage::Limit(1));
    }

    #[test]
    fn test_pipeline_documents() {
        let pipeline = Pipeline::new()
            .then(Stage::Sort(
                SortKeys::by("count", SortOrder::Desc).then("_id", SortOrder::Asc),
            ))
            .then(Stage::Limit(1))
            .then(Stage::project(&[
                ("decade", ProjectField::DecadeLabel("_id".into())),
                ("count", ProjectField::Include),
                ("_id", ProjectField::Exclude),
            ]));

        let documents = pipeline.to_documents();
        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0], doc! { "$sort": { "count": -1, "_id": 1 } });
        assert_eq!(documents[1], doc! { "$limit": 1_i64 });
        assert_eq!(
            documents[2],
            doc! {
                "$project": {
                    "decade": {
                        "$concat": [
                            { "$toString": { "$toInt": { "$multiply": ["$_id", 10] } } },
                            "s"
                        ]
                    },
                    "count": 1,
                    "_id": 0
                }
            }
        );
    }
}
