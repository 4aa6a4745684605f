//! Per-row import decisions and their execution against a record store.

use std::{collections::BTreeMap, fmt};

use clap::ValueEnum;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    data::{FieldValue, coerce_field_value},
    duplicates::{DuplicateMatch, ExistingRecord},
    error::StoreError,
    mapping::ColumnMapping,
    tabular::TabularData,
};

pub trait RecordStore {
    fn list_records(&self, object_type_id: &str) -> Result<Vec<ExistingRecord>, StoreError>;
    /// Returns the id of the created record.
    fn create_record(
        &mut self,
        object_type_id: &str,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<String, StoreError>;
    fn update_record(
        &mut self,
        record_id: &str,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum OnDuplicate {
    #[default]
    Update,
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStrategy {
    #[serde(default)]
    pub match_field_api_name: Option<String>,
    #[serde(default)]
    pub on_duplicate: OnDuplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    Create,
    Update,
    Skip,
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImportAction::Create => "create",
            ImportAction::Update => "update",
            ImportAction::Skip => "skip",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDecision {
    pub row_index: usize,
    pub action: ImportAction,
    pub target_record_id: Option<String>,
    pub field_values: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub created_ids: Vec<String>,
}

impl ImportSummary {
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

#[derive(Debug, Error)]
#[error("Row {row} failed to {action}: {source}", row = .row_index + 1)]
pub struct ApplyError {
    pub row_index: usize,
    pub action: ImportAction,
    /// Rows applied before the failure; they are not rolled back.
    pub applied: ImportSummary,
    #[source]
    pub source: StoreError,
}

/// Typed values for the mapped, non-empty cells of one row.
pub fn row_field_values(
    data: &TabularData,
    row_index: usize,
    mappings: &[ColumnMapping],
) -> BTreeMap<String, FieldValue> {
    mappings
        .iter()
        .filter_map(|m| {
            let field = m.target_field.as_ref()?;
            let raw = data.cell(row_index, m.source_column_index);
            if raw.trim().is_empty() {
                return None;
            }
            Some((field.api_name.clone(), coerce_field_value(raw, field.data_type)))
        })
        .collect()
}

/// Picks the record an `update` should target when a row matched several.
///
/// Most matching fields wins; ties go to the lowest record id.
pub fn primary_match<'a, I>(matches: I) -> Option<&'a DuplicateMatch>
where
    I: IntoIterator<Item = &'a DuplicateMatch>,
{
    matches.into_iter().min_by(|a, b| {
        b.matching_fields
            .len()
            .cmp(&a.matching_fields.len())
            .then_with(|| a.existing_record_id.cmp(&b.existing_record_id))
    })
}

pub fn decide(
    data: &TabularData,
    mappings: &[ColumnMapping],
    matches: &[DuplicateMatch],
    strategy: &ImportStrategy,
) -> Vec<ImportDecision> {
    let by_row = matches.iter().into_group_map_by(|m| m.import_row_index);
    (0..data.row_count())
        .map(|row_index| {
            let field_values = row_field_values(data, row_index, mappings);
            let primary = by_row
                .get(&row_index)
                .and_then(|row_matches| primary_match(row_matches.iter().copied()));
            let (action, target_record_id) = match (primary, strategy.on_duplicate) {
                (None, _) => (ImportAction::Create, None),
                (Some(_), OnDuplicate::Skip) => (ImportAction::Skip, None),
                (Some(found), OnDuplicate::Update) => {
                    (ImportAction::Update, Some(found.existing_record_id.clone()))
                }
            };
            ImportDecision {
                row_index,
                action,
                target_record_id,
                field_values,
            }
        })
        .collect()
}

/// Executes decisions in order, stopping at the first store failure.
pub fn apply<S>(
    store: &mut S,
    object_type_id: &str,
    decisions: &[ImportDecision],
) -> Result<ImportSummary, ApplyError>
where
    S: RecordStore + ?Sized,
{
    let mut summary = ImportSummary::default();
    for decision in decisions {
        let outcome = match (decision.action, decision.target_record_id.as_deref()) {
            (ImportAction::Skip, _) => {
                summary.skipped += 1;
                Ok(())
            }
            (ImportAction::Update, None) => Err(StoreError::MissingTarget),
            (ImportAction::Create, _) => store
                .create_record(object_type_id, &decision.field_values)
                .map(|id| {
                    debug!("Row {} created record {id}", decision.row_index + 1);
                    summary.created += 1;
                    summary.created_ids.push(id);
                }),
            (ImportAction::Update, Some(record_id)) => store
                .update_record(record_id, &decision.field_values)
                .map(|()| {
                    debug!("Row {} updated record {record_id}", decision.row_index + 1);
                    summary.updated += 1;
                }),
        };
        if let Err(source) = outcome {
            return Err(ApplyError {
                row_index: decision.row_index,
                action: decision.action,
                applied: summary,
                source,
            });
        }
    }
    info!(
        "Applied import to '{object_type_id}': {} created, {} updated, {} skipped",
        summary.created, summary.updated, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        duplicates::{MatchType, MatchingField},
        schema::{FieldType, SchemaField},
    };

    #[derive(Default)]
    struct RecordingStore {
        creates: Vec<BTreeMap<String, FieldValue>>,
        updates: Vec<String>,
        fail_on_call: Option<usize>,
        calls: usize,
    }

    impl RecordingStore {
        fn tick(&mut self) -> Result<(), StoreError> {
            self.calls += 1;
            if self.fail_on_call == Some(self.calls) {
                return Err(StoreError::Backend("connection reset".into()));
            }
            Ok(())
        }
    }

    impl RecordStore for RecordingStore {
        fn list_records(&self, _object_type_id: &str) -> Result<Vec<ExistingRecord>, StoreError> {
            Ok(Vec::new())
        }

        fn create_record(
            &mut self,
            _object_type_id: &str,
            values: &BTreeMap<String, FieldValue>,
        ) -> Result<String, StoreError> {
            self.tick()?;
            self.creates.push(values.clone());
            Ok(format!("new-{}", self.creates.len()))
        }

        fn update_record(
            &mut self,
            record_id: &str,
            _values: &BTreeMap<String, FieldValue>,
        ) -> Result<(), StoreError> {
            self.tick()?;
            self.updates.push(record_id.to_string());
            Ok(())
        }
    }

    fn data() -> TabularData {
        TabularData {
            headers: vec!["Email".into(), "Score".into()],
            rows: vec![
                vec!["ada@example.com".into(), "7".into()],
                vec!["bob@example.com".into(), "".into()],
            ],
        }
    }

    fn mappings() -> Vec<ColumnMapping> {
        let field = |id: &str, api: &str, ty| SchemaField {
            id: id.into(),
            name: api.into(),
            api_name: api.into(),
            data_type: ty,
            is_required: false,
        };
        vec![
            ColumnMapping {
                source_column_index: 0,
                source_column_name: "Email".into(),
                target_field: Some(field("1", "email", FieldType::Email)),
            },
            ColumnMapping {
                source_column_index: 1,
                source_column_name: "Score".into(),
                target_field: Some(field("2", "score", FieldType::Number)),
            },
        ]
    }

    fn found(row: usize, id: &str, fields: usize) -> DuplicateMatch {
        DuplicateMatch {
            import_row_index: row,
            existing_record_id: id.into(),
            match_type: MatchType::FieldMatch,
            matching_fields: (0..fields)
                .map(|i| MatchingField {
                    field_api_name: format!("f{i}"),
                    field_name: format!("F{i}"),
                    import_value: "x".into(),
                    existing_value: "x".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn rows_without_matches_are_created() {
        let decisions = decide(&data(), &mappings(), &[], &ImportStrategy::default());
        assert!(decisions.iter().all(|d| d.action == ImportAction::Create));
        assert_eq!(
            decisions[0].field_values.get("score"),
            Some(&FieldValue::Number(rust_decimal::Decimal::from(7)))
        );
        assert!(!decisions[1].field_values.contains_key("score"));
    }

    #[test]
    fn skip_strategy_never_writes_duplicates() {
        let strategy = ImportStrategy {
            match_field_api_name: None,
            on_duplicate: OnDuplicate::Skip,
        };
        let decisions = decide(&data(), &mappings(), &[found(0, "r1", 2)], &strategy);
        assert_eq!(decisions[0].action, ImportAction::Skip);
        assert_eq!(decisions[1].action, ImportAction::Create);

        let mut store = RecordingStore::default();
        let summary = apply(&mut store, "contacts", &decisions).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.created, 1);
        assert!(store.updates.is_empty());
        assert_eq!(store.calls, 1);
    }

    #[test]
    fn update_strategy_updates_matched_record_once() {
        let decisions = decide(
            &data(),
            &mappings(),
            &[found(0, "r9", 2)],
            &ImportStrategy::default(),
        );
        assert_eq!(decisions[0].action, ImportAction::Update);
        assert_eq!(decisions[0].target_record_id.as_deref(), Some("r9"));

        let mut store = RecordingStore::default();
        let summary = apply(&mut store, "contacts", &decisions).unwrap();
        assert_eq!(store.updates, vec!["r9".to_string()]);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created_ids, vec!["new-1".to_string()]);
    }

    #[test]
    fn primary_match_prefers_most_fields_then_lowest_id() {
        let matches = [found(0, "r5", 2), found(0, "r3", 3), found(0, "r2", 3)];
        assert_eq!(primary_match(&matches).unwrap().existing_record_id, "r2");
        assert!(primary_match(&[] as &[DuplicateMatch]).is_none());
    }

    #[test]
    fn update_without_target_record_fails() {
        let mut decisions = decide(&data(), &mappings(), &[], &ImportStrategy::default());
        decisions[1].action = ImportAction::Update;

        let mut store = RecordingStore::default();
        let err = apply(&mut store, "contacts", &decisions).unwrap_err();
        assert_eq!(err.row_index, 1);
        assert_eq!(err.action, ImportAction::Update);
        assert!(matches!(err.source, StoreError::MissingTarget));
        assert_eq!(err.applied.created, 1);
        assert_eq!(err.applied.skipped, 0);
        assert_eq!(store.calls, 1);
    }

    #[test]
    fn apply_stops_at_first_failure_without_rollback() {
        let decisions = decide(&data(), &mappings(), &[], &ImportStrategy::default());
        let mut store = RecordingStore {
            fail_on_call: Some(2),
            ..RecordingStore::default()
        };
        let err = apply(&mut store, "contacts", &decisions).unwrap_err();
        assert_eq!(err.row_index, 1);
        assert_eq!(err.action, ImportAction::Create);
        assert_eq!(err.applied.created, 1);
        assert_eq!(store.creates.len(), 1);
        assert!(err.to_string().starts_with("Row 2 failed to create"));
    }
}
