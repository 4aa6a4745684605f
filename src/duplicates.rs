//! Duplicate detection between import rows and already-stored records.
//!
//! Every import row is compared with every existing record. A pair is a
//! duplicate when at least two mapped fields agree, or when an email field
//! agrees on its own. Text is compared exactly after lowercasing, with no
//! phone or whitespace canonicalization. Number, date and boolean cells are
//! parsed first so they line up with the normalized form records are stored in.

use std::collections::BTreeMap;

use itertools::iproduct;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{FieldValue, parse_field_value},
    schema::{FieldType, SchemaField},
};

const MIN_CORROBORATING_FIELDS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub api_name: String,
    pub name: String,
    pub data_type: FieldType,
}

impl From<&SchemaField> for FieldRef {
    fn from(field: &SchemaField) -> Self {
        Self {
            api_name: field.api_name.clone(),
            name: field.name.clone(),
            data_type: field.data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    pub id: String,
    pub values: BTreeMap<String, FieldValue>,
}

impl ExistingRecord {
    pub fn display_value(&self, api_name: &str) -> String {
        self.values
            .get(api_name)
            .map(FieldValue::as_display)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    EmailMatch,
    FieldMatch,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::EmailMatch => "email_match",
            MatchType::FieldMatch => "field_match",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchingField {
    pub field_api_name: String,
    pub field_name: String,
    pub import_value: String,
    pub existing_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    pub import_row_index: usize,
    pub existing_record_id: String,
    pub match_type: MatchType,
    pub matching_fields: Vec<MatchingField>,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    match_field: Option<String>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats agreement on `api_name` alone as enough evidence.
    pub fn with_match_field(api_name: Option<String>) -> Self {
        Self {
            match_field: api_name.filter(|name| !name.trim().is_empty()),
        }
    }

    pub fn find(
        &self,
        rows: &[Vec<String>],
        headers: &[String],
        mapping: &BTreeMap<String, String>,
        existing: &[ExistingRecord],
        fields: &[FieldRef],
    ) -> Vec<DuplicateMatch> {
        let row_values = rows
            .iter()
            .map(|row| mapped_values(row, headers, mapping))
            .collect::<Vec<_>>();

        let mut matches = Vec::new();
        for ((row_index, values), record) in iproduct!(row_values.iter().enumerate(), existing) {
            if let Some(found) = self.compare(row_index, values, record, fields) {
                debug!(
                    "Row {} matches record {} on {} field(s)",
                    row_index + 1,
                    record.id,
                    found.matching_fields.len()
                );
                matches.push(found);
            }
        }
        matches
    }

    fn compare(
        &self,
        row_index: usize,
        values: &[(&str, &str)],
        record: &ExistingRecord,
        fields: &[FieldRef],
    ) -> Option<DuplicateMatch> {
        let mut matching_fields = Vec::new();
        let mut email_matched = false;
        let mut match_field_matched = false;

        for &(api_name, import_value) in values.iter().filter(|(_, v)| !v.trim().is_empty()) {
            let field = fields.iter().find(|f| f.api_name == api_name);
            let existing_value = record.display_value(api_name);
            if comparable_value(import_value, field) != existing_value.to_lowercase() {
                continue;
            }
            email_matched |= field.is_some_and(|f| f.data_type == FieldType::Email);
            match_field_matched |= self.match_field.as_deref() == Some(api_name);
            matching_fields.push(MatchingField {
                field_api_name: api_name.to_string(),
                field_name: field.map_or_else(|| api_name.to_string(), |f| f.name.clone()),
                import_value: import_value.to_string(),
                existing_value,
            });
        }

        let is_duplicate = matching_fields.len() >= MIN_CORROBORATING_FIELDS
            || email_matched
            || match_field_matched;
        is_duplicate.then(|| DuplicateMatch {
            import_row_index: row_index,
            existing_record_id: record.id.clone(),
            match_type: if email_matched {
                MatchType::EmailMatch
            } else {
                MatchType::FieldMatch
            },
            matching_fields,
        })
    }
}

/// Lowercased import text in the form stored values display with.
///
/// Number, date and boolean cells are parsed the way they are written, so
/// `1,250.50` compares equal to a stored `1250.5`. Cells that fail to parse
/// and every other field type compare as entered.
fn comparable_value(raw: &str, field: Option<&FieldRef>) -> String {
    field
        .filter(|f| {
            matches!(
                f.data_type,
                FieldType::Number | FieldType::Date | FieldType::Boolean
            )
        })
        .and_then(|f| parse_field_value(raw, f.data_type).ok())
        .map_or_else(|| raw.to_string(), |typed| typed.as_display())
        .to_lowercase()
}

/// Flattens one row into `(api_name, value)` pairs in header order.
///
/// When two headers map to the same field the later cell wins.
fn mapped_values<'a>(
    row: &'a [String],
    headers: &[String],
    mapping: &'a BTreeMap<String, String>,
) -> Vec<(&'a str, &'a str)> {
    let mut values: Vec<(&str, &str)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        let Some(api_name) = mapping.get(header) else {
            continue;
        };
        let value = row.get(idx).map(String::as_str).unwrap_or("");
        match values.iter_mut().find(|(api, _)| *api == api_name.as_str()) {
            Some(slot) => slot.1 = value,
            None => values.push((api_name.as_str(), value)),
        }
    }
    values
}

pub fn find_duplicates(
    rows: &[Vec<String>],
    headers: &[String],
    mapping: &BTreeMap<String, String>,
    existing: &[ExistingRecord],
    fields: &[FieldRef],
) -> Vec<DuplicateMatch> {
    DuplicateDetector::new().find(rows, headers, mapping, existing, fields)
}
