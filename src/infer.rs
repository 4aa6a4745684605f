//! Field type suggestions for columns that have no target field yet.
//!
//! Column names are checked first; value-based rules only run when the name
//! carries no hint. Samples are a prefix of the data, so a file sorted by the
//! column in question can skew the guess.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::{
    mapping::{ColumnMapping, unmapped_columns},
    schema::{FieldType, normalize_api_name},
    tabular::TabularData,
};

pub const DEFAULT_MAX_SAMPLES: usize = 20;
const PICKLIST_MIN_SAMPLES: usize = 5;
const PICKLIST_MAX_DISTINCT: f64 = 10.0;
const PICKLIST_DISTINCT_RATIO: f64 = 0.5;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

const NAME_HINTS: &[(&[&str], FieldType)] = &[
    (&["email"], FieldType::Email),
    (&["phone"], FieldType::Phone),
    (&["date"], FieldType::Date),
    (&["url", "website"], FieldType::Url),
    (&["description", "note"], FieldType::Textarea),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSuggestion {
    pub column_index: usize,
    pub column_name: String,
    pub api_name: String,
    pub data_type: FieldType,
}

pub fn guess_type<S: AsRef<str>>(column_name: &str, samples: &[S]) -> FieldType {
    let lowered = column_name.to_lowercase();
    for (needles, field_type) in NAME_HINTS {
        if needles.iter().any(|needle| lowered.contains(needle)) {
            return *field_type;
        }
    }

    if samples.is_empty() {
        return FieldType::Text;
    }
    let values = samples.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
    if values.iter().all(|v| is_finite_number(v)) {
        return FieldType::Number;
    }
    if values.iter().any(|v| EMAIL_PATTERN.is_match(v)) {
        return FieldType::Email;
    }
    if values
        .iter()
        .any(|v| v.starts_with("http://") || v.starts_with("https://"))
    {
        return FieldType::Url;
    }
    if values.len() >= PICKLIST_MIN_SAMPLES {
        let distinct = values.iter().collect::<HashSet<_>>().len() as f64;
        let limit = PICKLIST_MAX_DISTINCT.min(values.len() as f64 * PICKLIST_DISTINCT_RATIO);
        if distinct <= limit {
            return FieldType::Picklist;
        }
    }
    FieldType::Text
}

fn is_finite_number(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .is_ok_and(|parsed| parsed.is_finite())
}

/// Values of `column_index` from the first `max_samples` rows, skipping blanks.
pub fn sample_column(data: &TabularData, column_index: usize, max_samples: usize) -> Vec<String> {
    data.rows
        .iter()
        .take(max_samples)
        .filter_map(|row| row.get(column_index))
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .collect()
}

pub fn guess_unmapped(
    data: &TabularData,
    mappings: &[ColumnMapping],
    max_samples: usize,
) -> Vec<FieldSuggestion> {
    unmapped_columns(mappings)
        .into_iter()
        .map(|column_index| {
            let column_name = mappings[column_index].source_column_name.clone();
            let samples = sample_column(data, column_index, max_samples);
            FieldSuggestion {
                column_index,
                api_name: normalize_api_name(&column_name),
                data_type: guess_type(&column_name, &samples),
                column_name,
            }
        })
        .collect()
}
