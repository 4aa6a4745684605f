use std::{fmt, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::schema::FieldType;

/// A record value typed by the declaring field's [`FieldType`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
    Boolean(bool),
    Picklist(String),
}

impl FieldValue {
    pub fn as_display(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) | FieldValue::Picklist(s) => s.clone(),
            FieldValue::Number(d) => d.normalize().to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Boolean(b) => b.to_string(),
        }
    }

    /// Converts a stored JSON value, using the field type when one is known.
    pub fn from_json(value: &JsonValue, ty: Option<FieldType>) -> FieldValue {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Boolean(*b),
            JsonValue::Number(n) => {
                let raw = n.to_string();
                Decimal::from_str(&raw)
                    .or_else(|_| Decimal::from_scientific(&raw))
                    .map(FieldValue::Number)
                    .unwrap_or(FieldValue::Text(raw))
            }
            JsonValue::String(s) => match ty {
                Some(ty) => coerce_field_value(s, ty),
                None => FieldValue::Text(s.clone()),
            },
            other => FieldValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Text(s) | FieldValue::Picklist(s) => JsonValue::String(s.clone()),
            FieldValue::Number(d) => serde_json::Number::from_str(&d.normalize().to_string())
                .map(JsonValue::Number)
                .unwrap_or_else(|_| JsonValue::String(d.to_string())),
            FieldValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed.date());
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_decimal(value: &str) -> Result<Decimal> {
    let cleaned = value.trim().replace(',', "");
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .with_context(|| format!("Failed to parse '{value}' as number"))
}

/// Parses an import cell into the value shape declared by `ty`.
///
/// Empty cells become [`FieldValue::Null`].
pub fn parse_field_value(value: &str, ty: FieldType) -> Result<FieldValue> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(FieldValue::Null);
    }
    let parsed = match ty {
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Email
        | FieldType::Phone
        | FieldType::Url => FieldValue::Text(trimmed.to_string()),
        FieldType::Picklist => FieldValue::Picklist(trimmed.to_string()),
        FieldType::Number => FieldValue::Number(parse_decimal(trimmed)?),
        FieldType::Date => FieldValue::Date(parse_naive_date(trimmed)?),
        FieldType::Boolean => {
            let lowered = trimmed.to_ascii_lowercase();
            let parsed = match lowered.as_str() {
                "true" | "t" | "yes" | "y" | "1" => true,
                "false" | "f" | "no" | "n" | "0" => false,
                _ => bail!("Failed to parse '{value}' as boolean"),
            };
            FieldValue::Boolean(parsed)
        }
    };
    Ok(parsed)
}

/// Like [`parse_field_value`], but keeps unparsable input as text.
pub fn coerce_field_value(value: &str, ty: FieldType) -> FieldValue {
    match parse_field_value(value, ty) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("{err:#}; keeping value as text");
            FieldValue::Text(value.trim().to_string())
        }
    }
}
