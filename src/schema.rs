//! Object field model and the schema catalog seam.
//!
//! A [`SchemaField`] is a typed slot on a custom object type. The import
//! pipeline only reads fields, except for the explicit field-creation escape
//! hatch which goes through [`SchemaCatalog::create_field`].

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Email,
    Phone,
    Date,
    Url,
    Picklist,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Date => "date",
            FieldType::Url => "url",
            FieldType::Picklist => "picklist",
            FieldType::Boolean => "boolean",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "text", "textarea", "number", "email", "phone", "date", "url", "picklist", "boolean",
        ]
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "text" | "string" => Ok(FieldType::Text),
            "textarea" | "longtext" => Ok(FieldType::Textarea),
            "number" | "integer" | "float" | "decimal" => Ok(FieldType::Number),
            "email" => Ok(FieldType::Email),
            "phone" => Ok(FieldType::Phone),
            "date" => Ok(FieldType::Date),
            "url" => Ok(FieldType::Url),
            "picklist" => Ok(FieldType::Picklist),
            "boolean" | "bool" | "checkbox" => Ok(FieldType::Boolean),
            _ => Err(anyhow!(
                "Unknown field type '{value}'. Supported types: {}",
                FieldType::variants().join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaField {
    pub id: String,
    pub name: String,
    pub api_name: String,
    pub data_type: FieldType,
    #[serde(default)]
    pub is_required: bool,
}

impl SchemaField {
    /// Case-insensitive exact comparison against the field's display or api name.
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim().to_lowercase();
        !header.is_empty()
            && (self.name.trim().to_lowercase() == header
                || self.api_name.trim().to_lowercase() == header)
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.api_name)
    }
}

/// Request payload for creating a new field on an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewField {
    pub name: String,
    pub api_name: String,
    pub data_type: FieldType,
    pub required: bool,
}

impl NewField {
    /// Pre-fills a field request from a source column header.
    pub fn from_header(header: &str, data_type: FieldType) -> Self {
        Self {
            name: header.trim().to_string(),
            api_name: normalize_api_name(header),
            data_type,
            required: false,
        }
    }
}

pub trait SchemaCatalog {
    fn list_fields(&self, object_type_id: &str) -> Result<Vec<SchemaField>, StoreError>;
    fn create_field(
        &mut self,
        object_type_id: &str,
        field: NewField,
    ) -> Result<SchemaField, StoreError>;
}

/// Lowercases a display name and collapses whitespace runs into single underscores.
pub fn normalize_api_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, api_name: &str) -> SchemaField {
        SchemaField {
            id: format!("f-{api_name}"),
            name: name.to_string(),
            api_name: api_name.to_string(),
            data_type: FieldType::Text,
            is_required: false,
        }
    }

    #[test]
    fn normalize_api_name_collapses_whitespace_runs() {
        assert_eq!(normalize_api_name("First Name"), "first_name");
        assert_eq!(normalize_api_name("  Lead \t  Source "), "lead_source");
        assert_eq!(normalize_api_name("E-Mail"), "e-mail");
    }

    #[test]
    fn matches_header_is_case_insensitive_and_exact() {
        let email = field("Email Address", "email");
        assert!(email.matches_header("EMAIL"));
        assert!(email.matches_header("email address"));
        assert!(!email.matches_header("Email Addr"));
        assert!(!email.matches_header(""));
    }

    #[test]
    fn field_type_parses_aliases() {
        assert_eq!("Checkbox".parse::<FieldType>().unwrap(), FieldType::Boolean);
        assert_eq!("decimal".parse::<FieldType>().unwrap(), FieldType::Number);
        assert!("geo".parse::<FieldType>().is_err());
    }

    #[test]
    fn new_field_from_header_prefills_names() {
        let request = NewField::from_header(" Lead Source ", FieldType::Picklist);
        assert_eq!(request.name, "Lead Source");
        assert_eq!(request.api_name, "lead_source");
        assert!(!request.required);
    }
}
