//! Column-to-field mapping for an import session.

use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use log::{debug, warn};
use serde::Serialize;

use crate::{
    error::{ImportError, MappingError},
    schema::{FieldType, NewField, SchemaCatalog, SchemaField},
    tabular::TabularData,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub source_column_index: usize,
    pub source_column_name: String,
    pub target_field: Option<SchemaField>,
}

impl ColumnMapping {
    pub fn is_mapped(&self) -> bool {
        self.target_field.is_some()
    }

    pub fn target_api_name(&self) -> Option<&str> {
        self.target_field.as_ref().map(|f| f.api_name.as_str())
    }
}

/// Auto-matches each header to the first field whose name or api name equals it.
///
/// A field is claimed by the first header that matches it; later headers that
/// match the same field stay unmapped.
pub fn initial_mappings(data: &TabularData, fields: &[SchemaField]) -> Vec<ColumnMapping> {
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    data.headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let mut target_field = fields.iter().find(|f| f.matches_header(header));
            if let Some(field) = target_field {
                match claimed.entry(field.id.as_str()) {
                    Entry::Occupied(first) => {
                        warn!(
                            "Column '{header}' also matches {}, already taken by column '{}'; leaving it unmapped",
                            field.label(),
                            first.get()
                        );
                        target_field = None;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(header.as_str());
                    }
                }
            }
            match &target_field {
                Some(field) => debug!("Column '{header}' auto-matched to {}", field.label()),
                None => debug!("Column '{header}' left unmapped"),
            }
            ColumnMapping {
                source_column_index: idx,
                source_column_name: header.clone(),
                target_field: target_field.cloned(),
            }
        })
        .collect()
}

/// Points one column at `field`, or clears it with `None`.
///
/// Rejects the edit when another column already targets the same field.
pub fn update_mapping(
    mappings: &mut [ColumnMapping],
    column_index: usize,
    field: Option<&SchemaField>,
) -> Result<(), MappingError> {
    let count = mappings.len();
    if column_index >= count {
        return Err(MappingError::ColumnOutOfRange {
            index: column_index,
            count,
        });
    }
    if let Some(field) = field
        && let Some(other) = mappings
            .iter()
            .find(|m| m.source_column_index != column_index && targets(m, field))
    {
        return Err(MappingError::FieldAlreadyMapped {
            field: field.api_name.clone(),
            column: other.source_column_name.clone(),
        });
    }
    mappings[column_index].target_field = field.cloned();
    Ok(())
}

/// Same as [`update_mapping`] without the double-mapping guard.
pub fn update_mapping_unchecked(
    mappings: &mut [ColumnMapping],
    column_index: usize,
    field: Option<&SchemaField>,
) -> Result<(), MappingError> {
    let count = mappings.len();
    let Some(mapping) = mappings.get(column_index) else {
        return Err(MappingError::ColumnOutOfRange {
            index: column_index,
            count,
        });
    };
    if let Some(field) = field
        && let Some(other) = mappings
            .iter()
            .find(|m| m.source_column_index != column_index && targets(m, field))
    {
        warn!(
            "Field '{}' is now mapped from both '{}' and '{}'",
            field.api_name, other.source_column_name, mapping.source_column_name
        );
    }
    mappings[column_index].target_field = field.cloned();
    Ok(())
}

fn targets(mapping: &ColumnMapping, field: &SchemaField) -> bool {
    mapping
        .target_field
        .as_ref()
        .is_some_and(|target| target.id == field.id)
}

pub fn unmapped_columns(mappings: &[ColumnMapping]) -> Vec<usize> {
    mappings
        .iter()
        .filter(|m| !m.is_mapped())
        .map(|m| m.source_column_index)
        .collect()
}

/// Header to field api name, for mapped columns only.
pub fn header_field_map(mappings: &[ColumnMapping]) -> BTreeMap<String, String> {
    mappings
        .iter()
        .filter_map(|m| {
            m.target_api_name()
                .map(|api| (m.source_column_name.clone(), api.to_string()))
        })
        .collect()
}

/// Required schema fields that no column targets.
pub fn missing_required_fields<'a>(
    mappings: &[ColumnMapping],
    fields: &'a [SchemaField],
) -> Vec<&'a SchemaField> {
    fields
        .iter()
        .filter(|f| f.is_required && !mappings.iter().any(|m| targets(m, f)))
        .collect()
}

/// Creates a field named after the column's header and maps the column to it.
pub fn create_field_for_column<C>(
    catalog: &mut C,
    object_type_id: &str,
    mappings: &mut [ColumnMapping],
    column_index: usize,
    data_type: FieldType,
    required: bool,
) -> Result<SchemaField, ImportError>
where
    C: SchemaCatalog + ?Sized,
{
    let count = mappings.len();
    let header = mappings
        .get(column_index)
        .map(|m| m.source_column_name.clone())
        .ok_or(MappingError::ColumnOutOfRange {
            index: column_index,
            count,
        })?;
    let mut request = NewField::from_header(&header, data_type);
    request.required = required;
    let field = catalog.create_field(object_type_id, request)?;
    debug!("Created field {} for column '{header}'", field.label());
    update_mapping(mappings, column_index, Some(&field))?;
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn field(id: &str, name: &str, api_name: &str, data_type: FieldType) -> SchemaField {
        SchemaField {
            id: id.to_string(),
            name: name.to_string(),
            api_name: api_name.to_string(),
            data_type,
            is_required: false,
        }
    }

    fn data(headers: &[&str]) -> TabularData {
        TabularData {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[derive(Default)]
    struct MemoryCatalog {
        created: Vec<SchemaField>,
    }

    impl SchemaCatalog for MemoryCatalog {
        fn list_fields(&self, _object_type_id: &str) -> Result<Vec<SchemaField>, StoreError> {
            Ok(self.created.clone())
        }

        fn create_field(
            &mut self,
            _object_type_id: &str,
            field: NewField,
        ) -> Result<SchemaField, StoreError> {
            let created = SchemaField {
                id: format!("new-{}", self.created.len()),
                name: field.name,
                api_name: field.api_name,
                data_type: field.data_type,
                is_required: field.required,
            };
            self.created.push(created.clone());
            Ok(created)
        }
    }

    #[test]
    fn initial_mappings_match_name_or_api_name() {
        let fields = vec![
            field("1", "Name", "full_name", FieldType::Text),
            field("2", "Email Address", "email", FieldType::Email),
        ];
        let mappings = initial_mappings(&data(&["Email", "name", "Phone"]), &fields);
        assert_eq!(mappings[0].target_api_name(), Some("email"));
        assert_eq!(mappings[1].target_api_name(), Some("full_name"));
        assert_eq!(mappings[2].target_field, None);
        assert_eq!(unmapped_columns(&mappings), vec![2]);
    }

    #[test]
    fn initial_mappings_let_the_first_header_claim_a_field() {
        let fields = vec![field("2", "Email Address", "email", FieldType::Email)];
        let data = TabularData {
            headers: vec!["Email".into(), "Email Address".into()],
            rows: vec![vec!["a@x.io".into(), "b@x.io".into()]],
        };
        let mappings = initial_mappings(&data, &fields);
        assert_eq!(mappings[0].target_api_name(), Some("email"));
        assert_eq!(mappings[1].target_field, None);
        assert_eq!(unmapped_columns(&mappings), vec![1]);
        assert_eq!(header_field_map(&mappings).len(), 1);
    }

    #[test]
    fn initial_mappings_take_first_match() {
        let fields = vec![
            field("1", "Status", "status_a", FieldType::Text),
            field("2", "status", "status_b", FieldType::Text),
        ];
        let mappings = initial_mappings(&data(&["STATUS"]), &fields);
        assert_eq!(mappings[0].target_api_name(), Some("status_a"));
    }

    #[test]
    fn update_mapping_rejects_double_mapping() {
        let email = field("2", "Email", "email", FieldType::Email);
        let fields = vec![email.clone()];
        let mut mappings = initial_mappings(&data(&["Email", "Work Email"]), &fields);
        let err = update_mapping(&mut mappings, 1, Some(&email)).unwrap_err();
        assert_eq!(
            err,
            MappingError::FieldAlreadyMapped {
                field: "email".to_string(),
                column: "Email".to_string(),
            }
        );

        update_mapping(&mut mappings, 0, None).unwrap();
        update_mapping(&mut mappings, 1, Some(&email)).unwrap();
        assert_eq!(unmapped_columns(&mappings), vec![0]);
        assert_eq!(
            header_field_map(&mappings).get("Work Email").map(String::as_str),
            Some("email")
        );
    }

    #[test]
    fn update_mapping_allows_remapping_same_column() {
        let email = field("2", "Email", "email", FieldType::Email);
        let mut mappings = initial_mappings(&data(&["Email"]), std::slice::from_ref(&email));
        assert!(update_mapping(&mut mappings, 0, Some(&email)).is_ok());
        assert!(matches!(
            update_mapping(&mut mappings, 3, None),
            Err(MappingError::ColumnOutOfRange { index: 3, count: 1 })
        ));
    }

    #[test]
    fn unchecked_update_permits_shared_targets() {
        let email = field("2", "Email", "email", FieldType::Email);
        let mut mappings = initial_mappings(&data(&["Email", "Alt"]), std::slice::from_ref(&email));
        update_mapping_unchecked(&mut mappings, 1, Some(&email)).unwrap();
        assert!(unmapped_columns(&mappings).is_empty());
    }

    #[test]
    fn missing_required_fields_lists_unmapped_required() {
        let mut company = field("3", "Company", "company", FieldType::Text);
        company.is_required = true;
        let fields = vec![field("1", "Name", "name", FieldType::Text), company];
        let mappings = initial_mappings(&data(&["Name"]), &fields);
        let missing = missing_required_fields(&mappings, &fields);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].api_name, "company");
    }

    #[test]
    fn create_field_for_column_maps_the_new_field() {
        let mut catalog = MemoryCatalog::default();
        let mut mappings = initial_mappings(&data(&["Lead  Source"]), &[]);
        let created = create_field_for_column(
            &mut catalog,
            "leads",
            &mut mappings,
            0,
            FieldType::Picklist,
            false,
        )
        .unwrap();
        assert_eq!(created.api_name, "lead_source");
        assert_eq!(created.name, "Lead  Source");
        assert_eq!(mappings[0].target_field.as_ref(), Some(&created));
    }
}
