//! JSON-file workspace implementing both the schema catalog and the record store.
//!
//! ```json
//! { "objects": [ { "id": "contacts", "name": "Contact",
//!     "fields": [ { "id": "...", "name": "Email", "api_name": "email",
//!                   "data_type": "email", "is_required": true } ],
//!     "records": [ { "id": "...", "values": { "email": "ada@example.com" } } ] } ] }
//! ```

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::{
    apply::RecordStore,
    data::FieldValue,
    duplicates::ExistingRecord,
    error::StoreError,
    schema::{FieldType, NewField, SchemaCatalog, SchemaField},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub objects: Vec<ObjectType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(default)]
    pub values: Map<String, JsonValue>,
}

impl ObjectType {
    fn field_type(&self, api_name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.api_name == api_name)
            .map(|f| f.data_type)
    }
}

impl Workspace {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening workspace file {path:?}"))?;
        let workspace = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing workspace JSON {path:?}"))?;
        Ok(workspace)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating workspace file {path:?}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).context("Writing workspace JSON")?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Looks up an object type by id, or by name ignoring case.
    pub fn object(&self, key: &str) -> Result<&ObjectType, StoreError> {
        self.objects
            .iter()
            .find(|o| o.id == key)
            .or_else(|| self.objects.iter().find(|o| o.name.eq_ignore_ascii_case(key)))
            .ok_or_else(|| StoreError::ObjectTypeNotFound(key.to_string()))
    }

    fn object_mut(&mut self, key: &str) -> Result<&mut ObjectType, StoreError> {
        let index = self
            .objects
            .iter()
            .position(|o| o.id == key)
            .or_else(|| {
                self.objects
                    .iter()
                    .position(|o| o.name.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| StoreError::ObjectTypeNotFound(key.to_string()))?;
        Ok(&mut self.objects[index])
    }
}

fn to_json_map(values: &BTreeMap<String, FieldValue>) -> Map<String, JsonValue> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

impl SchemaCatalog for Workspace {
    fn list_fields(&self, object_type_id: &str) -> Result<Vec<SchemaField>, StoreError> {
        Ok(self.object(object_type_id)?.fields.clone())
    }

    fn create_field(
        &mut self,
        object_type_id: &str,
        field: NewField,
    ) -> Result<SchemaField, StoreError> {
        if field.name.trim().is_empty() || field.api_name.trim().is_empty() {
            return Err(StoreError::EmptyFieldName);
        }
        let object = self.object_mut(object_type_id)?;
        if object.fields.iter().any(|f| f.api_name == field.api_name) {
            return Err(StoreError::DuplicateApiName {
                object_type: object.name.clone(),
                api_name: field.api_name,
            });
        }
        let created = SchemaField {
            id: Uuid::new_v4().to_string(),
            name: field.name,
            api_name: field.api_name,
            data_type: field.data_type,
            is_required: field.required,
        };
        object.fields.push(created.clone());
        Ok(created)
    }
}

impl RecordStore for Workspace {
    fn list_records(&self, object_type_id: &str) -> Result<Vec<ExistingRecord>, StoreError> {
        let object = self.object(object_type_id)?;
        Ok(object
            .records
            .iter()
            .map(|record| ExistingRecord {
                id: record.id.clone(),
                values: record
                    .values
                    .iter()
                    .map(|(key, value)| {
                        (key.clone(), FieldValue::from_json(value, object.field_type(key)))
                    })
                    .collect(),
            })
            .collect())
    }

    fn create_record(
        &mut self,
        object_type_id: &str,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<String, StoreError> {
        let object = self.object_mut(object_type_id)?;
        let id = Uuid::new_v4().to_string();
        object.records.push(StoredRecord {
            id: id.clone(),
            values: to_json_map(values),
        });
        Ok(id)
    }

    fn update_record(
        &mut self,
        record_id: &str,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<(), StoreError> {
        let record = self
            .objects
            .iter_mut()
            .flat_map(|o| o.records.iter_mut())
            .find(|r| r.id == record_id)
            .ok_or_else(|| StoreError::RecordNotFound(record_id.to_string()))?;
        record.values.extend(to_json_map(values));
        Ok(())
    }
}
