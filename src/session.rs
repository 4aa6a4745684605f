//! A single import session: parsed data, its mapping and the duplicate check.

use log::{info, warn};

use crate::{
    apply::{self, ApplyError, ImportDecision, ImportStrategy, ImportSummary, RecordStore},
    cache::SnapshotCache,
    duplicates::{DuplicateDetector, DuplicateMatch, FieldRef},
    error::{ImportError, MappingError},
    infer::{self, DEFAULT_MAX_SAMPLES, FieldSuggestion},
    mapping::{self, ColumnMapping},
    schema::{FieldType, SchemaCatalog, SchemaField},
    tabular::TabularData,
};

#[derive(Debug)]
pub struct ImportSession {
    object_type_id: String,
    fields: Vec<SchemaField>,
    data: TabularData,
    mappings: Vec<ColumnMapping>,
    strategy: ImportStrategy,
    max_samples: usize,
    matches: Option<Vec<DuplicateMatch>>,
    cache: SnapshotCache,
}

impl ImportSession {
    /// Loads the target fields and auto-matches columns against them.
    pub fn new<C>(catalog: &C, object_type_id: &str, data: TabularData) -> Result<Self, ImportError>
    where
        C: SchemaCatalog + ?Sized,
    {
        let fields = catalog.list_fields(object_type_id)?;
        let mappings = mapping::initial_mappings(&data, &fields);
        info!(
            "Matched {} of {} column(s) to fields on '{object_type_id}'",
            mappings.iter().filter(|m| m.is_mapped()).count(),
            mappings.len()
        );
        Ok(Self {
            object_type_id: object_type_id.to_string(),
            fields,
            data,
            mappings,
            strategy: ImportStrategy::default(),
            max_samples: DEFAULT_MAX_SAMPLES,
            matches: None,
            cache: SnapshotCache::default(),
        })
    }

    pub fn with_strategy(mut self, strategy: ImportStrategy) -> Self {
        self.strategy = strategy;
        self.matches = None;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn object_type_id(&self) -> &str {
        &self.object_type_id
    }

    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    pub fn unmapped_columns(&self) -> Vec<usize> {
        mapping::unmapped_columns(&self.mappings)
    }

    pub fn missing_required_fields(&self) -> Vec<&SchemaField> {
        mapping::missing_required_fields(&self.mappings, &self.fields)
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        let header = header.trim();
        self.mappings
            .iter()
            .position(|m| m.source_column_name == header)
            .or_else(|| {
                self.mappings
                    .iter()
                    .position(|m| m.source_column_name.eq_ignore_ascii_case(header))
            })
    }

    /// Maps a column to the field with the given id or api name, or clears it.
    pub fn set_mapping(
        &mut self,
        column_index: usize,
        field_key: Option<&str>,
    ) -> Result<(), MappingError> {
        let field = match field_key {
            Some(key) => Some(
                self.fields
                    .iter()
                    .find(|f| f.id == key || f.api_name == key)
                    .ok_or_else(|| MappingError::FieldNotFound(key.to_string()))?,
            ),
            None => None,
        };
        mapping::update_mapping(&mut self.mappings, column_index, field)?;
        self.matches = None;
        Ok(())
    }

    pub fn suggest_fields(&self) -> Vec<FieldSuggestion> {
        infer::guess_unmapped(&self.data, &self.mappings, self.max_samples)
    }

    pub fn create_field_for_column<C>(
        &mut self,
        catalog: &mut C,
        column_index: usize,
        data_type: FieldType,
    ) -> Result<SchemaField, ImportError>
    where
        C: SchemaCatalog + ?Sized,
    {
        let field = mapping::create_field_for_column(
            catalog,
            &self.object_type_id,
            &mut self.mappings,
            column_index,
            data_type,
            false,
        )?;
        self.fields.push(field.clone());
        self.matches = None;
        Ok(field)
    }

    /// Creates a field with the guessed type for every unmapped column.
    pub fn create_missing_fields<C>(&mut self, catalog: &mut C) -> Result<Vec<SchemaField>, ImportError>
    where
        C: SchemaCatalog + ?Sized,
    {
        let mut created = Vec::new();
        for suggestion in self.suggest_fields() {
            if suggestion.api_name.is_empty() {
                warn!(
                    "Skipping column {} with an empty header",
                    suggestion.column_index + 1
                );
                continue;
            }
            let field =
                self.create_field_for_column(catalog, suggestion.column_index, suggestion.data_type)?;
            info!(
                "Created {} field {} for column '{}'",
                field.data_type,
                field.label(),
                suggestion.column_name
            );
            created.push(field);
        }
        Ok(created)
    }

    /// Checks that the strategy's match field exists and some column feeds it.
    pub fn ensure_match_field_mapped(&self) -> Result<(), MappingError> {
        let Some(api_name) = self
            .strategy
            .match_field_api_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
        else {
            return Ok(());
        };
        if !self.fields.iter().any(|f| f.api_name == api_name) {
            return Err(MappingError::FieldNotFound(api_name.to_string()));
        }
        if !self
            .mappings
            .iter()
            .any(|m| m.target_api_name() == Some(api_name))
        {
            return Err(MappingError::MatchFieldUnmapped(api_name.to_string()));
        }
        Ok(())
    }

    /// Compares the mapped rows with the current record snapshot.
    ///
    /// Each call replaces the previous result.
    pub fn check_duplicates<S>(&mut self, store: &S) -> Result<&[DuplicateMatch], ImportError>
    where
        S: RecordStore + ?Sized,
    {
        self.ensure_match_field_mapped()?;
        let existing = self.cache.get_or_load(store, &self.object_type_id)?;
        let field_refs = self.fields.iter().map(FieldRef::from).collect::<Vec<_>>();
        let detector =
            DuplicateDetector::with_match_field(self.strategy.match_field_api_name.clone());
        let found = detector.find(
            &self.data.rows,
            &self.data.headers,
            &mapping::header_field_map(&self.mappings),
            existing,
            &field_refs,
        );
        info!(
            "Found {} potential duplicate(s) across {} row(s)",
            found.len(),
            self.data.row_count()
        );
        let found = self.matches.insert(found);
        Ok(found.as_slice())
    }

    pub fn duplicates(&self) -> Option<&[DuplicateMatch]> {
        self.matches.as_deref()
    }

    /// Decisions for every row, using the last duplicate check (none if never run).
    pub fn decisions(&self) -> Vec<ImportDecision> {
        apply::decide(
            &self.data,
            &self.mappings,
            self.matches.as_deref().unwrap_or_default(),
            &self.strategy,
        )
    }

    pub fn apply<S>(&mut self, store: &mut S) -> Result<ImportSummary, ApplyError>
    where
        S: RecordStore + ?Sized,
    {
        let decisions = self.decisions();
        let result = apply::apply(store, &self.object_type_id, &decisions);
        let wrote = match &result {
            Ok(summary) => summary.writes() > 0,
            Err(err) => err.applied.writes() > 0,
        };
        if wrote {
            self.cache.invalidate(&self.object_type_id);
            self.matches = None;
        }
        result
    }
}
