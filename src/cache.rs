//! Time-bounded snapshot of existing records, owned by one import session.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use log::debug;

use crate::{apply::RecordStore, duplicates::ExistingRecord, error::StoreError};

pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Snapshot {
    loaded_at: Instant,
    records: Vec<ExistingRecord>,
}

#[derive(Debug)]
pub struct SnapshotCache {
    ttl: Duration,
    entries: HashMap<String, Snapshot>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_TTL)
    }
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn is_fresh(&self, object_type_id: &str) -> bool {
        self.entries
            .get(object_type_id)
            .is_some_and(|s| s.loaded_at.elapsed() < self.ttl)
    }

    pub fn get_or_load<S>(
        &mut self,
        store: &S,
        object_type_id: &str,
    ) -> Result<&[ExistingRecord], StoreError>
    where
        S: RecordStore + ?Sized,
    {
        if !self.is_fresh(object_type_id) {
            let records = store.list_records(object_type_id)?;
            debug!(
                "Loaded {} existing record(s) for '{object_type_id}'",
                records.len()
            );
            self.entries.insert(
                object_type_id.to_string(),
                Snapshot {
                    loaded_at: Instant::now(),
                    records,
                },
            );
        }
        Ok(self
            .entries
            .get(object_type_id)
            .map(|s| s.records.as_slice())
            .unwrap_or_default())
    }

    pub fn invalidate(&mut self, object_type_id: &str) {
        self.entries.remove(object_type_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
