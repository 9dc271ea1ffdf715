// Process-local collection kept in insertion order

use crate::collection::{Collection, StoreError, StoreResult, check_unique};
use crate::filter::Filter;
use crate::record::Record;
use eyre::eyre;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

struct State<T> {
    records: Vec<T>,
    /// Highest identifier ever handed out
    last_id: i64,
}

/// In-memory collection backed by an ordered `Vec`.
///
/// References to other collections are not checked; there is nothing to check
/// them against.
pub struct MemoryCollection<T> {
    state: Mutex<State<T>>,
}

impl<T: Record> MemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                records: Vec::new(),
                last_id: 0,
            }),
        }
    }

    /// Build a collection pre-populated from create payloads, numbered from 1
    pub fn seeded<I>(drafts: I) -> Self
    where
        I: IntoIterator<Item = T::Draft>,
    {
        let records: Vec<T> = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| T::from_draft(i as i64 + 1, draft))
            .collect();
        let last_id = records.len() as i64;

        Self {
            state: Mutex::new(State { records, last_id }),
        }
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.records.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State<T>>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Other(eyre!("{} collection lock poisoned", T::collection_name())))
    }
}

impl<T: Record> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Collection<T> for MemoryCollection<T> {
    fn list(&self) -> StoreResult<Vec<T>> {
        Ok(self.lock()?.records.clone())
    }

    fn get(&self, id: i64) -> StoreResult<Option<T>> {
        Ok(self.lock()?.records.iter().find(|r| r.id() == id).cloned())
    }

    fn create(&self, draft: T::Draft) -> StoreResult<T> {
        let mut state = self.lock()?;

        let max_existing = state.records.iter().map(Record::id).max().unwrap_or(0);
        let id = state.last_id.max(max_existing) + 1;
        let record = T::from_draft(id, draft);
        record.validate()?;
        check_unique(&state.records, &record)?;

        state.records.push(record.clone());
        state.last_id = id;
        debug!(collection = T::collection_name(), id, "memory: created record");
        Ok(record)
    }

    fn update(&self, id: i64, patch: T::Patch) -> StoreResult<T> {
        let mut state = self.lock()?;

        let pos = state
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or(StoreError::NotFound { kind: T::kind(), id })?;

        let mut updated = state.records[pos].clone();
        updated.apply(patch);
        updated.validate()?;
        check_unique(&state.records, &updated)?;

        state.records[pos] = updated.clone();
        debug!(collection = T::collection_name(), id, "memory: updated record");
        Ok(updated)
    }

    fn delete(&self, id: i64) -> StoreResult<T> {
        let mut state = self.lock()?;

        let pos = state
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or(StoreError::NotFound { kind: T::kind(), id })?;

        debug!(collection = T::collection_name(), id, "memory: deleted record");
        Ok(state.records.remove(pos))
    }

    fn find(&self, filters: &[Filter]) -> StoreResult<Vec<T>> {
        let state = self.lock()?;
        Ok(state
            .records
            .iter()
            .filter(|r| {
                let fields = r.indexed_fields();
                filters.iter().all(|f| f.matches(&fields))
            })
            .cloned()
            .collect())
    }
}
