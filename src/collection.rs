// Persistence abstraction shared by the in-memory and SQLite backends

use crate::filter::Filter;
use crate::record::Record;

/// Errors a collection operation can surface to its caller
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// A unique field collides with another record
    #[error("{field} '{value}' is already taken")]
    Conflict { field: String, value: String },

    /// The payload is well-formed but points at something that doesn't exist
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },

    #[error("{0:#}")]
    Other(eyre::Report),
}

impl From<eyre::Report> for StoreError {
    fn from(report: eyre::Report) -> Self {
        StoreError::Other(report)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Other(eyre::Report::new(err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Other(eyre::Report::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A mapping from numeric identifier to record, with create/read/update/delete.
///
/// Identifiers are assigned by the collection on `create` and are never reused,
/// even after the record holding the highest identifier is deleted.
pub trait Collection<T: Record>: Send + Sync {
    /// All records in collection order
    fn list(&self) -> StoreResult<Vec<T>>;

    fn get(&self, id: i64) -> StoreResult<Option<T>>;

    /// Assign the next identifier and store the record built from `draft`
    fn create(&self, draft: T::Draft) -> StoreResult<T>;

    /// Apply a partial patch to an existing record
    fn update(&self, id: i64, patch: T::Patch) -> StoreResult<T>;

    /// Remove a record, returning what was removed
    fn delete(&self, id: i64) -> StoreResult<T>;

    /// Records whose indexed fields satisfy every filter
    fn find(&self, filters: &[Filter]) -> StoreResult<Vec<T>>;

    /// Like `get`, but a missing record is an error
    fn fetch(&self, id: i64) -> StoreResult<T> {
        self.get(id)?.ok_or(StoreError::NotFound { kind: T::kind(), id })
    }
}

/// Check `candidate`'s unique fields against every other record in `existing`
pub(crate) fn check_unique<'a, T: Record>(
    existing: impl IntoIterator<Item = &'a T>,
    candidate: &T,
) -> StoreResult<()> {
    let unique = T::unique_fields();
    if unique.is_empty() {
        return Ok(());
    }

    let candidate_fields = candidate.indexed_fields();
    for other in existing {
        if other.id() == candidate.id() {
            continue;
        }
        let other_fields = other.indexed_fields();
        for field in unique {
            match (candidate_fields.get(*field), other_fields.get(*field)) {
                (Some(a), Some(b)) if a == b => {
                    return Err(StoreError::Conflict {
                        field: field.to_string(),
                        value: a.to_string(),
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}
