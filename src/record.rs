// Generic record trait for any storable type

use crate::collection::StoreResult;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;

/// Core trait that any storable record must implement
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Create payload: every field except the identifier
    type Draft: DeserializeOwned + Send + 'static;

    /// Update payload: every field optional, absent fields stay untouched
    type Patch: DeserializeOwned + Send + 'static;

    /// Unique identifier for this record, assigned by the collection
    fn id(&self) -> i64;

    /// Collection name for this record type (e.g., "books", "readers")
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Human-readable kind used in messages (e.g., "Book")
    fn kind() -> &'static str
    where
        Self: Sized;

    /// Build a record from a create payload and the identifier assigned to it
    fn from_draft(id: i64, draft: Self::Draft) -> Self
    where
        Self: Sized;

    /// Overwrite only the fields present in the patch
    fn apply(&mut self, patch: Self::Patch);

    /// Field-level constraints checked before every write
    fn validate(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Fields to index for filtering
    /// Return empty HashMap if no fields should be indexed
    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        HashMap::new()
    }

    /// Indexed fields whose value must not repeat within the collection
    fn unique_fields() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }

    /// Records in other collections this one points at
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

/// Value types that can be indexed for filtering
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl std::fmt::Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexValue::String(s) => write!(f, "{}", s),
            IndexValue::Int(i) => write!(f, "{}", i),
            IndexValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A non-owning pointer from one record to a record of another collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Field on the referencing record (e.g., "reader_id")
    pub field: &'static str,
    /// Collection the target lives in
    pub collection: &'static str,
    pub id: i64,
}
