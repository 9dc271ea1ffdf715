// Generic record store backed by SQLite

use crate::collection::{Collection, StoreError, StoreResult};
use crate::filter::{Filter, FilterOp};
use crate::record::{IndexValue, Record};
use eyre::{Context, Result, eyre};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const CURRENT_VERSION: u32 = 1;

/// Generic persistent store: one SQLite file holding every collection
pub struct Store {
    base_path: PathBuf,
    db: Connection,
}

impl Store {
    /// Open or create a store at the given path
    ///
    /// The store will be created in a `.recordstore` subdirectory of the given path.
    /// The schema is migrated on open, so a fresh directory is immediately usable.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(".recordstore");

        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join("recordstore.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        // Cascading deletes on the index tables depend on this
        db.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        let store = Self { base_path, db };
        store.migrate()?;

        Ok(store)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }

    /// Create tables and record the schema version. Safe to run repeatedly.
    pub fn migrate(&self) -> Result<()> {
        if let Some(found) = self.schema_version()? {
            if found > CURRENT_VERSION {
                return Err(eyre!(
                    "Store schema version {} is newer than supported version {}",
                    found,
                    CURRENT_VERSION
                ));
            }
        }

        self.create_schema()?;
        self.write_version()?;
        Ok(())
    }

    /// Schema version recorded in the store directory, if any
    pub fn schema_version(&self) -> Result<Option<u32>> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&version_path).context("Failed to read version file")?;
        let version: u32 = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid version file contents: {:?}", raw.trim()))?;
        Ok(Some(version))
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            -- Generic records table
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                data_json TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection);

            -- Highest identifier ever assigned per collection
            CREATE TABLE IF NOT EXISTS sequences (
                collection TEXT PRIMARY KEY,
                last_id INTEGER NOT NULL
            );

            -- Generic indexes table (for filtering on indexed fields)
            CREATE TABLE IF NOT EXISTS record_indexes (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                field_name TEXT NOT NULL,
                field_value_str TEXT,
                field_value_int INTEGER,
                field_value_bool INTEGER,
                PRIMARY KEY (collection, id, field_name),
                FOREIGN KEY (collection, id) REFERENCES records(collection, id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_record_indexes_field_str ON record_indexes(collection, field_name, field_value_str);
            CREATE INDEX IF NOT EXISTS idx_record_indexes_field_int ON record_indexes(collection, field_name, field_value_int);
            CREATE INDEX IF NOT EXISTS idx_record_indexes_field_bool ON record_indexes(collection, field_name, field_value_bool);

            -- Cross-collection references (book -> reader, clothes -> user)
            CREATE TABLE IF NOT EXISTS record_refs (
                collection TEXT NOT NULL,
                id INTEGER NOT NULL,
                field_name TEXT NOT NULL,
                target_collection TEXT NOT NULL,
                target_id INTEGER NOT NULL,
                PRIMARY KEY (collection, id, field_name),
                FOREIGN KEY (collection, id) REFERENCES records(collection, id) ON DELETE CASCADE,
                FOREIGN KEY (target_collection, target_id) REFERENCES records(collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_record_refs_target ON record_refs(target_collection, target_id);
            "#,
        )?;

        Ok(())
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        fs::write(version_path, CURRENT_VERSION.to_string()).context("Failed to write version file")?;
        Ok(())
    }

    // ========================================================================
    // Generic CRUD API
    // ========================================================================

    /// Create a new record, assigning the next identifier
    pub fn create<T: Record>(&mut self, draft: T::Draft) -> StoreResult<T> {
        let collection = T::collection_name();
        Self::validate_collection_name(collection)?;

        let tx = self.db.transaction()?;

        let id = Self::next_id(&tx, collection)?;
        let record = T::from_draft(id, draft);
        Self::check_record(&tx, &record)?;

        let data_json = serde_json::to_string(&record).context("Failed to serialize record")?;
        tx.execute(
            "INSERT INTO records (collection, id, data_json) VALUES (?1, ?2, ?3)",
            rusqlite::params![collection, id, data_json],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO sequences (collection, last_id) VALUES (?1, ?2)",
            rusqlite::params![collection, id],
        )?;

        Self::update_indexes_tx(&tx, &record)?;
        tx.commit()?;

        info!(collection, id, "Created record");
        Ok(record)
    }

    /// Get a record by ID
    pub fn get<T: Record>(&self, id: i64) -> Result<Option<T>> {
        Self::get_with(&self.db, id)
    }

    /// Apply a partial update to an existing record
    pub fn update<T: Record>(&mut self, id: i64, patch: T::Patch) -> StoreResult<T> {
        let collection = T::collection_name();
        let tx = self.db.transaction()?;

        let mut record: T = Self::get_with(&tx, id)?.ok_or(StoreError::NotFound { kind: T::kind(), id })?;
        record.apply(patch);
        Self::check_record(&tx, &record)?;

        let data_json = serde_json::to_string(&record).context("Failed to serialize record")?;
        tx.execute(
            "UPDATE records SET data_json = ?3 WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id, data_json],
        )?;

        Self::update_indexes_tx(&tx, &record)?;
        tx.commit()?;

        info!(collection, id, "Updated record");
        Ok(record)
    }

    /// Delete a record. Refused while other records still reference it.
    pub fn delete<T: Record>(&mut self, id: i64) -> StoreResult<T> {
        let collection = T::collection_name();
        let tx = self.db.transaction()?;

        let record: T = Self::get_with(&tx, id)?.ok_or(StoreError::NotFound { kind: T::kind(), id })?;

        let referrers: i64 = tx.query_row(
            "SELECT COUNT(*) FROM record_refs WHERE target_collection = ?1 AND target_id = ?2",
            rusqlite::params![collection, id],
            |row| row.get(0),
        )?;
        if referrers > 0 {
            warn!(collection, id, referrers, "Refusing to delete referenced record");
            return Err(StoreError::Conflict {
                field: "id".to_string(),
                value: format!("{} {} (still referenced by {} records)", T::kind(), id, referrers),
            });
        }

        tx.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
        )?;
        tx.commit()?;

        info!(collection, id, "Deleted record");
        Ok(record)
    }

    /// List records with optional filtering, in ascending identifier order
    pub fn list<T: Record>(&self, filters: &[Filter]) -> Result<Vec<T>> {
        let collection = T::collection_name();

        // If no filters, return all records
        if filters.is_empty() {
            let mut stmt = self
                .db
                .prepare("SELECT data_json FROM records WHERE collection = ?1 ORDER BY id ASC")?;

            let rows = stmt.query_map([collection], |row| row.get::<_, String>(0))?;

            let mut results = Vec::new();
            for row_result in rows {
                let data_json = row_result?;
                let record: T = serde_json::from_str(&data_json).context("Failed to deserialize record")?;
                results.push(record);
            }
            return Ok(results);
        }

        // With filters: query the record_indexes table
        let mut query = String::from(
            "SELECT r.data_json
             FROM records r
             WHERE r.collection = ?1",
        );

        for (i, filter) in filters.iter().enumerate() {
            Self::validate_field_name(&filter.field)?;

            let alias = format!("idx{}", i);
            let column = match &filter.value {
                IndexValue::String(_) => "field_value_str",
                IndexValue::Int(_) => "field_value_int",
                IndexValue::Bool(_) => "field_value_bool",
            };
            query.push_str(&format!(
                " AND EXISTS (
                    SELECT 1 FROM record_indexes {alias}
                    WHERE {alias}.collection = r.collection
                      AND {alias}.id = r.id
                      AND {alias}.field_name = ?{name_param}
                      AND {alias}.{column} {op} ?{value_param})",
                op = filter.op.to_sql(),
                name_param = i + 2,
                value_param = i + 2 + filters.len(),
            ));
        }

        query.push_str(" ORDER BY r.id ASC");

        let mut stmt = self.db.prepare(&query)?;

        // Bind parameters: collection, then field names, then values
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        params.push(Box::new(collection.to_string()));

        for filter in filters {
            params.push(Box::new(filter.field.clone()));
        }

        for filter in filters {
            match (&filter.value, filter.op) {
                (IndexValue::String(s), FilterOp::Contains) => params.push(Box::new(format!("%{}%", s))),
                (IndexValue::String(s), _) => params.push(Box::new(s.clone())),
                (IndexValue::Int(i), _) => params.push(Box::new(*i)),
                (IndexValue::Bool(b), _) => params.push(Box::new(*b as i64)),
            }
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row_result in rows {
            let data_json = row_result?;
            let record: T = serde_json::from_str(&data_json).context("Failed to deserialize record")?;
            results.push(record);
        }

        Ok(results)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn get_with<T: Record>(db: &Connection, id: i64) -> Result<Option<T>> {
        let collection = T::collection_name();

        let json: Option<String> = db
            .query_row(
                "SELECT data_json FROM records WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => {
                let record: T = serde_json::from_str(&json).context("Failed to deserialize record from database")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Next identifier: one past the larger of the sequence and the current maximum
    fn next_id(db: &Connection, collection: &str) -> Result<i64> {
        let last_assigned: Option<i64> = db
            .query_row(
                "SELECT last_id FROM sequences WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()?;
        let max_existing: i64 = db.query_row(
            "SELECT COALESCE(MAX(id), 0) FROM records WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;

        Ok(last_assigned.unwrap_or(0).max(max_existing) + 1)
    }

    /// Field constraints, foreign references, and unique fields
    fn check_record<T: Record>(db: &Connection, record: &T) -> StoreResult<()> {
        record.validate()?;

        for reference in record.references() {
            let exists: bool = db.query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE collection = ?1 AND id = ?2)",
                rusqlite::params![reference.collection, reference.id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::Invalid {
                    field: reference.field.to_string(),
                    message: format!("No {} with id {}.", reference.collection, reference.id),
                });
            }
        }

        let fields = record.indexed_fields();
        for field in T::unique_fields() {
            let Some(value) = fields.get(*field) else {
                continue;
            };
            let (column, param): (&str, Box<dyn rusqlite::ToSql>) = match value {
                IndexValue::String(s) => ("field_value_str", Box::new(s.clone())),
                IndexValue::Int(i) => ("field_value_int", Box::new(*i)),
                IndexValue::Bool(b) => ("field_value_bool", Box::new(*b as i64)),
            };
            let taken: bool = db.query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM record_indexes
                     WHERE collection = ?1 AND field_name = ?2 AND {} = ?3 AND id != ?4)",
                    column
                ),
                rusqlite::params![T::collection_name(), field, param, record.id()],
                |row| row.get(0),
            )?;
            if taken {
                return Err(StoreError::Conflict {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }

        Ok(())
    }

    fn update_indexes_tx<T: Record>(tx: &rusqlite::Transaction, record: &T) -> Result<()> {
        let collection = T::collection_name();
        let id = record.id();
        let fields: HashMap<String, IndexValue> = record.indexed_fields();
        debug!(collection, id, field_count = fields.len(), "update_indexes_tx: called");

        // Delete old indexes
        tx.execute(
            "DELETE FROM record_indexes WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
        )?;

        // Insert new indexes
        for (field_name, value) in &fields {
            Self::validate_field_name(field_name)?;

            match value {
                IndexValue::String(s) => {
                    tx.execute(
                        "INSERT INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                         VALUES (?1, ?2, ?3, ?4, NULL, NULL)",
                        rusqlite::params![collection, id, field_name, s],
                    )?;
                }
                IndexValue::Int(i) => {
                    tx.execute(
                        "INSERT INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                         VALUES (?1, ?2, ?3, NULL, ?4, NULL)",
                        rusqlite::params![collection, id, field_name, i],
                    )?;
                }
                IndexValue::Bool(b) => {
                    tx.execute(
                        "INSERT INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                         VALUES (?1, ?2, ?3, NULL, NULL, ?4)",
                        rusqlite::params![collection, id, field_name, *b as i64],
                    )?;
                }
            }
        }

        // Same replace-all approach for references
        tx.execute(
            "DELETE FROM record_refs WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
        )?;
        for reference in record.references() {
            tx.execute(
                "INSERT INTO record_refs (collection, id, field_name, target_collection, target_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![collection, id, reference.field, reference.collection, reference.id],
            )?;
        }

        Ok(())
    }

    fn validate_collection_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(eyre!("Collection name cannot be empty"));
        }
        if name.len() > 64 {
            return Err(eyre!("Collection name too long: {} (max 64 chars)", name));
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(eyre!(
                "Invalid collection name: {} (must be alphanumeric with _/-)",
                name
            ));
        }
        Ok(())
    }

    fn validate_field_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(eyre!("Field name cannot be empty"));
        }
        if name.len() > 64 {
            return Err(eyre!("Field name too long: {} (max 64 chars)", name));
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(eyre!("Invalid field name: {} (must be alphanumeric with _)", name));
        }
        Ok(())
    }
}

// ============================================================================
// Collection adapter
// ============================================================================

/// One record type's view of a shared `Store`
pub struct SqliteCollection<T> {
    store: Arc<Mutex<Store>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SqliteCollection<T> {
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| StoreError::Other(eyre!("Store lock poisoned")))
    }
}

impl<T: Record> Clone for SqliteCollection<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.store))
    }
}

impl<T: Record> Collection<T> for SqliteCollection<T> {
    fn list(&self) -> StoreResult<Vec<T>> {
        Ok(self.lock()?.list(&[])?)
    }

    fn get(&self, id: i64) -> StoreResult<Option<T>> {
        Ok(self.lock()?.get(id)?)
    }

    fn create(&self, draft: T::Draft) -> StoreResult<T> {
        self.lock()?.create(draft)
    }

    fn update(&self, id: i64, patch: T::Patch) -> StoreResult<T> {
        self.lock()?.update(id, patch)
    }

    fn delete(&self, id: i64) -> StoreResult<T> {
        self.lock()?.delete(id)
    }

    fn find(&self, filters: &[Filter]) -> StoreResult<Vec<T>> {
        Ok(self.lock()?.list(filters)?)
    }
}
