// RecordStore - CRUD REST services over in-memory and SQLite-backed collections

pub mod api;
pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod memory;
pub mod models;
pub mod password;
pub mod record;
pub mod signup;
pub mod store;

// Re-export main types for convenience
pub use collection::{Collection, StoreError, StoreResult};
pub use error::{ApiError, ApiResult, ValidationErrors};
pub use filter::{Filter, FilterOp};
pub use memory::MemoryCollection;
pub use password::PasswordHasher;
pub use record::{IndexValue, Record, Reference};
pub use store::{SqliteCollection, Store};
