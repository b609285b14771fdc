//! Persistence layer for per-tenant message tables.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{StoredMessage, TenantStore};
