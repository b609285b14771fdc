//! libSQL backend — async `TenantStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{StoredMessage, TenantStore};
use crate::tenant::TenantDestination;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql error onto the storage taxonomy.
///
/// SQLite reports these conditions only through the message text.
fn map_write_error(e: libsql::Error, dest: &TenantDestination, op: &str) -> DatabaseError {
    let text = e.to_string();
    if text.contains("no such table") {
        DatabaseError::TableMissing {
            table: dest.table_name().to_string(),
        }
    } else if text.contains("constraint failed") {
        DatabaseError::Constraint(format!("{op}: {text}"))
    } else {
        DatabaseError::Query(format!("{op}: {text}"))
    }
}

/// Map a libsql Row to a StoredMessage.
///
/// Column order: 0:message, 1:analytics_bucket, 2:created_at
fn row_to_message(row: &libsql::Row) -> Result<StoredMessage, libsql::Error> {
    let created_str: String = row.get(2)?;
    Ok(StoredMessage {
        message: row.get(0)?,
        bucket_label: row.get(1)?,
        created_at: parse_datetime(&created_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl TenantStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn provision_tenant(&self, dest: &TenantDestination) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute_batch(&migrations::tenant_table_ddl(dest.table_name()))
            .await
            .map_err(|e| map_write_error(e, dest, "provision_tenant"))?;

        conn.execute(
            "INSERT OR IGNORE INTO tenants (tenant_hash, table_name, provisioned_at)
             VALUES (?1, ?2, ?3)",
            params![
                dest.tenant_hash(),
                dest.table_name(),
                Utc::now().to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_write_error(e, dest, "provision_tenant"))?;

        info!(tenant = dest.tenant_hash(), table = dest.table_name(), "Tenant provisioned");
        Ok(())
    }

    async fn insert_message(
        &self,
        dest: &TenantDestination,
        message: &StoredMessage,
    ) -> Result<(), DatabaseError> {
        let table = dest.table_name();
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO {table} (message, analytics_bucket, created_at) VALUES (?1, ?2, ?3)"
                ),
                params![
                    message.message.as_str(),
                    message.bucket_label.as_str(),
                    message.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| map_write_error(e, dest, "insert_message"))?;

        debug!(table, bucket = %message.bucket_label, "Message inserted into DB");
        Ok(())
    }

    async fn list_messages(
        &self,
        dest: &TenantDestination,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError> {
        let table = dest.table_name();
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT message, analytics_bucket, created_at FROM {table} ORDER BY id DESC LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| map_write_error(e, dest, "list_messages"))?;

        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_messages: {e}")))?
        {
            let msg = row_to_message(&row)
                .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
            messages.push(msg);
        }
        Ok(messages)
    }
}
