//! `TenantStore` trait — async interface for tenant-scoped persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::tenant::TenantDestination;

/// A classified message as written to a tenant table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub message: String,
    /// Written to the `analytics_bucket` column.
    pub bucket_label: String,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Build a row stamped with the current time.
    ///
    /// Call right before the insert: `created_at` is the write time, not the
    /// time the request arrived.
    pub fn new(message: impl Into<String>, bucket_label: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            bucket_label: bucket_label.into(),
            created_at: Utc::now(),
        }
    }
}

/// Backend-agnostic store for per-tenant message tables.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Run all pending schema migrations for shared tables.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Create the tenant's message table. Safe to call repeatedly.
    async fn provision_tenant(&self, dest: &TenantDestination) -> Result<(), DatabaseError>;

    /// Insert one message row. No upsert and no dedup.
    ///
    /// Fails with `DatabaseError::TableMissing` when the tenant was never
    /// provisioned.
    async fn insert_message(
        &self,
        dest: &TenantDestination,
        message: &StoredMessage,
    ) -> Result<(), DatabaseError>;

    /// Most recent messages first, up to `limit`.
    async fn list_messages(
        &self,
        dest: &TenantDestination,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError>;
}
