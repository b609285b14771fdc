//! Tenant resolver: maps a tenant hash to its storage destination.
//!
//! The hash ends up inside a table name, so it is checked against a strict
//! allow-list before any name is formed. SQLite compares identifiers without
//! regard to case, so only lowercase letters are accepted: `ABC` and `abc`
//! would otherwise share one table.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TenantError;

/// Prefix of every tenant message table.
pub const TABLE_PREFIX: &str = "messages_";

/// Longest accepted hash. Keeps `messages_<hash>` within a 63-byte identifier.
pub const MAX_HASH_LEN: usize = 54;

static HASH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+$").expect("static regex"));

/// Storage location for one tenant's messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantDestination {
    tenant_hash: String,
    table: String,
}

impl TenantDestination {
    pub fn tenant_hash(&self) -> &str {
        &self.tenant_hash
    }

    /// Table name, safe to interpolate into SQL.
    pub fn table_name(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for TenantDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table)
    }
}

/// Resolve a tenant hash to its destination.
///
/// Pure and deterministic: the same hash always yields the same table.
pub fn resolve(tenant_hash: &str) -> Result<TenantDestination, TenantError> {
    if tenant_hash.is_empty() {
        return Err(TenantError::EmptyHash);
    }
    if tenant_hash.len() > MAX_HASH_LEN {
        return Err(TenantError::InvalidHash {
            hash: tenant_hash.chars().take(MAX_HASH_LEN).collect(),
            reason: format!("longer than {MAX_HASH_LEN} characters"),
        });
    }
    if !HASH_PATTERN.is_match(tenant_hash) {
        return Err(TenantError::InvalidHash {
            hash: tenant_hash.to_string(),
            reason: "only lowercase ASCII letters and digits are allowed".into(),
        });
    }

    Ok(TenantDestination {
        tenant_hash: tenant_hash.to_string(),
        table: format!("{TABLE_PREFIX}{tenant_hash}"),
    })
}
