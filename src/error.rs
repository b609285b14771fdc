//! Error types for inbox-buckets.
//!
//! Every error knows the status code it reports in the response envelope.
//! Anything without a more specific code reports 500.

use std::time::Duration;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Tenant error: {0}")]
    Tenant(#[from] TenantError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl Error {
    /// Status code carried by the underlying failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Database(e) => e.status_code(),
            Self::Classifier(e) => e.status_code(),
            Self::Tenant(e) => e.status_code(),
            Self::Pipeline(e) => e.status_code(),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Tenant storage errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Tenant table {table} does not exist")]
    TableMissing { table: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DatabaseError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Pool(_) => 503,
            Self::Query(_) => 500,
            Self::TableMissing { .. } => 404,
            Self::Constraint(_) => 409,
        }
    }
}

/// Errors talking to the assistant service.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Assistant service {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Assistant service {provider} returned {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Assistant service {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

impl ClassifierError {
    /// Upstream HTTP status when the service answered with one, else 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::Timeout { .. } => 504,
            Self::RequestFailed { .. } | Self::InvalidResponse { .. } => 500,
        }
    }
}

/// Tenant hash rejected before it reaches a storage name.
#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant hash is empty")]
    EmptyHash,

    #[error("Tenant hash {hash:?} is not allowed: {reason}")]
    InvalidHash { hash: String, reason: String },
}

impl TenantError {
    pub fn status_code(&self) -> u16 {
        400
    }
}

/// Request-level pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl PipelineError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidBody(_) => 400,
        }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
