//! Request pipelines behind the two endpoints.
//!
//! `send-message` flows through:
//! 1. Presence check on `message` / `tenantHash`
//! 2. `tenant::resolve()`: hash to table name
//! 3. `ClassificationClient::classify()`: assistant run + poll
//! 4. `TenantStore::insert_message()`: only when a label was produced
//!
//! `create-user-tables` resolves the hash and provisions the tenant table.

pub mod processor;
pub mod provision;
pub mod types;

pub use processor::MessagePipeline;
pub use provision::TenantProvisioner;
pub use types::{ClassificationOutcome, InboundRequest, ProvisionRequest, ResponseEnvelope};
