//! inbox-buckets: classifies tenant messages into analytics buckets and
//! stores them per tenant.

pub mod classifier;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod store;
pub mod tenant;
