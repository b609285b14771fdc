//! Message pipeline — classifies an inbound message and stores it in the
//! tenant's table.
//!
//! Flow:
//! 1. Presence check (missing fields short-circuit to success)
//! 2. Tenant resolution
//! 3. Classification (failed or timed-out runs are swallowed)
//! 4. Single-row insert

use std::sync::Arc;

use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::classifier::{ClassificationClient, RunState};
use crate::error::Result;
use crate::pipeline::types::{ClassificationOutcome, InboundRequest, ResponseEnvelope};
use crate::store::{StoredMessage, TenantStore};
use crate::tenant;

/// Orchestrates one send-message request.
pub struct MessagePipeline {
    classifier: ClassificationClient,
    store: Arc<dyn TenantStore>,
}

impl MessagePipeline {
    pub fn new(classifier: ClassificationClient, store: Arc<dyn TenantStore>) -> Self {
        Self { classifier, store }
    }

    /// Run the pipeline and map the result onto the response envelope.
    pub async fn handle(&self, request: InboundRequest) -> ResponseEnvelope {
        let span = info_span!("send_message", request_id = %Uuid::new_v4());
        async {
            match self.process(request).await {
                Ok(outcome) => {
                    info!(outcome = outcome.label(), "Request complete");
                    ResponseEnvelope::success().with_outcome(outcome)
                }
                Err(e) => {
                    error!(error = %e, code = e.status_code(), "Request failed");
                    ResponseEnvelope::from_error(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline, returning what happened.
    ///
    /// Only storage failures and upstream errors are `Err`. Missing fields and
    /// runs that never complete are reported as skipped outcomes.
    pub async fn process(&self, request: InboundRequest) -> Result<ClassificationOutcome> {
        let Some(request) = request.validate() else {
            debug!("Missing message or tenant hash; nothing to do");
            return Ok(ClassificationOutcome::SkippedInvalidRequest);
        };

        let dest = tenant::resolve(&request.tenant_hash)?;
        info!(tenant = dest.tenant_hash(), "Classifying inbound message");

        let classification = self.classifier.classify(&request.message).await?;

        let Some(bucket) = classification.label else {
            return Ok(match classification.run.status {
                RunState::TimedOut => ClassificationOutcome::SkippedTimedOut,
                _ => ClassificationOutcome::SkippedNoLabel,
            });
        };

        let row = StoredMessage::new(request.message, bucket.as_str());
        self.store.insert_message(&dest, &row).await?;

        info!(
            tenant = dest.tenant_hash(),
            bucket = %bucket,
            "Classified message stored"
        );
        Ok(ClassificationOutcome::Stored { bucket })
    }
}
