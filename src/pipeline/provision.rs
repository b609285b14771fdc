//! Tenant provisioning behind `POST /create-user-tables`.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::Result;
use crate::pipeline::types::{ProvisionRequest, ResponseEnvelope};
use crate::store::TenantStore;
use crate::tenant;

/// Creates a tenant's message table on request.
pub struct TenantProvisioner {
    store: Arc<dyn TenantStore>,
}

impl TenantProvisioner {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, request: ProvisionRequest) -> ResponseEnvelope {
        match self.provision(request).await {
            Ok(()) => ResponseEnvelope::success(),
            Err(e) => {
                error!(error = %e, code = e.status_code(), "Provisioning failed");
                ResponseEnvelope::from_error(&e)
            }
        }
    }

    /// Provision the tenant named by `hash`. A missing hash is a no-op.
    pub async fn provision(&self, request: ProvisionRequest) -> Result<()> {
        let Some(hash) = request.hash.filter(|h| !h.is_empty()) else {
            debug!("No tenant hash supplied; nothing to provision");
            return Ok(());
        };
        let dest = tenant::resolve(&hash)?;
        self.store.provision_tenant(&dest).await?;
        Ok(())
    }
}
