use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::database::Database;
use crate::ServiceState;

/// One dependency the daemon cannot serve without
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self) -> Result<(), ProbeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0} is unavailable")]
    Unavailable(&'static str),
}

/// The record store answers a trivial query
struct RecordStoreProbe {
    db: Database,
}

#[async_trait]
impl Probe for RecordStoreProbe {
    fn name(&self) -> &'static str {
        "record_store"
    }

    async fn check(&self) -> Result<(), ProbeError> {
        self.db.ping().await.map_err(|e| {
            tracing::warn!(error = %e, "record store readiness check failed");
            ProbeError::Unavailable(self.name())
        })
    }
}

/// Every probe readiness depends on, extracted per request
pub struct Probes(Vec<Arc<dyn Probe>>);

impl std::fmt::Debug for Probes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|probe| probe.name()))
            .finish()
    }
}

impl Probes {
    #[cfg(test)]
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Self {
        Self(probes)
    }

    /// Stops at the first failing probe
    pub async fn check_all(&self) -> Result<(), ProbeError> {
        for probe in &self.0 {
            probe.check().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for Probes {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Probes(vec![Arc::new(RecordStoreProbe {
            db: state.database().clone(),
        })]))
    }
}
