//! Periodic dispatch trigger.
//!
//! Where pending interventions come from is a capability: the live system
//! reads the store, the training simulator injects its own feed. The loop
//! itself does not care.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use brigade_common::{BrigadeError, InterventionBrief};

use crate::dispatcher::Dispatcher;
use crate::traits::DispatchBackend;

/// Source of interventions awaiting units.
#[async_trait]
pub trait IncidentFeed: Send + Sync {
    async fn pending(&self) -> Result<Vec<InterventionBrief>, BrigadeError>;
}

/// The live feed: pending interventions straight from the store.
pub struct StoreFeed {
    backend: Arc<dyn DispatchBackend>,
}

impl StoreFeed {
    pub fn new(backend: Arc<dyn DispatchBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl IncidentFeed for StoreFeed {
    async fn pending(&self) -> Result<Vec<InterventionBrief>, BrigadeError> {
        self.backend.pending_interventions().await
    }
}

/// Spawn the periodic dispatch loop: every `interval`, dispatch for each
/// pending intervention that still wants units.
pub fn spawn_dispatch_loop(
    feed: Arc<dyn IncidentFeed>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Dispatch trigger loop started");

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let briefs = match feed.pending().await {
                Ok(briefs) => briefs,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch pending interventions");
                    continue;
                }
            };

            if briefs.is_empty() {
                debug!("No pending interventions");
                continue;
            }

            let mut dispatched = 0usize;
            for brief in &briefs {
                let wanted = brief.units_wanted();
                if wanted == 0 {
                    continue;
                }
                match dispatcher.dispatch_n(brief, wanted).await {
                    Ok(outcome) => dispatched += outcome.assigned.len(),
                    Err(e) => {
                        warn!(
                            intervention_id = %brief.id,
                            error = %e,
                            "Dispatch failed for intervention"
                        );
                    }
                }
            }

            if dispatched > 0 {
                info!(units = dispatched, "Periodic dispatch pass complete");
            }
        }
    })
}
