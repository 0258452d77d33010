//! Tunable dispatch weights and thresholds.
//!
//! Values live in the store as key/value/bounds rows, are validated here at
//! the boundary, and are handed to the scorer as an immutable snapshot.
//! The scorer never re-checks bounds.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::BrigadeError;

/// Average speed used for the candidate query's travel-time estimate,
/// 50 km/h in m/s. A deliberately crude placeholder: the road-network
/// estimate comes from the route planner after selection.
pub const AVERAGE_SPEED_M_PER_S: f64 = 50.0 / 3.6;

/// One refreshable configuration row: key, current value, declared bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: f64,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

/// Immutable snapshot of the scoring weights and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub weight_travel_time: f64,
    pub weight_coverage_penalty: f64,
    pub weight_capability_match: f64,
    pub weight_preemption_delta: f64,
    pub weight_reassignment_cost: f64,
    pub min_reserve_per_base: i32,
    pub preemption_severity_threshold: i32,
    pub max_candidates_per_dispatch: i32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            weight_travel_time: 1.0,
            weight_coverage_penalty: 0.3,
            weight_capability_match: -50.0,
            weight_preemption_delta: -100.0,
            weight_reassignment_cost: 60.0,
            min_reserve_per_base: 1,
            preemption_severity_threshold: 2,
            max_candidates_per_dispatch: 10,
        }
    }
}

impl DispatchConfig {
    /// Build a snapshot from store rows, starting from defaults so a
    /// partial row set stays usable. Rejects out-of-bounds and non-finite
    /// values; unknown keys are ignored with a log line.
    pub fn from_entries(entries: &[ConfigEntry]) -> Result<Self, BrigadeError> {
        let mut config = Self::default();

        for entry in entries {
            validate_entry(entry)?;
            match entry.key.as_str() {
                "weight_travel_time" => config.weight_travel_time = entry.value,
                "weight_coverage_penalty" => config.weight_coverage_penalty = entry.value,
                "weight_capability_match" => config.weight_capability_match = entry.value,
                "weight_preemption_delta" => config.weight_preemption_delta = entry.value,
                "weight_reassignment_cost" => config.weight_reassignment_cost = entry.value,
                "min_reserve_per_base" => config.min_reserve_per_base = entry.value as i32,
                "preemption_severity_threshold" => {
                    config.preemption_severity_threshold = entry.value as i32
                }
                "max_candidates_per_dispatch" => {
                    config.max_candidates_per_dispatch = entry.value as i32
                }
                other => {
                    info!(key = other, "Ignoring unknown dispatch config key");
                }
            }
        }

        Ok(config)
    }
}

fn validate_entry(entry: &ConfigEntry) -> Result<(), BrigadeError> {
    if !entry.value.is_finite() {
        return Err(BrigadeError::Validation(format!(
            "config {} is not a finite number",
            entry.key
        )));
    }
    if let Some(min) = entry.min_value {
        if entry.value < min {
            return Err(BrigadeError::Validation(format!(
                "config {} = {} below minimum {min}",
                entry.key, entry.value
            )));
        }
    }
    if let Some(max) = entry.max_value {
        if entry.value > max {
            return Err(BrigadeError::Validation(format!(
                "config {} = {} above maximum {max}",
                entry.key, entry.value
            )));
        }
    }
    Ok(())
}

/// Where config rows come from. Implemented by the store; tests use an
/// in-memory vec.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn config_entries(&self) -> Result<Vec<ConfigEntry>, BrigadeError>;
}

/// Hot-swappable handle around the current `DispatchConfig`. Reads are
/// lock-free; a reload swaps in a whole new snapshot so a dispatch in
/// flight keeps the weights it started with.
pub struct ConfigHandle {
    inner: ArcSwap<DispatchConfig>,
}

impl ConfigHandle {
    pub fn new(initial: DispatchConfig) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(initial)),
        }
    }

    /// Load the initial snapshot from a source, falling back to defaults
    /// when the source has no rows yet.
    pub async fn load(source: &dyn ConfigSource) -> Result<Self, BrigadeError> {
        let entries = source.config_entries().await?;
        let config = DispatchConfig::from_entries(&entries)?;
        Ok(Self::new(config))
    }

    pub fn current(&self) -> Arc<DispatchConfig> {
        self.inner.load_full()
    }

    pub fn replace(&self, config: DispatchConfig) {
        self.inner.store(Arc::new(config));
    }

    /// Re-read entries from the source and swap the snapshot. A failed
    /// reload keeps the previous snapshot.
    pub async fn reload(&self, source: &dyn ConfigSource) {
        match source.config_entries().await {
            Ok(entries) => match DispatchConfig::from_entries(&entries) {
                Ok(config) => {
                    self.inner.store(Arc::new(config));
                    info!("Dispatch config reloaded");
                }
                Err(e) => {
                    error!(error = %e, "Rejected dispatch config reload, keeping current snapshot");
                }
            },
            Err(e) => {
                error!(error = %e, "Failed to read dispatch config, keeping current snapshot");
            }
        }
    }

    /// Spawn a background loop that refreshes the snapshot on a timer.
    pub fn spawn_reload_loop(
        self: &Arc<Self>,
        source: Arc<dyn ConfigSource>,
        interval: std::time::Duration,
    ) {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                handle.reload(source.as_ref()).await;
            }
        });

        info!(interval_secs = interval.as_secs(), "Dispatch config reload loop started");
    }
}
