use std::env;

use tracing::info;

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres/PostGIS
    pub database_url: String,

    // Routing provider
    pub routing_base_url: String,
    pub routing_timeout_secs: u64,

    // Dispatch loop
    pub dispatch_interval_secs: u64,
    pub config_reload_secs: u64,

    // Simulation
    pub sim_center_lat: f64,
    pub sim_center_lon: f64,
    pub sim_radius_km: f64,
    pub sim_tick_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            routing_base_url: required_env("ROUTING_BASE_URL"),
            routing_timeout_secs: parsed_env("ROUTING_TIMEOUT_SECS", 10),
            dispatch_interval_secs: parsed_env("DISPATCH_INTERVAL_SECS", 15),
            config_reload_secs: parsed_env("CONFIG_RELOAD_SECS", 60),
            sim_center_lat: parsed_env("SIM_CENTER_LAT", 47.218),
            sim_center_lon: parsed_env("SIM_CENTER_LON", -1.5536),
            sim_radius_km: parsed_env("SIM_RADIUS_KM", 15.0),
            sim_tick_secs: parsed_env("SIM_TICK_SECS", 2),
        }
    }

    /// Log the effective configuration without connection credentials.
    pub fn log_redacted(&self) {
        info!(
            routing_base_url = self.routing_base_url.as_str(),
            routing_timeout_secs = self.routing_timeout_secs,
            dispatch_interval_secs = self.dispatch_interval_secs,
            config_reload_secs = self.config_reload_secs,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number")),
        Err(_) => default,
    }
}
