use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use brigade_common::{Config, ConfigHandle, ConfigSource, GeoPoint};
use brigade_dispatch::{
    spawn_dispatch_loop, spawn_route_repair_loop, CandidateSource, DispatchBackend, Dispatcher,
    IncidentFeed, PlannerRouteService, RouteService, StoreFeed, TelemetryIngestor,
};
use brigade_routing::{
    HttpRoutingProvider, ProgressTracker, RouteCache, RoutePlanner, RouteStore, RoutingProvider,
};
use brigade_sim::{IncidentGenerator, SimEngine};
use brigade_store::Store;

#[derive(Parser, Debug)]
#[command(about = "Run a dispatch training exercise against the live stack")]
struct Args {
    /// Seconds between simulated incidents.
    #[arg(long, default_value_t = 45)]
    incident_interval_secs: u64,

    /// On-site dwell before a simulated crew is released.
    #[arg(long, default_value_t = 90)]
    dwell_secs: u64,

    /// Pause incident generation above this many open interventions.
    #[arg(long, default_value_t = 8)]
    max_open_interventions: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("brigade=info".parse()?))
        .init();

    let args = Args::parse();
    info!("Brigade simulation starting...");

    let config = Config::from_env();
    config.log_redacted();

    let store = Store::connect(&config.database_url).await?;

    // Dispatch weights: initial snapshot plus background refresh.
    let config_handle = Arc::new(ConfigHandle::load(&store).await?);
    let config_source: Arc<dyn ConfigSource> = Arc::new(store.clone());
    config_handle.spawn_reload_loop(
        config_source,
        Duration::from_secs(config.config_reload_secs),
    );

    // Routing stack: HTTP provider behind the shared LRU cache.
    let provider: Arc<dyn RoutingProvider> = Arc::new(HttpRoutingProvider::new(
        &config.routing_base_url,
        Duration::from_secs(config.routing_timeout_secs),
    ));
    let planner = Arc::new(RoutePlanner::new(provider, Arc::new(RouteCache::default())));
    let route_store: Arc<dyn RouteStore> = Arc::new(store.clone());
    let tracker = Arc::new(ProgressTracker::new(route_store));
    let route_service = Arc::new(PlannerRouteService::new(planner, tracker.clone()));
    let routes: Arc<dyn RouteService> = route_service.clone();
    let _repair_loop = spawn_route_repair_loop(
        store.clone(),
        route_service,
        Duration::from_secs(config.dispatch_interval_secs),
    );

    // Dispatcher and its periodic trigger.
    let candidates: Arc<dyn CandidateSource> = Arc::new(store.clone());
    let backend: Arc<dyn DispatchBackend> = Arc::new(store.clone());
    let dispatcher = Arc::new(Dispatcher::new(
        candidates,
        backend.clone(),
        routes.clone(),
        config_handle.clone(),
    ));
    let feed: Arc<dyn IncidentFeed> = Arc::new(StoreFeed::new(backend.clone()));
    let _dispatch_loop = spawn_dispatch_loop(
        feed,
        dispatcher,
        Duration::from_secs(config.dispatch_interval_secs),
    );

    // Telemetry path shared with live operations.
    let ingestor = TelemetryIngestor::new(backend, routes, tracker);
    let engine = SimEngine::new(
        store.clone(),
        ingestor,
        Duration::from_secs(config.sim_tick_secs),
        Duration::from_secs(args.dwell_secs),
    );

    spawn_incident_loop(
        store.clone(),
        IncidentGenerator::new(
            GeoPoint::new(config.sim_center_lat, config.sim_center_lon),
            config.sim_radius_km,
        ),
        Duration::from_secs(args.incident_interval_secs),
        args.max_open_interventions,
    );

    // Vehicle advancement runs in the foreground.
    let mut ticker = tokio::time::interval(Duration::from_secs(config.sim_tick_secs));
    loop {
        ticker.tick().await;
        if let Err(e) = engine.tick().await {
            warn!(error = %e, "Simulation tick failed");
        }
    }
}

fn spawn_incident_loop(
    store: Store,
    generator: IncidentGenerator,
    interval: Duration,
    max_open: usize,
) {
    info!(
        interval_secs = interval.as_secs(),
        max_open, "Incident generation loop started"
    );

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let open = match store.pending_interventions().await {
                Ok(pending) => pending.len(),
                Err(e) => {
                    warn!(error = %e, "Failed to count open interventions");
                    continue;
                }
            };
            if open >= max_open {
                continue;
            }

            if let Err(e) = generator.spawn_incident(&store).await {
                warn!(error = %e, "Failed to create simulated incident");
            }
        }
    });
}
