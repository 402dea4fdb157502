use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use parkline_core::repository::VehicleLifecycle;

/// Periodic IN -> OUT sweep. State mutation stays out of the read handlers;
/// this task (and the explicit sweep endpoint) are the only callers.
pub async fn start_sweep_worker(vehicles: Arc<dyn VehicleLifecycle>, interval_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(interval_seconds.max(1)));

    info!(interval_seconds, "Sweep worker started");

    loop {
        ticker.tick().await;

        match vehicles.sweep_due_vehicles().await {
            Ok(0) => {}
            Ok(moved) => info!(moved, "sweep pass complete"),
            Err(e) => error!("sweep pass failed: {}", e),
        }
    }
}
