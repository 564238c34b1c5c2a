use std::time::Duration;

use tracing_subscriber::EnvFilter;

use packgo_station::config::StationConfig;
use packgo_station::station::Station;

#[tokio::main]
async fn main() {
    // Structured logging on stderr; stdout belongs to the operator UI.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = StationConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        operator = %config.operator_id,
        store = %config.store_id,
        "starting packgo station"
    );

    let mut station = Station::new(config);

    tokio::select! {
        result = station.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "station input loop failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }

    // Fire the best-effort lease release and give the detached task a
    // moment to get the request out before the process exits.
    station.teardown();
    tokio::time::sleep(Duration::from_millis(250)).await;
}
