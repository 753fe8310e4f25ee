use johto::election::{ElectorConfig, LeaderElector};
use johto::server::{run_health_server, wait_for_signal, ReadinessState};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Default port for health endpoints
const HEALTH_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting johto leader election coordinator");

    let config = ElectorConfig::from_env();
    let elector = LeaderElector::start(config).await?;
    info!(
        holder_id = %elector.identity(),
        lease_name = %elector.config().lease_name,
        "Elector started"
    );

    // Surface leadership transitions in the logs
    let mut events = elector.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(
                    topic = event.topic(),
                    lease_name = event.lease_name(),
                    "Leadership event"
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dropped leadership events")
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Create readiness state (initially not ready)
    let readiness = ReadinessState::new();

    // Start health server in background
    let health_readiness = readiness.clone();
    let health_state = elector.state();
    let health_metrics = elector.metrics();
    let health_handle = tokio::spawn(async move {
        if let Err(e) =
            run_health_server(HEALTH_PORT, health_readiness, health_state, health_metrics).await
        {
            warn!(error = %e, "Health server failed");
        }
    });
    info!(port = HEALTH_PORT, "Health server task spawned");

    // Mark as ready - the elector is running
    //
    // Note: readiness is not leadership. Followers report ready too, since
    // any of them may take over the lease at any time; /leaderz gates
    // singleton traffic.
    readiness.set_ready();

    // Run until a termination signal arrives
    let signal = wait_for_signal().await;
    info!(signal = signal, "Initiating graceful shutdown");
    // Mark not ready so K8s stops sending traffic during shutdown
    readiness.set_not_ready();

    // Release the lease before exiting so a peer can take over promptly
    elector.shutdown().await;
    health_handle.abort();

    info!("johto shut down gracefully");
    Ok(())
}
