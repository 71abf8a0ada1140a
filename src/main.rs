use clap::Parser;
use rate_gate::admission::Coordinator;
use rate_gate::config::Args;
use rate_gate::create_router;
use rate_gate::registry::{DispenserRegistry, sweeper};
use rate_gate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rate_gate=info,tower_http=info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let registry = Arc::new(DispenserRegistry::new(args.max_clients, args.idle_ttl()));
    let state = Arc::new(AppState::new(
        Coordinator::new(Arc::clone(&registry)),
        args.window(),
    ));

    // spawn the background sweeper
    tokio::spawn(sweeper(Arc::clone(&registry), args.sweep_interval()));

    let app = create_router(state);

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("rate-gate running on http://{}", addr);
    tracing::info!("One request per {:?} per client", args.window());
    tracing::info!(
        "Tracking at most {} clients, idle after {:?}",
        args.max_clients,
        args.idle_ttl()
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
