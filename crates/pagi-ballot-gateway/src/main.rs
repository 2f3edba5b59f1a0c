//! PAGI Ballot Gateway: mock auth backend at 127.0.0.1:8000.

use pagi_ballot_gateway::{AppState, VoterRegistry, DEMO_EPIC_ID, DEMO_OTP};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[pagi-ballot-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PAGI_BALLOT_GATEWAY_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into());
    let otp = std::env::var("PAGI_BALLOT_DEMO_OTP").unwrap_or_else(|_| DEMO_OTP.into());

    let state = Arc::new(AppState {
        registry: VoterRegistry::seeded(otp),
    });

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("[GATEWAY] Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "[GATEWAY] Listening on {} (demo voter {}, {} registered)",
        addr,
        DEMO_EPIC_ID,
        state.registry.voter_count()
    );

    if let Err(e) = pagi_ballot_gateway::serve(listener, state).await {
        tracing::error!("[GATEWAY] Server stopped: {}", e);
        std::process::exit(1);
    }
}
