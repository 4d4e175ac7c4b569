//! API Routes
//!
//! Router configuration for the HTTP API.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{self, ApiState};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    let mut router = Router::new()
        // Health & Status
        .route("/health", get(handlers::health))
        .route("/pool/stats", get(handlers::pool_stats))
        // Relay surface
        .route("/claim", post(handlers::relay_claim))
        .route("/private-claim", post(handlers::relay_private_claim))
        .route("/relayer-status", get(handlers::relayer_status))
        // Signed submissions
        .route("/deposit", post(handlers::submit_deposit))
        .route("/request", post(handlers::submit_request))
        // Record lookups
        .route("/pending/{recipient}", get(handlers::get_pending))
        .route("/commitment/{commitment}", get(handlers::get_commitment))
        .route("/nullifier/{nullifier}", get(handlers::get_nullifier))
        .route("/balance/{account}", get(handlers::get_balance));

    if state.operator_api {
        router = router
            .route("/operator/batch-claim", post(handlers::batch_claim))
            .route("/operator/churn-vault", post(handlers::init_churn_vault))
            .route("/operator/churn", post(handlers::churn))
            .route("/operator/unchurn", post(handlers::unchurn));
    }

    if state.dev_mode {
        router = router.route("/dev/airdrop", post(handlers::dev_airdrop));
    }

    router
        .layer(TraceLayer::new_for_http())
        // CORS
        .layer(CorsLayer::permissive())
        .with_state(state)
}
