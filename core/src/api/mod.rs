//! API Module
//!
//! HTTP API endpoints for the Murk node: the relay surface, signed
//! submissions, record lookups and the gated operator/dev endpoints.

pub mod handlers;
pub mod routes;
pub mod types;

pub use handlers::ApiState;
pub use routes::create_router;
