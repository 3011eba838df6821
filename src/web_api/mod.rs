//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request validation
//! - Response formatting
//!
//! Streaming responses live here too: `/stream/{id}` turns the relay's part
//! stream into an `axum` body.

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(_state): State<AppState>) -> impl IntoResponse {
    "OK"
}
