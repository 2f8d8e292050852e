//! HTTP API for the coaching service.
//!
//! Serves the staged emotion coach to authenticated users and receives the
//! WeChat official-account callback. See [`routes::router`] for the endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::{ApiCoach, AppState};

/// Build the application with its state.
pub fn app(state: AppState) -> axum::Router {
    routes::router().with_state(state)
}
