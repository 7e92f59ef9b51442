//! Axum HTTP API server.
//!
//! This crate provides:
//! - Account registration and JWT login
//! - The video processing endpoint and in-process pipeline
//! - Minutes-used billing on completed renders
//! - The timed output cleanup service
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{CleanupService, JobRegistry};
pub use state::AppState;
