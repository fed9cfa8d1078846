//! Live bond transaction feed client.
//!
//! Wires the components together:
//! - TOML configuration with CLI / environment overrides
//! - WebSocket connector and reducer-backed live view
//! - REST client for bond listings and market statistics

pub mod api;
pub mod app;
pub mod config;
pub mod error;

pub use api::{ApiClient, ApiError, ApiResult};
pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
