pub mod access;
pub mod config;
pub mod custom_token;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod permissions;
pub mod security_middleware;
pub mod services;

pub use config::Config;
pub use errors::{GatewayError, Result};
