pub mod auth;

pub use auth::{AuthRequirement, BearerAuth};
