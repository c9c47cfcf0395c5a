//! # API Shared
//!
//! Wire types shared by the core services, the REST API and the CLI.
//!
//! Contains:
//! - JSON request/response shapes (`dto` module), with OpenAPI schemas
//! - `HealthService`
//!
//! Field names are camelCase on the wire to match what the mobile client reads.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
