//! # Actix Middleware Library
//!
//! Shared middleware and extractors for Nova Pulse actix services
//!
//! ## Modules
//! - `correlation_id`: `x-correlation-id` propagation
//! - `logging`: structured request/response logging
//! - `jwt_auth`: bearer-credential extractor backed by the `RevocationGuard`
//! - `metrics`: Prometheus request metrics

pub mod correlation_id;
pub mod jwt_auth;
pub mod logging;
pub mod metrics;

pub use correlation_id::{CorrelationId, CorrelationIdMiddleware};
pub use jwt_auth::{bearer_token, AuthenticatedUser};
pub use logging::Logging;
pub use metrics::MetricsMiddleware;
