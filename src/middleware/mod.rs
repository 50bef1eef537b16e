/// Middleware module
///
/// Custom middleware for authentication and file-server metrics.

mod jwt_middleware;
mod metrics;

pub use jwt_middleware::AuthenticationGate;
pub use metrics::HitCounter;
