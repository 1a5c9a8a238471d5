// crates/correlator-http/src/middleware/mod.rs

pub mod auth;
pub mod correlation;
pub mod logging;
pub mod panic_recovery;
pub mod rate_limit;

pub use auth::authenticate;
pub use correlation::correlation_id;
pub use correlation::CorrelationId;
pub use logging::request_logging;
pub use panic_recovery::panic_recovery;
pub use rate_limit::rate_limit;
