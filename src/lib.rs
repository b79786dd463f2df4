//! # Gateway Console
//!
//! Operator console for a multi-instance messaging gateway. Regular users
//! manage the single instance bound to their token; administrators list,
//! create, open and delete instances. Session state survives restarts in
//! an expiring local store and the screen is kept current by polling.

pub mod actions;
pub mod clock;
pub mod config;
pub mod controller;
pub mod envelope;
pub mod error;
pub mod gateway_client;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod render;
pub mod store;
pub mod tui_dashboard;

// Re-exports for convenience
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use controller::{RoleIndicator, ViewState, ViewStateController};
pub use error::{ConsoleError, ConsoleResult};
pub use gateway_client::{GatewayApi, GatewayClient};
pub use metrics::MetricsCollector;
pub use store::{ExpiringStore, StoreKey};

/// Gateway Console version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gateway Console build information
pub const BUILD_INFO: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " v",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_DESCRIPTION"),
    ")"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.starts_with("1."));
    }

    #[test]
    fn test_build_info() {
        assert!(BUILD_INFO.contains("gateway-console"));
        assert!(BUILD_INFO.contains(VERSION));
    }
}
