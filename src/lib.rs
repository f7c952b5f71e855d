// Flightcheck - Library module
// Hook discovery, concurrent execution, and result aggregation for release cycles

pub mod bus;
pub mod cli;
pub mod config;
pub mod core;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod orchestrator;
pub mod runner;

// Re-export main types for easier access
pub use bus::{BusMessage, BusTransport, ChannelBusTransport, TcpBusTransport};
pub use config::Config;
pub use core::{
    aggregate, AggregateReport, CycleRef, Issue, Job, PartialResult, Phase, ProjectRef, ReleaseRef,
};
pub use discovery::{discover, resolve, DiscoveredHook, HookRegistry};
pub use error::{
    exit_codes, ConfigError, ConnectionError, DiscoveryError, FlightcheckError,
    HookExecutionError, Result,
};
pub use hooks::{Hook, HookFactory};
pub use logging::{ColorConfig, LogConfig, LogFormat};
pub use orchestrator::{Orchestrator, OrchestratorSettings, OrchestratorState};
pub use runner::HookRunner;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// Build information (set by build script)
pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const GIT_CHANGELOG: &str = env!("GIT_CHANGELOG");
pub const RUST_VERSION: &str = env!("RUST_VERSION");

/// Get formatted version string with build information
pub fn version_info() -> String {
    format!("{NAME} {VERSION} (commit: {GIT_COMMIT}, built: {BUILD_DATE}, rustc: {RUST_VERSION})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_semver() {
        assert!(semver::Version::parse(VERSION).is_ok());
    }

    #[test]
    fn test_name_constant() {
        assert_eq!(NAME, "flightcheck");
    }

    #[test]
    fn test_version_info_mentions_commit() {
        assert!(version_info().contains("commit:"));
    }
}
