//! # Deploy Orchestration
//!
//! Drives the end-to-end deployment sequence: namespace creation, config
//! artifact materialization, dependency rollout, application rollout and a
//! final status report. All cluster interaction goes through the
//! [`ClusterCapability`] trait so the sequencing logic can be tested
//! against a mock cluster.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod cluster;
mod orchestrator;

pub use cluster::{ClusterCapability, KubectlCluster, WaitOutcome};
pub use orchestrator::{DeployOptions, Orchestrator, RunSummary, ServiceFailure};

/// Error types for orchestration operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] deploy_registry::RegistryError),

    /// Environment-table errors
    #[error("Environment table error: {0}")]
    Config(#[from] deploy_config::ConfigError),

    /// Manifest synthesis errors
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] deploy_manifest::SynthesisError),

    /// A required external tool is not usable
    #[error("Required tool '{0}' is not available on PATH")]
    ToolMissing(String),

    /// The cluster the operator is pointed at is not the expected one
    #[error("Cluster context is '{actual}' but '{expected}' was expected; pass --assume-yes to proceed anyway")]
    ContextMismatch {
        /// Context the run was configured for
        expected: String,
        /// Context kubectl currently points at
        actual: String,
    },

    /// An external command exited unsuccessfully
    #[error("Command '{command}' failed: {detail}")]
    CommandFailed {
        /// The command line that ran
        command: String,
        /// Captured stderr (or a spawn error)
        detail: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;
