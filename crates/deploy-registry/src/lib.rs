//! # Deploy Registry
//!
//! Static service catalog for the stack deployer.
//!
//! This crate defines the three declaration kinds the deployer understands
//! (application services built from a local context, dependency services
//! running prebuilt images, and config artifact bindings), the immutable
//! [`ServiceRegistry`] that holds them, and the [`SelectionFilter`] used to
//! gate which services participate in a run.

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod filter;
mod model;
mod registry;

pub use filter::SelectionFilter;
pub use model::{AppService, ConfigArtifact, DependencyService, ServiceDecl};
pub use registry::{RegistryBuilder, ServiceRegistry};

/// Error types for registry construction and selection
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    /// Two declarations of the same kind share a name
    #[error("Duplicate {kind} declaration: '{name}'")]
    DuplicateName {
        /// Declaration kind ("application", "dependency" or "config artifact")
        kind: &'static str,
        /// The colliding name
        name: String,
    },

    /// An application service declared no container ports
    #[error("Application service '{0}' declares no container ports")]
    EmptyPorts(String),

    /// A config artifact targets a service that is not in the registry
    #[error("Config artifact '{artifact}' targets unknown service '{target}'")]
    DanglingTarget {
        /// The artifact binding name
        artifact: String,
        /// The missing target service
        target: String,
    },

    /// Both an include list and an exclude list were given
    #[error("Selection filter cannot combine an include list and an exclude list")]
    ConflictingSelectors,
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
