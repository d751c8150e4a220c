//! # Deploy Manifest
//!
//! Deterministic synthesis of cluster objects from service declarations.
//!
//! The synthesizer is a pure function: a declaration, its resolved
//! environment and the artifact bindings targeting it always produce the
//! same [`ManifestSet`], and rendering that set twice yields byte-identical
//! YAML. Mounts, volumes, ports and env are built as structured lists and
//! serialized exactly once; no rendered text is ever spliced.

#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod objects;
mod ports;
mod synthesizer;

pub use ports::PortNamingTable;
pub use synthesizer::{ManifestDocument, ManifestSet, Synthesizer};

/// Error types for manifest synthesis
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    /// A multi-port service has more ports than the naming table can name.
    /// Emitting an unnamed port in a multi-port workload would be rejected
    /// by the cluster, so this fails synthesis instead.
    #[error(
        "Service '{service}' declares {count} ports but the naming table supports at most {capacity}"
    )]
    PortNamesExhausted {
        /// The offending service
        service: String,
        /// Declared port count
        count: usize,
        /// Names that were actually available to this service, counting
        /// its exception-named ports and the unclaimed positional names
        capacity: usize,
    },

    /// YAML rendering failed
    #[error("Failed to render manifest for '{service}': {source}")]
    Render {
        /// The service being rendered
        service: String,
        /// Underlying serializer error
        #[source]
        source: serde_yaml::Error,
    },
}

/// Result type for synthesis operations
pub type Result<T> = std::result::Result<T, SynthesisError>;
