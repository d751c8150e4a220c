//! Typed service declarations.
//!
//! Behavioural flags that the original deploy tooling derived from name
//! matching (stateful storage, elevated cluster access) are explicit
//! attributes here, set when the catalog is defined.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An application service built from a local build context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppService {
    /// Unique service name
    pub name: String,
    /// Path to the Docker build context (must contain a Dockerfile)
    pub build_context: PathBuf,
    /// Image name the build is tagged with
    pub image: String,
    /// Ordered, non-empty list of container ports
    pub ports: Vec<u16>,
    /// Namespace the service deploys into
    pub namespace: String,
    /// Whether the service receives the env table's global section
    #[serde(default)]
    pub global_env: bool,
}

/// A dependency service running a prebuilt image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyService {
    /// Unique service name
    pub name: String,
    /// Prebuilt image reference (pulled by the cluster)
    pub image: String,
    /// Container port the workload listens on
    pub container_port: u16,
    /// Port the in-cluster service exposes
    pub service_port: u16,
    /// Namespace the service deploys into
    pub namespace: String,
    /// Mount path for durable storage, when the service is stateful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateful: Option<PathBuf>,
    /// Whether the service needs watch/list access to cluster-scoped
    /// resources (emits a dedicated access-control object set)
    #[serde(default)]
    pub cluster_reader: bool,
    /// Whether the service receives the env table's global section
    #[serde(default)]
    pub global_env: bool,
}

/// A configuration artifact bound into a target service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigArtifact {
    /// Unique binding name (also the config-injection object name)
    pub name: String,
    /// Namespace the injection object is created in
    pub namespace: String,
    /// Source file on the operator's machine
    pub source: PathBuf,
    /// Directory the file is mounted at inside the container
    pub mount_path: PathBuf,
    /// Name of the service the artifact is mounted into
    pub target: String,
}

impl ConfigArtifact {
    /// Base name of the source file, used as the mount sub-path and
    /// as the key inside the config-injection object
    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Either kind of deployable service declaration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServiceDecl<'a> {
    /// An application service
    App(&'a AppService),
    /// A dependency service
    Dependency(&'a DependencyService),
}

impl ServiceDecl<'_> {
    /// The service name
    pub fn name(&self) -> &str {
        match self {
            ServiceDecl::App(app) => &app.name,
            ServiceDecl::Dependency(dep) => &dep.name,
        }
    }

    /// The namespace the service deploys into
    pub fn namespace(&self) -> &str {
        match self {
            ServiceDecl::App(app) => &app.namespace,
            ServiceDecl::Dependency(dep) => &dep.namespace,
        }
    }

    /// Whether the service consumes the env table's global section
    pub fn global_env(&self) -> bool {
        match self {
            ServiceDecl::App(app) => app.global_env,
            ServiceDecl::Dependency(dep) => dep.global_env,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_service_serialization() {
        let app = AppService {
            name: "operational-api".to_string(),
            build_context: PathBuf::from("services/operational-api"),
            image: "operational-api".to_string(),
            ports: vec![8080, 9090],
            namespace: "apps".to_string(),
            global_env: true,
        };

        let yaml = serde_yaml::to_string(&app).expect("Failed to serialize");
        let back: AppService = serde_yaml::from_str(&yaml).expect("Failed to deserialize");
        assert_eq!(app, back);
    }

    #[test]
    fn test_artifact_file_name() {
        let artifact = ConfigArtifact {
            name: "prometheus-config".to_string(),
            namespace: "monitoring".to_string(),
            source: PathBuf::from("deploy/config/prometheus.yml"),
            mount_path: PathBuf::from("/etc/prometheus"),
            target: "prometheus".to_string(),
        };
        assert_eq!(artifact.file_name(), "prometheus.yml");
    }

    #[test]
    fn test_decl_accessors() {
        let dep = DependencyService {
            name: "grafana".to_string(),
            image: "grafana/grafana:11.2.0".to_string(),
            container_port: 3000,
            service_port: 3000,
            namespace: "monitoring".to_string(),
            stateful: Some(PathBuf::from("/var/lib/grafana")),
            cluster_reader: false,
            global_env: false,
        };

        let decl = ServiceDecl::Dependency(&dep);
        assert_eq!(decl.name(), "grafana");
        assert_eq!(decl.namespace(), "monitoring");
        assert!(!decl.global_env());
    }
}
