//! The immutable service registry.
//!
//! A [`ServiceRegistry`] is built once at startup through
//! [`RegistryBuilder`] and passed by reference to every component. All
//! iteration happens in definition order; that order is part of the
//! registry's contract and is what makes a full run reproducible.

use crate::{
    AppService, ConfigArtifact, DependencyService, RegistryError, Result, SelectionFilter,
    ServiceDecl,
};
use indexmap::IndexMap;

/// Builder collecting declarations before validation
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    apps: Vec<AppService>,
    dependencies: Vec<DependencyService>,
    artifacts: Vec<ConfigArtifact>,
}

impl RegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an application service declaration
    pub fn app(mut self, app: AppService) -> Self {
        self.apps.push(app);
        self
    }

    /// Add a dependency service declaration
    pub fn dependency(mut self, dep: DependencyService) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// Add a config artifact binding
    pub fn artifact(mut self, artifact: ConfigArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Validate the collected declarations and build the registry.
    ///
    /// Structural problems (duplicate names, empty port lists, artifact
    /// bindings targeting unknown services) fail the whole build; they are
    /// never deferred to deploy time.
    pub fn build(self) -> Result<ServiceRegistry> {
        let mut apps = IndexMap::new();
        for app in self.apps {
            if app.ports.is_empty() {
                return Err(RegistryError::EmptyPorts(app.name));
            }
            let name = app.name.clone();
            if apps.insert(name.clone(), app).is_some() {
                return Err(RegistryError::DuplicateName {
                    kind: "application",
                    name,
                });
            }
        }

        let mut dependencies = IndexMap::new();
        for dep in self.dependencies {
            let name = dep.name.clone();
            if dependencies.insert(name.clone(), dep).is_some() {
                return Err(RegistryError::DuplicateName {
                    kind: "dependency",
                    name,
                });
            }
        }

        let mut artifacts = IndexMap::new();
        for artifact in self.artifacts {
            if !apps.contains_key(&artifact.target)
                && !dependencies.contains_key(&artifact.target)
            {
                return Err(RegistryError::DanglingTarget {
                    artifact: artifact.name,
                    target: artifact.target,
                });
            }
            let name = artifact.name.clone();
            if artifacts.insert(name.clone(), artifact).is_some() {
                return Err(RegistryError::DuplicateName {
                    kind: "config artifact",
                    name,
                });
            }
        }

        Ok(ServiceRegistry {
            apps,
            dependencies,
            artifacts,
        })
    }
}

/// Immutable catalog of every service the deployer knows about
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    apps: IndexMap<String, AppService>,
    dependencies: IndexMap<String, DependencyService>,
    artifacts: IndexMap<String, ConfigArtifact>,
}

impl ServiceRegistry {
    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Application services in definition order
    pub fn apps(&self) -> impl Iterator<Item = &AppService> {
        self.apps.values()
    }

    /// Dependency services in definition order
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyService> {
        self.dependencies.values()
    }

    /// Config artifact bindings in definition order
    pub fn artifacts(&self) -> impl Iterator<Item = &ConfigArtifact> {
        self.artifacts.values()
    }

    /// Look up a service of either kind by name
    pub fn service(&self, name: &str) -> Option<ServiceDecl<'_>> {
        self.apps
            .get(name)
            .map(ServiceDecl::App)
            .or_else(|| self.dependencies.get(name).map(ServiceDecl::Dependency))
    }

    /// Config artifacts bound to the given service, in definition order
    pub fn artifacts_for(&self, service: &str) -> Vec<&ConfigArtifact> {
        self.artifacts
            .values()
            .filter(|a| a.target == service)
            .collect()
    }

    /// Namespaces referenced by services passing the filter, deduplicated,
    /// in first-reference order
    pub fn namespaces(&self, filter: &SelectionFilter) -> Vec<String> {
        let mut seen = Vec::new();
        let all = self
            .dependencies
            .values()
            .map(|d| (&d.name, &d.namespace))
            .chain(self.apps.values().map(|a| (&a.name, &a.namespace)));
        for (name, namespace) in all {
            if filter.matches(name) && !seen.contains(namespace) {
                seen.push(namespace.clone());
            }
        }
        seen
    }
}
