//! The four-phase deployment sequence.
//!
//! Phases run strictly one service at a time, in registry definition
//! order. Structural problems abort before anything touches the cluster;
//! once the phases are running, one broken service never blocks the rest.

use crate::{ClusterCapability, Error, Result, WaitOutcome};
use deploy_config::{EnvTable, resolve_env};
use deploy_manifest::{ManifestSet, Synthesizer};
use deploy_registry::{SelectionFilter, ServiceDecl, ServiceRegistry};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Options for a single deployment run
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Path to the environment-table file
    pub env_file: PathBuf,
    /// Scratch directory rendered manifests are written to
    pub out_dir: PathBuf,
    /// Cluster context the run expects to be pointed at
    pub expected_context: String,
    /// Skip the context confirmation check
    pub assume_yes: bool,
    /// Synthesize and write manifests without touching the cluster
    pub dry_run: bool,
    /// Bound on each per-service readiness wait
    pub readiness_timeout: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from("deploy-env.yaml"),
            out_dir: PathBuf::from(".deploy/manifests"),
            expected_context: "kind-ztac".to_string(),
            assume_yes: false,
            dry_run: false,
            readiness_timeout: Duration::from_secs(120),
        }
    }
}

/// A recorded per-service (or per-binding) failure
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFailure {
    /// The service or binding that failed
    pub name: String,
    /// What went wrong
    pub detail: String,
}

/// Aggregate outcome of a run
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    /// Services whose manifests were applied (or written, in a dry run)
    pub applied: Vec<String>,
    /// Isolated failures; the run continued past each of these
    pub failed: Vec<ServiceFailure>,
    /// Services that hit the readiness-wait deadline (warning only)
    pub timed_out: Vec<String>,
    /// Final status report text, when the run got that far
    pub report: Option<String>,
}

impl RunSummary {
    /// Whether every participating service deployed cleanly.
    /// Readiness timeouts do not count against success.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, name: &str, detail: impl ToString) {
        let failure = ServiceFailure {
            name: name.to_string(),
            detail: detail.to_string(),
        };
        warn!("{}: {}", failure.name, failure.detail);
        self.failed.push(failure);
    }
}

/// Drives a full synthesize-and-apply pass over the registry
pub struct Orchestrator<'a, C: ClusterCapability> {
    registry: &'a ServiceRegistry,
    cluster: &'a C,
    synthesizer: Synthesizer,
    options: DeployOptions,
}

impl<'a, C: ClusterCapability> Orchestrator<'a, C> {
    /// Create an orchestrator over the given registry and cluster
    pub fn new(registry: &'a ServiceRegistry, cluster: &'a C, options: DeployOptions) -> Self {
        Self {
            registry,
            cluster,
            synthesizer: Synthesizer::new(),
            options,
        }
    }

    /// Run the full deployment sequence.
    ///
    /// Fatal preconditions surface as `Err` before any cluster mutation;
    /// everything after that is collected into the returned [`RunSummary`].
    pub async fn run(&self, filter: &SelectionFilter) -> Result<RunSummary> {
        let env_table = self.preflight().await?;
        let mut summary = RunSummary::default();

        self.ensure_namespaces(filter).await?;
        self.materialize_artifacts(filter, &mut summary).await;
        self.roll_out_dependencies(filter, &env_table, &mut summary)
            .await;
        self.roll_out_apps(filter, &env_table, &mut summary).await;

        if !self.options.dry_run {
            match self.cluster.status_report().await {
                Ok(report) => summary.report = Some(report),
                Err(e) => warn!("Could not gather status report: {}", e),
            }
        }

        Ok(summary)
    }

    /// Fatal precondition checks; nothing is mutated before these pass
    async fn preflight(&self) -> Result<EnvTable> {
        // The env table must exist even for a dry run: synthesis needs it
        let env_table = deploy_config::parse_file(&self.options.env_file)?;

        if self.options.dry_run {
            return Ok(env_table);
        }

        self.cluster.verify_tooling().await?;

        let actual = self.cluster.current_context().await?;
        if actual != self.options.expected_context {
            if self.options.assume_yes {
                warn!(
                    "Deploying to context '{}' (expected '{}') on operator override",
                    actual, self.options.expected_context
                );
            } else {
                return Err(Error::ContextMismatch {
                    expected: self.options.expected_context.clone(),
                    actual,
                });
            }
        }

        Ok(env_table)
    }

    /// Phase 1: idempotent namespace creation
    async fn ensure_namespaces(&self, filter: &SelectionFilter) -> Result<()> {
        for namespace in self.registry.namespaces(filter) {
            if self.options.dry_run {
                info!("Would ensure namespace '{}'", namespace);
                continue;
            }
            info!("Ensuring namespace '{}'", namespace);
            self.cluster.ensure_namespace(&namespace).await?;
        }
        Ok(())
    }

    /// Phase 2: config-artifact materialization.
    ///
    /// Bindings whose target sits outside the filter are skipped silently;
    /// a missing source file fails only that binding.
    async fn materialize_artifacts(&self, filter: &SelectionFilter, summary: &mut RunSummary) {
        for artifact in self.registry.artifacts() {
            if !filter.matches(&artifact.target) {
                continue;
            }

            if !artifact.source.exists() {
                summary.fail(
                    &artifact.name,
                    format!("source file '{}' not found", artifact.source.display()),
                );
                continue;
            }

            if self.options.dry_run {
                info!("Would materialize config artifact '{}'", artifact.name);
                continue;
            }

            info!(
                "Materializing config artifact '{}' in namespace '{}'",
                artifact.name, artifact.namespace
            );
            if let Err(e) = self
                .cluster
                .create_config_map(&artifact.name, &artifact.namespace, &artifact.source)
                .await
            {
                summary.fail(&artifact.name, e);
            }
        }
    }

    /// Phase 3: dependency rollout, then a readiness wait per applied
    /// dependency
    async fn roll_out_dependencies(
        &self,
        filter: &SelectionFilter,
        env_table: &EnvTable,
        summary: &mut RunSummary,
    ) {
        let mut await_ready = Vec::new();

        for dep in self.registry.dependencies() {
            if !filter.matches(&dep.name) {
                continue;
            }

            let env = resolve_env(&ServiceDecl::Dependency(dep), env_table);
            let artifacts = self.registry.artifacts_for(&dep.name);
            let set = match self.synthesizer.dependency(dep, &env, &artifacts) {
                Ok(set) => set,
                Err(e) => {
                    summary.fail(&dep.name, e);
                    continue;
                }
            };

            match self.write_and_apply(&set).await {
                Ok(()) => {
                    summary.applied.push(dep.name.clone());
                    await_ready.push((dep.name.clone(), dep.namespace.clone()));
                }
                Err(e) => summary.fail(&dep.name, e),
            }
        }

        self.wait_for_all(&await_ready, summary).await;
    }

    /// Phase 4: application rollout (build, synthesize, apply), then an
    /// availability wait per applied service
    async fn roll_out_apps(
        &self,
        filter: &SelectionFilter,
        env_table: &EnvTable,
        summary: &mut RunSummary,
    ) {
        let mut await_ready = Vec::new();

        for app in self.registry.apps() {
            if !filter.matches(&app.name) {
                continue;
            }

            if !app.build_context.is_dir() {
                summary.fail(
                    &app.name,
                    format!("build context '{}' not found", app.build_context.display()),
                );
                continue;
            }
            if !app.build_context.join("Dockerfile").is_file() {
                summary.fail(
                    &app.name,
                    format!("no Dockerfile in '{}'", app.build_context.display()),
                );
                continue;
            }

            let tag = format!("{}:local", app.image);
            if self.options.dry_run {
                info!("Would build image '{}'", tag);
            } else {
                info!("Building image '{}'", tag);
                if let Err(e) = self.cluster.build_image(&app.build_context, &tag).await {
                    summary.fail(&app.name, e);
                    continue;
                }
                if let Err(e) = self.cluster.load_image(&tag).await {
                    summary.fail(&app.name, e);
                    continue;
                }
            }

            let env = resolve_env(&ServiceDecl::App(app), env_table);
            let artifacts = self.registry.artifacts_for(&app.name);
            let set = match self.synthesizer.app(app, &env, &artifacts) {
                Ok(set) => set,
                Err(e) => {
                    summary.fail(&app.name, e);
                    continue;
                }
            };

            match self.write_and_apply(&set).await {
                Ok(()) => {
                    summary.applied.push(app.name.clone());
                    await_ready.push((app.name.clone(), app.namespace.clone()));
                }
                Err(e) => summary.fail(&app.name, e),
            }
        }

        self.wait_for_all(&await_ready, summary).await;
    }

    /// Render a set to the scratch directory and apply it
    async fn write_and_apply(&self, set: &ManifestSet) -> Result<()> {
        std::fs::create_dir_all(&self.options.out_dir)?;
        let path = self.options.out_dir.join(set.file_name());
        std::fs::write(&path, set.render()?)?;
        info!("Wrote manifest {}", path.display());

        if self.options.dry_run {
            return Ok(());
        }

        info!("Applying {}", set.service);
        self.cluster.apply(&path).await
    }

    /// Block on readiness for every applied service, one at a time.
    /// Timeouts are warnings, never aborts.
    async fn wait_for_all(&self, services: &[(String, String)], summary: &mut RunSummary) {
        if self.options.dry_run {
            return;
        }
        for (name, namespace) in services {
            info!("Waiting for '{}' to become ready", name);
            match self
                .cluster
                .wait_ready(name, namespace, self.options.readiness_timeout)
                .await
            {
                Ok(WaitOutcome::Ready) => info!("'{}' is ready", name),
                Ok(WaitOutcome::TimedOut) => {
                    warn!(
                        "'{}' did not become ready within {:?}",
                        name, self.options.readiness_timeout
                    );
                    summary.timed_out.push(name.clone());
                }
                Err(e) => {
                    warn!("Readiness check for '{}' failed: {}", name, e);
                    summary.timed_out.push(name.clone());
                }
            }
        }
    }
}
