//! The cluster capability contract and its kubectl-backed implementation.

use crate::{Error, Result};
use async_trait::async_trait;
use smol::process::Command;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Outcome of a bounded readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The workload became ready within the timeout
    Ready,
    /// The timeout elapsed first; never fatal
    TimedOut,
}

/// Everything the orchestrator needs from the outside world.
///
/// The real implementation shells out to kubectl/docker; tests substitute a
/// recording mock. Every call is blocking from the orchestrator's point of
/// view; services are processed strictly one at a time.
#[async_trait]
pub trait ClusterCapability: Send + Sync {
    /// Verify the external tools this capability depends on are usable
    async fn verify_tooling(&self) -> Result<()>;

    /// The cluster context the operator is currently pointed at
    async fn current_context(&self) -> Result<String>;

    /// Idempotently create a namespace
    async fn ensure_namespace(&self, namespace: &str) -> Result<()>;

    /// Create a config-injection object from a source file, replacing any
    /// previous version
    async fn create_config_map(&self, name: &str, namespace: &str, source: &Path) -> Result<()>;

    /// Apply a rendered manifest file
    async fn apply(&self, manifest: &Path) -> Result<()>;

    /// Wait for a workload's rollout to complete, bounded by `timeout`
    async fn wait_ready(
        &self,
        service: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome>;

    /// Build a container image from a local context
    async fn build_image(&self, context: &Path, tag: &str) -> Result<()>;

    /// Make a locally built image visible to the cluster's nodes
    async fn load_image(&self, tag: &str) -> Result<()>;

    /// Human-readable listing of deployed objects across all namespaces
    async fn status_report(&self) -> Result<String>;
}

/// Cluster capability backed by the kubectl, docker and kind CLIs
pub struct KubectlCluster {
    /// Name of the kind cluster images are loaded into, when the expected
    /// context is a kind cluster
    kind_cluster: Option<String>,
}

impl KubectlCluster {
    /// Capability for the given expected context. A `kind-*` context
    /// enables loading locally built images into the kind nodes.
    pub fn new(expected_context: &str) -> Self {
        Self {
            kind_cluster: expected_context
                .strip_prefix("kind-")
                .map(|name| name.to_string()),
        }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let rendered = format!("{} {}", program, args.join(" "));
        debug!("Running: {}", rendered);

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::CommandFailed {
                command: rendered.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: rendered,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn tool_usable(&self, program: &str, args: &[&str]) -> bool {
        Command::new(program)
            .args(args)
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ClusterCapability for KubectlCluster {
    async fn verify_tooling(&self) -> Result<()> {
        if !self.tool_usable("kubectl", &["version", "--client"]).await {
            return Err(Error::ToolMissing("kubectl".to_string()));
        }
        if !self.tool_usable("docker", &["--version"]).await {
            return Err(Error::ToolMissing("docker".to_string()));
        }
        if self.kind_cluster.is_some() && !self.tool_usable("kind", &["--version"]).await {
            return Err(Error::ToolMissing("kind".to_string()));
        }
        Ok(())
    }

    async fn current_context(&self) -> Result<String> {
        let out = self.run("kubectl", &["config", "current-context"]).await?;
        Ok(out.trim().to_string())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        if self
            .run("kubectl", &["get", "namespace", namespace])
            .await
            .is_ok()
        {
            return Ok(());
        }
        self.run("kubectl", &["create", "namespace", namespace])
            .await?;
        Ok(())
    }

    async fn create_config_map(&self, name: &str, namespace: &str, source: &Path) -> Result<()> {
        // Replace rather than patch: delete any prior version first
        self.run(
            "kubectl",
            &[
                "delete",
                "configmap",
                name,
                "-n",
                namespace,
                "--ignore-not-found",
            ],
        )
        .await?;
        let from_file = format!("--from-file={}", source.display());
        self.run(
            "kubectl",
            &["create", "configmap", name, "-n", namespace, &from_file],
        )
        .await?;
        Ok(())
    }

    async fn apply(&self, manifest: &Path) -> Result<()> {
        let path = manifest.display().to_string();
        self.run("kubectl", &["apply", "-f", &path]).await?;
        Ok(())
    }

    async fn wait_ready(
        &self,
        service: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        let target = format!("deployment/{service}");
        let timeout_arg = format!("--timeout={}s", timeout.as_secs());
        match self
            .run(
                "kubectl",
                &["rollout", "status", &target, "-n", namespace, &timeout_arg],
            )
            .await
        {
            Ok(_) => Ok(WaitOutcome::Ready),
            // only a passed deadline maps to TimedOut; a missing deployment
            // or unreachable cluster stays an error
            Err(Error::CommandFailed { detail, .. }) if deadline_elapsed(&detail) => {
                Ok(WaitOutcome::TimedOut)
            }
            Err(e) => Err(e),
        }
    }

    async fn build_image(&self, context: &Path, tag: &str) -> Result<()> {
        let context = context.display().to_string();
        self.run("docker", &["build", "-t", tag, &context]).await?;
        Ok(())
    }

    async fn load_image(&self, tag: &str) -> Result<()> {
        if let Some(cluster) = &self.kind_cluster {
            self.run("kind", &["load", "docker-image", tag, "--name", cluster])
                .await?;
        }
        Ok(())
    }

    async fn status_report(&self) -> Result<String> {
        self.run(
            "kubectl",
            &["get", "deployments,services,pods", "--all-namespaces"],
        )
        .await
    }
}

/// `kubectl rollout status` reports a passed `--timeout` deadline on stderr
fn deadline_elapsed(stderr: &str) -> bool {
    stderr.contains("timed out") || stderr.contains("deadline exceeded")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_errors_distinguished_from_real_failures() {
        assert!(deadline_elapsed(
            "error: timed out waiting for the condition"
        ));
        assert!(deadline_elapsed(
            "error: deadline exceeded before rollout finished"
        ));
        assert!(!deadline_elapsed(
            "Error from server (NotFound): deployments.apps \"loki\" not found"
        ));
        assert!(!deadline_elapsed(
            "The connection to the server localhost:8080 was refused"
        ));
    }

    #[test]
    fn test_kind_cluster_derived_from_context() {
        let kind = KubectlCluster::new("kind-ztac");
        assert_eq!(kind.kind_cluster.as_deref(), Some("ztac"));

        let other = KubectlCluster::new("minikube");
        assert!(other.kind_cluster.is_none());
    }
}
