//! CLI entry point for the stack deployer.

use anyhow::{Context, Result, bail};
use clap::Parser;
use deploy_orchestration::{DeployOptions, KubectlCluster, Orchestrator, RunSummary};
use deploy_registry::SelectionFilter;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod catalog;

#[derive(Parser)]
#[command(name = "stack-deploy")]
#[command(about = "Compile the service catalog into cluster manifests and apply them")]
#[command(version)]
struct Cli {
    /// Deploy only these services (comma-separated)
    #[arg(long, value_name = "SERVICES", conflicts_with = "exclude")]
    only: Option<String>,

    /// Deploy everything except these services (comma-separated)
    #[arg(long, value_name = "SERVICES")]
    exclude: Option<String>,

    /// Environment-table file
    #[arg(long, default_value = "deploy-env.yaml")]
    env_file: PathBuf,

    /// Directory rendered manifests are written to
    #[arg(long, default_value = ".deploy/manifests")]
    out_dir: PathBuf,

    /// Cluster context the deployment expects to be pointed at
    #[arg(long, default_value = "kind-ztac")]
    context: String,

    /// Proceed even when the current context differs from --context
    #[arg(long)]
    assume_yes: bool,

    /// Synthesize and write manifests without touching the cluster
    #[arg(long)]
    dry_run: bool,

    /// Bound on each per-service readiness wait, in seconds
    #[arg(long, default_value_t = 120)]
    readiness_timeout: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    smol::block_on(async {
        let cli = Cli::parse();

        // clap already rejects the flag combination; this keeps the
        // invariant when the filter is built programmatically
        let filter = SelectionFilter::from_flags(cli.only, cli.exclude)
            .context("Invalid service selection")?;

        let registry = catalog::registry().context("Built-in catalog is invalid")?;
        let cluster = KubectlCluster::new(&cli.context);
        let options = DeployOptions {
            env_file: cli.env_file,
            out_dir: cli.out_dir,
            expected_context: cli.context,
            assume_yes: cli.assume_yes,
            dry_run: cli.dry_run,
            readiness_timeout: Duration::from_secs(cli.readiness_timeout),
        };

        let orchestrator = Orchestrator::new(&registry, &cluster, options);
        let summary = orchestrator.run(&filter).await?;
        print_summary(&summary);

        if !summary.is_success() {
            bail!("{} services failed to deploy", summary.failed.len());
        }
        Ok(())
    })
}


fn print_summary(summary: &RunSummary) {
    if let Some(report) = &summary.report {
        println!("\n{report}");
    }

    println!("{} services deployed", summary.applied.len());

    if !summary.timed_out.is_empty() {
        println!(
            "{} services did not become ready in time:",
            summary.timed_out.len()
        );
        for name in &summary.timed_out {
            println!("  - {name}");
        }
    }

    if !summary.failed.is_empty() {
        eprintln!("\n{} services failed:", summary.failed.len());
        for failure in &summary.failed {
            eprintln!("  - {}: {}", failure.name, failure.detail);
        }
    }
}
