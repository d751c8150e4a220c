//! The built-in service catalog.
//!
//! This is the single place the deployable stack is defined. Behavioural
//! flags (stateful storage, cluster-read access, global env consumption)
//! are set here explicitly per declaration.

use deploy_registry::{
    AppService, ConfigArtifact, DependencyService, Result, ServiceRegistry,
};
use std::path::PathBuf;

/// Build the catalog. Validation failures here mean the catalog itself is
/// broken and abort the run before anything else happens.
pub fn registry() -> Result<ServiceRegistry> {
    ServiceRegistry::builder()
        // Infrastructure dependencies, rolled out before any application
        .dependency(DependencyService {
            name: "prometheus".to_string(),
            image: "prom/prometheus:v2.54.1".to_string(),
            container_port: 9090,
            service_port: 9090,
            namespace: "monitoring".to_string(),
            stateful: Some(PathBuf::from("/prometheus")),
            cluster_reader: false,
            global_env: false,
        })
        .dependency(DependencyService {
            name: "pushgateway".to_string(),
            image: "prom/pushgateway:v1.9.0".to_string(),
            container_port: 9091,
            service_port: 9091,
            namespace: "monitoring".to_string(),
            stateful: None,
            cluster_reader: false,
            global_env: false,
        })
        .dependency(DependencyService {
            name: "loki".to_string(),
            image: "grafana/loki:3.1.0".to_string(),
            container_port: 3100,
            service_port: 3100,
            namespace: "monitoring".to_string(),
            stateful: Some(PathBuf::from("/loki")),
            cluster_reader: false,
            global_env: false,
        })
        .dependency(DependencyService {
            name: "grafana".to_string(),
            image: "grafana/grafana:11.2.0".to_string(),
            container_port: 3000,
            service_port: 3000,
            namespace: "monitoring".to_string(),
            stateful: Some(PathBuf::from("/var/lib/grafana")),
            cluster_reader: false,
            global_env: false,
        })
        // Alloy discovers scrape targets and pod logs across the whole
        // cluster, so it runs under a read-only cluster-wide grant
        .dependency(DependencyService {
            name: "alloy".to_string(),
            image: "grafana/alloy:v1.4.2".to_string(),
            container_port: 12345,
            service_port: 12345,
            namespace: "monitoring".to_string(),
            stateful: None,
            cluster_reader: true,
            global_env: false,
        })
        // Application services, built locally
        .app(AppService {
            name: "operational-api".to_string(),
            build_context: PathBuf::from("services/operational-api"),
            image: "operational-api".to_string(),
            ports: vec![8080, 9090, 4317],
            namespace: "apps".to_string(),
            global_env: true,
        })
        .app(AppService {
            name: "ztac-engine".to_string(),
            build_context: PathBuf::from("services/ztac-engine"),
            image: "ztac-engine".to_string(),
            ports: vec![8081],
            namespace: "apps".to_string(),
            global_env: true,
        })
        .app(AppService {
            name: "auth-log-generator".to_string(),
            build_context: PathBuf::from("mocks/auth-log-generator"),
            image: "auth-log-generator".to_string(),
            ports: vec![8000],
            namespace: "mocks".to_string(),
            global_env: true,
        })
        .app(AppService {
            name: "prometheus-data-generator".to_string(),
            build_context: PathBuf::from("mocks/prometheus-data-generator"),
            image: "prometheus-data-generator".to_string(),
            ports: vec![8000],
            namespace: "mocks".to_string(),
            global_env: true,
        })
        .app(AppService {
            name: "openexchangerates-mock".to_string(),
            build_context: PathBuf::from("mocks/openexchangerates-mock"),
            image: "openexchangerates-mock".to_string(),
            ports: vec![5000],
            namespace: "mocks".to_string(),
            global_env: false,
        })
        // Config artifacts mounted into their targets
        .artifact(ConfigArtifact {
            name: "prometheus-config".to_string(),
            namespace: "monitoring".to_string(),
            source: PathBuf::from("deploy/config/prometheus.yml"),
            mount_path: PathBuf::from("/etc/prometheus"),
            target: "prometheus".to_string(),
        })
        .artifact(ConfigArtifact {
            name: "loki-config".to_string(),
            namespace: "monitoring".to_string(),
            source: PathBuf::from("deploy/config/loki-config.yaml"),
            mount_path: PathBuf::from("/etc/loki"),
            target: "loki".to_string(),
        })
        .artifact(ConfigArtifact {
            name: "alloy-config".to_string(),
            namespace: "monitoring".to_string(),
            source: PathBuf::from("deploy/config/config.alloy"),
            mount_path: PathBuf::from("/etc/alloy"),
            target: "alloy".to_string(),
        })
        .artifact(ConfigArtifact {
            name: "grafana-datasources".to_string(),
            namespace: "monitoring".to_string(),
            source: PathBuf::from("deploy/config/datasources.yaml"),
            mount_path: PathBuf::from("/etc/grafana/provisioning/datasources"),
            target: "grafana".to_string(),
        })
        .artifact(ConfigArtifact {
            name: "ztac-config".to_string(),
            namespace: "apps".to_string(),
            source: PathBuf::from("deploy/config/ztac.yaml"),
            mount_path: PathBuf::from("/etc/ztac"),
            target: "ztac-engine".to_string(),
        })
        .build()
}
