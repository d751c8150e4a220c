//! Integration tests for manifest synthesis

use deploy_config::EnvVar;
use deploy_manifest::{ManifestDocument, Synthesizer};
use deploy_registry::{AppService, ConfigArtifact, DependencyService};
use std::path::PathBuf;

fn operational_api() -> AppService {
    AppService {
        name: "operational-api".to_string(),
        build_context: PathBuf::from("services/operational-api"),
        image: "operational-api".to_string(),
        ports: vec![8080, 9090, 4317],
        namespace: "apps".to_string(),
        global_env: true,
    }
}

fn loki() -> DependencyService {
    DependencyService {
        name: "loki".to_string(),
        image: "grafana/loki:3.1.0".to_string(),
        container_port: 3100,
        service_port: 3100,
        namespace: "monitoring".to_string(),
        stateful: Some(PathBuf::from("/loki")),
        cluster_reader: false,
        global_env: false,
    }
}

fn loki_config() -> ConfigArtifact {
    ConfigArtifact {
        name: "loki-config".to_string(),
        namespace: "monitoring".to_string(),
        source: PathBuf::from("deploy/config/loki-config.yaml"),
        mount_path: PathBuf::from("/etc/loki"),
        target: "loki".to_string(),
    }
}

fn env() -> Vec<EnvVar> {
    vec![
        EnvVar {
            name: "TENANTS".to_string(),
            value: "acme,initech".to_string(),
        },
        EnvVar {
            name: "LISTEN_ADDR".to_string(),
            value: "0.0.0.0:8080".to_string(),
        },
    ]
}

#[test]
fn test_rendering_is_deterministic() {
    let synthesizer = Synthesizer::new();
    let app = operational_api();
    let env = env();

    let first = synthesizer.app(&app, &env, &[]).unwrap().render().unwrap();
    let second = synthesizer.app(&app, &env, &[]).unwrap().render().unwrap();
    assert_eq!(first, second);

    let config = loki_config();
    let dep_first = synthesizer
        .dependency(&loki(), &[], &[&config])
        .unwrap()
        .render()
        .unwrap();
    let dep_second = synthesizer
        .dependency(&loki(), &[], &[&config])
        .unwrap()
        .render()
        .unwrap();
    assert_eq!(dep_first, dep_second);
}

#[test]
fn test_app_ports_all_named_with_known_exceptions() {
    let synthesizer = Synthesizer::new();
    let set = synthesizer.app(&operational_api(), &[], &[]).unwrap();

    let deployment = set
        .documents
        .iter()
        .find_map(|d| match d {
            ManifestDocument::Deployment(dep) => Some(dep),
            _ => None,
        })
        .expect("no workload synthesized");

    let ports = &deployment.spec.template.spec.containers[0].ports;
    assert_eq!(ports.len(), 3);

    let names: Vec<_> = ports.iter().map(|p| p.name.as_deref().unwrap()).collect();
    assert_eq!(names, vec!["http", "grpc-api", "otlp"]);

    // all names distinct
    let mut sorted = names.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), names.len());
}

#[test]
fn test_single_port_service_emits_no_port_name() {
    let synthesizer = Synthesizer::new();
    let mut app = operational_api();
    app.ports = vec![8080];

    let rendered = synthesizer.app(&app, &[], &[]).unwrap().render().unwrap();
    assert!(rendered.contains("containerPort: 8080"));
    assert!(!rendered.contains("name: http"));
}

#[test]
fn test_port_exhaustion_fails_synthesis() {
    let synthesizer = Synthesizer::new();
    let mut app = operational_api();
    app.ports = (8000..8020).collect();

    assert!(synthesizer.app(&app, &[], &[]).is_err());
}

#[test]
fn test_stateful_plus_artifact_mounts_are_merged() {
    let synthesizer = Synthesizer::new();
    let config = loki_config();
    let set = synthesizer.dependency(&loki(), &[], &[&config]).unwrap();

    let deployment = set
        .documents
        .iter()
        .find_map(|d| match d {
            ManifestDocument::Deployment(dep) => Some(dep),
            _ => None,
        })
        .unwrap();

    let mounts = &deployment.spec.template.spec.containers[0].volume_mounts;
    let volumes = &deployment.spec.template.spec.volumes;
    assert_eq!(mounts.len(), 2);
    assert_eq!(volumes.len(), 2);

    // storage first, then the artifact
    assert_eq!(mounts[0].mount_path, "/loki");
    assert_eq!(mounts[1].mount_path, "/etc/loki/loki-config.yaml");
    assert_eq!(mounts[1].sub_path.as_deref(), Some("loki-config.yaml"));
    assert!(volumes[0].persistent_volume_claim.is_some());
    assert!(volumes[1].config_map.is_some());

    // and the claim itself is part of the set
    assert!(
        set.documents
            .iter()
            .any(|d| matches!(d, ManifestDocument::PersistentVolumeClaim(_)))
    );
}

#[test]
fn test_cluster_reader_gets_access_control_set() {
    let synthesizer = Synthesizer::new();
    let alloy = DependencyService {
        name: "alloy".to_string(),
        image: "grafana/alloy:v1.4.2".to_string(),
        container_port: 12345,
        service_port: 12345,
        namespace: "monitoring".to_string(),
        stateful: None,
        cluster_reader: true,
        global_env: false,
    };

    let set = synthesizer.dependency(&alloy, &[], &[]).unwrap();

    let kinds: Vec<_> = set
        .documents
        .iter()
        .map(|d| match d {
            ManifestDocument::ServiceAccount(_) => "ServiceAccount",
            ManifestDocument::ClusterRole(_) => "ClusterRole",
            ManifestDocument::ClusterRoleBinding(_) => "ClusterRoleBinding",
            ManifestDocument::PersistentVolumeClaim(_) => "PersistentVolumeClaim",
            ManifestDocument::Deployment(_) => "Deployment",
            ManifestDocument::Service(_) => "Service",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "ServiceAccount",
            "ClusterRole",
            "ClusterRoleBinding",
            "Deployment",
            "Service"
        ]
    );

    let deployment = set
        .documents
        .iter()
        .find_map(|d| match d {
            ManifestDocument::Deployment(dep) => Some(dep),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        deployment
            .spec
            .template
            .spec
            .service_account_name
            .as_deref(),
        Some("alloy")
    );
}

#[test]
fn test_dependency_probes_and_internal_exposure() {
    let synthesizer = Synthesizer::new();
    let set = synthesizer.dependency(&loki(), &[], &[]).unwrap();
    let rendered = set.render().unwrap();

    assert!(rendered.contains("readinessProbe"));
    assert!(rendered.contains("livenessProbe"));
    assert!(rendered.contains("type: ClusterIP"));
    assert!(!rendered.contains("NodePort"));

    let deployment = set
        .documents
        .iter()
        .find_map(|d| match d {
            ManifestDocument::Deployment(dep) => Some(dep),
            _ => None,
        })
        .unwrap();
    let container = &deployment.spec.template.spec.containers[0];
    let ready = container.readiness_probe.as_ref().unwrap();
    let alive = container.liveness_probe.as_ref().unwrap();
    assert_eq!(ready.tcp_socket.port, 3100);
    assert!(ready.initial_delay_seconds < alive.initial_delay_seconds);
    assert_eq!(ready.period_seconds, alive.period_seconds);
}

#[test]
fn test_app_uses_local_image_and_external_exposure() {
    let synthesizer = Synthesizer::new();
    let set = synthesizer.app(&operational_api(), &env(), &[]).unwrap();
    let rendered = set.render().unwrap();

    assert!(rendered.contains("image: operational-api:local"));
    assert!(rendered.contains("imagePullPolicy: Never"));
    assert!(rendered.contains("type: NodePort"));

    // env order survives into the manifest text
    let tenants = rendered.find("TENANTS").unwrap();
    let listen = rendered.find("LISTEN_ADDR").unwrap();
    assert!(tenants < listen);
}
