//! Manifest synthesis.
//!
//! Everything here is side-effect free: declarations in, typed documents
//! out. Writing files and talking to the cluster is the orchestrator's job.

use crate::{
    PortNamingTable, Result, SynthesisError,
    objects::{
        ClusterRole, ClusterRoleBinding, Container, ContainerPort, Deployment,
        PersistentVolumeClaim, Probe, Service, ServiceAccount, ServiceExposure, ServicePort,
        Volume, VolumeMount,
    },
};
use deploy_config::EnvVar;
use deploy_registry::{AppService, ConfigArtifact, DependencyService};
use serde::Serialize;

/// Storage requested for every stateful dependency's claim
const STATEFUL_STORAGE: &str = "1Gi";

/// Readiness probe grace period, seconds
const READY_GRACE: u32 = 5;
/// Liveness probe grace period, seconds (longer so slow starters are not
/// restarted while still warming up)
const ALIVE_GRACE: u32 = 15;
/// Probe recheck interval, seconds
const PROBE_PERIOD: u32 = 10;

/// Cluster-scoped resources granted to cluster-reader dependencies
const READER_RESOURCES: &[&str] = &["pods", "nodes", "namespaces", "services", "endpoints"];

/// One synthesized cluster object
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(untagged)]
#[allow(clippy::large_enum_variant)]
pub enum ManifestDocument {
    /// Workload identity
    ServiceAccount(ServiceAccount),
    /// Cluster-wide capability grant
    ClusterRole(ClusterRole),
    /// Identity-to-grant binding
    ClusterRoleBinding(ClusterRoleBinding),
    /// Persistent-storage claim
    PersistentVolumeClaim(PersistentVolumeClaim),
    /// Workload
    Deployment(Deployment),
    /// Network exposure
    Service(Service),
}

/// The synthesized objects for one service, in apply order
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestSet {
    /// The service these objects belong to
    pub service: String,
    /// Documents, ordered so that each object's prerequisites precede it
    pub documents: Vec<ManifestDocument>,
}

impl ManifestSet {
    /// File name the set is written under in the output directory
    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.service)
    }

    /// Render the set as a multi-document YAML string.
    ///
    /// Rendering is the only serialization step; identical sets always
    /// render to byte-identical text.
    pub fn render(&self) -> Result<String> {
        let mut rendered = Vec::with_capacity(self.documents.len());
        for doc in &self.documents {
            let text = serde_yaml::to_string(doc).map_err(|source| SynthesisError::Render {
                service: self.service.clone(),
                source,
            })?;
            rendered.push(text);
        }
        Ok(rendered.join("---\n"))
    }
}

/// Synthesizes cluster objects from service declarations
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    ports: PortNamingTable,
}

impl Synthesizer {
    /// Synthesizer with the standard port naming table
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesize the objects for an application service.
    ///
    /// The workload references the locally built `<image>:local` tag with
    /// pulling disabled, and is exposed externally through a node port with
    /// no remapping. Application services carry no probes.
    pub fn app(
        &self,
        app: &AppService,
        env: &[EnvVar],
        artifacts: &[&ConfigArtifact],
    ) -> Result<ManifestSet> {
        let names = self.ports.name_ports(&app.name, &app.ports)?;

        let container_ports: Vec<ContainerPort> = app
            .ports
            .iter()
            .zip(&names)
            .map(|(port, name)| ContainerPort {
                container_port: *port,
                name: name.clone(),
            })
            .collect();

        let (mounts, volumes) = artifact_mounts(artifacts);

        let container = Container {
            name: app.name.clone(),
            image: local_image_tag(&app.image),
            image_pull_policy: Some("Never".to_string()),
            ports: container_ports,
            env: env.to_vec(),
            volume_mounts: mounts,
            readiness_probe: None,
            liveness_probe: None,
        };

        let mut deployment = Deployment::new(&app.name, &app.namespace, container);
        deployment.spec.template.spec.volumes = volumes;

        let service_ports = app
            .ports
            .iter()
            .zip(&names)
            .map(|(port, name)| ServicePort {
                name: name.clone(),
                port: *port,
                target_port: *port,
            })
            .collect();
        let exposure = Service::new(
            &app.name,
            &app.namespace,
            ServiceExposure::NodePort,
            service_ports,
        );

        Ok(ManifestSet {
            service: app.name.clone(),
            documents: vec![
                ManifestDocument::Deployment(deployment),
                ManifestDocument::Service(exposure),
            ],
        })
    }

    /// Synthesize the objects for a dependency service.
    ///
    /// Dependencies are cluster-internal only, get TCP readiness and
    /// liveness probes on their container port, a storage claim when
    /// stateful, and a full access-control set when flagged as a cluster
    /// reader.
    pub fn dependency(
        &self,
        dep: &DependencyService,
        env: &[EnvVar],
        artifacts: &[&ConfigArtifact],
    ) -> Result<ManifestSet> {
        let mut documents = Vec::new();
        let mut mounts = Vec::new();
        let mut volumes = Vec::new();

        if dep.cluster_reader {
            let account = ServiceAccount::new(&dep.name, &dep.namespace);
            let role = ClusterRole::reader(
                &format!("{}-cluster-reader", dep.name),
                &dep.name,
                READER_RESOURCES,
            );
            let binding = ClusterRoleBinding::new(
                &format!("{}-cluster-reader", dep.name),
                &dep.name,
                &account,
                &role,
            );
            documents.push(ManifestDocument::ServiceAccount(account));
            documents.push(ManifestDocument::ClusterRole(role));
            documents.push(ManifestDocument::ClusterRoleBinding(binding));
        }

        if let Some(mount_path) = &dep.stateful {
            let claim_name = format!("{}-data", dep.name);
            documents.push(ManifestDocument::PersistentVolumeClaim(
                PersistentVolumeClaim::new(&claim_name, &dep.namespace, &dep.name, STATEFUL_STORAGE),
            ));
            mounts.push(VolumeMount {
                name: "data".to_string(),
                mount_path: mount_path.to_string_lossy().into_owned(),
                sub_path: None,
            });
            volumes.push(Volume::pvc("data", claim_name));
        }

        let (artifact_mount_list, artifact_volume_list) = artifact_mounts(artifacts);
        mounts.extend(artifact_mount_list);
        volumes.extend(artifact_volume_list);

        let container = Container {
            name: dep.name.clone(),
            image: dep.image.clone(),
            image_pull_policy: None,
            ports: vec![ContainerPort {
                container_port: dep.container_port,
                name: None,
            }],
            env: env.to_vec(),
            volume_mounts: mounts,
            readiness_probe: Some(Probe::tcp(dep.container_port, READY_GRACE, PROBE_PERIOD)),
            liveness_probe: Some(Probe::tcp(dep.container_port, ALIVE_GRACE, PROBE_PERIOD)),
        };

        let mut deployment = Deployment::new(&dep.name, &dep.namespace, container);
        deployment.spec.template.spec.volumes = volumes;
        if dep.cluster_reader {
            deployment.spec.template.spec.service_account_name = Some(dep.name.clone());
        }

        let exposure = Service::new(
            &dep.name,
            &dep.namespace,
            ServiceExposure::ClusterIP,
            vec![ServicePort {
                name: None,
                port: dep.service_port,
                target_port: dep.container_port,
            }],
        );

        documents.push(ManifestDocument::Deployment(deployment));
        documents.push(ManifestDocument::Service(exposure));

        Ok(ManifestSet {
            service: dep.name.clone(),
            documents,
        })
    }
}

/// Locally built images are tagged for local-only use and never pulled
fn local_image_tag(image: &str) -> String {
    format!("{image}:local")
}

/// One mount plus one volume per artifact bound to the service
fn artifact_mounts(artifacts: &[&ConfigArtifact]) -> (Vec<VolumeMount>, Vec<Volume>) {
    let mut mounts = Vec::new();
    let mut volumes = Vec::new();
    for artifact in artifacts {
        // Mount the single file, not the whole directory: subPath keeps
        // whatever else lives at the mount path visible to the container.
        let file_name = artifact.file_name();
        mounts.push(VolumeMount {
            name: artifact.name.clone(),
            mount_path: artifact
                .mount_path
                .join(&file_name)
                .to_string_lossy()
                .into_owned(),
            sub_path: Some(file_name),
        });
        volumes.push(Volume::config_map(&artifact.name, &artifact.name));
    }
    (mounts, volumes)
}
