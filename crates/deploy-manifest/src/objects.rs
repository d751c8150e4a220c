//! Typed cluster object definitions.
//!
//! Only the fields this deployer emits are modelled. Serialization matches
//! the cluster API's camelCase wire form; optional and empty fields are
//! skipped so the rendered manifests stay close to what an operator would
//! write by hand.

use deploy_config::EnvVar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object metadata common to every cluster object
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name
    pub name: String,
    /// Namespace, absent for cluster-scoped objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Namespaced metadata with an `app` label
    pub fn namespaced(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            namespace: Some(namespace.into()),
            labels: BTreeMap::from([("app".to_string(), name.clone())]),
            name,
        }
    }

    /// Cluster-scoped metadata with an `app` label
    pub fn cluster_scoped(name: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            labels: BTreeMap::from([("app".to_string(), app.into())]),
        }
    }
}

// =============================================================================
// Workload
// =============================================================================

/// A workload object (apps/v1 Deployment)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Workload spec
    pub spec: DeploymentSpec,
}

impl Deployment {
    /// Single-replica workload for the given service
    pub fn new(name: &str, namespace: &str, container: Container) -> Self {
        Self {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            metadata: ObjectMeta::namespaced(name, namespace),
            spec: DeploymentSpec {
                replicas: 1,
                selector: LabelSelector {
                    match_labels: BTreeMap::from([("app".to_string(), name.to_string())]),
                },
                template: PodTemplateSpec {
                    metadata: PodMeta {
                        labels: BTreeMap::from([("app".to_string(), name.to_string())]),
                    },
                    spec: PodSpec {
                        service_account_name: None,
                        containers: vec![container],
                        volumes: Vec::new(),
                    },
                },
            },
        }
    }
}

/// Deployment spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Replica count (always 1 for this deployer)
    pub replicas: i32,
    /// Pod selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
}

/// Label selector
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Labels a pod must carry to be selected
    pub match_labels: BTreeMap<String, String>,
}

/// Pod template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    /// Template metadata (labels only)
    pub metadata: PodMeta,
    /// Pod spec
    pub spec: PodSpec,
}

/// Pod template metadata
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodMeta {
    /// Pod labels
    pub labels: BTreeMap<String, String>,
}

/// Pod spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Identity the pod runs under, when elevated access is needed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// Containers (always exactly one here)
    pub containers: Vec<Container>,
    /// Pod volumes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// A single container
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name (the service name)
    pub name: String,
    /// Image reference
    pub image: String,
    /// Pull policy; `Never` for locally built images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    /// Declared ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    /// Injected environment, in resolution order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Volume mounts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    /// Readiness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    /// Liveness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
}

/// A container port
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port number
    pub container_port: u16,
    /// Port name; required by the cluster when a workload has several ports,
    /// omitted entirely for single-port workloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// TCP reachability probe
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    /// TCP check target
    pub tcp_socket: TcpSocketAction,
    /// Grace period before the first check
    pub initial_delay_seconds: u32,
    /// Recheck interval
    pub period_seconds: u32,
}

impl Probe {
    /// TCP probe on the given port
    pub fn tcp(port: u16, initial_delay_seconds: u32, period_seconds: u32) -> Self {
        Self {
            tcp_socket: TcpSocketAction { port },
            initial_delay_seconds,
            period_seconds,
        }
    }
}

/// TCP probe target
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TcpSocketAction {
    /// Port to connect to
    pub port: u16,
}

/// A volume mount inside a container
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Volume name, matching an entry in the pod's volume list
    pub name: String,
    /// Mount path inside the container
    pub mount_path: String,
    /// Sub-path within the volume (the artifact's file name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// A pod volume
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Volume name
    pub name: String,
    /// Config-injection source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolumeSource>,
    /// Durable storage source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimVolumeSource>,
}

impl Volume {
    /// Volume backed by a config-injection object
    pub fn config_map(name: impl Into<String>, config_map_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map_name.into(),
            }),
            persistent_volume_claim: None,
        }
    }

    /// Volume backed by a storage claim
    pub fn pvc(name: impl Into<String>, claim_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_map: None,
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim_name.into(),
            }),
        }
    }
}

/// Reference to a config-injection object
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapVolumeSource {
    /// Config-injection object name
    pub name: String,
}

/// Reference to a storage claim
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimVolumeSource {
    /// Claim name
    pub claim_name: String,
}

// =============================================================================
// Network exposure
// =============================================================================

/// A network-exposure object (v1 Service)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Exposure spec
    pub spec: ServiceSpec,
}

impl Service {
    /// Exposure for the given service selecting its workload by `app` label
    pub fn new(
        name: &str,
        namespace: &str,
        exposure: ServiceExposure,
        ports: Vec<ServicePort>,
    ) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ObjectMeta::namespaced(name, namespace),
            spec: ServiceSpec {
                type_: exposure,
                selector: BTreeMap::from([("app".to_string(), name.to_string())]),
                ports,
            },
        }
    }
}

/// How a service is reachable
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ServiceExposure {
    /// Reachable only inside the cluster network
    ClusterIP,
    /// Reachable from outside through a node port
    NodePort,
}

/// Network-exposure spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Exposure type
    #[serde(rename = "type")]
    pub type_: ServiceExposure,
    /// Workload selector
    pub selector: BTreeMap<String, String>,
    /// Exposed ports
    pub ports: Vec<ServicePort>,
}

/// A single exposed port
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    /// Port name; mirrors the container port name for multi-port services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port the service listens on
    pub port: u16,
    /// Container port traffic is forwarded to
    pub target_port: u16,
}

// =============================================================================
// Persistent storage
// =============================================================================

/// A persistent-storage object (v1 PersistentVolumeClaim)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaim {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Claim spec
    pub spec: PersistentVolumeClaimSpec,
}

impl PersistentVolumeClaim {
    /// Single-writer claim with the given storage request
    pub fn new(name: &str, namespace: &str, app: &str, storage: &str) -> Self {
        let mut metadata = ObjectMeta::namespaced(name, namespace);
        metadata.labels = BTreeMap::from([("app".to_string(), app.to_string())]);
        Self {
            api_version: "v1".to_string(),
            kind: "PersistentVolumeClaim".to_string(),
            metadata,
            spec: PersistentVolumeClaimSpec {
                access_modes: vec!["ReadWriteOnce".to_string()],
                resources: ResourceRequirements {
                    requests: BTreeMap::from([("storage".to_string(), storage.to_string())]),
                },
            },
        }
    }
}

/// Claim spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimSpec {
    /// Access modes
    pub access_modes: Vec<String>,
    /// Storage request
    pub resources: ResourceRequirements,
}

/// Resource requests
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Requested quantities by resource name
    pub requests: BTreeMap<String, String>,
}

// =============================================================================
// Access control
// =============================================================================

/// A workload identity (v1 ServiceAccount)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
}

impl ServiceAccount {
    /// Identity for the given service
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ServiceAccount".to_string(),
            metadata: ObjectMeta::namespaced(name, namespace),
        }
    }
}

/// A cluster-wide capability grant (rbac ClusterRole)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRole {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Granted rules
    pub rules: Vec<PolicyRule>,
}

impl ClusterRole {
    /// Read-only grant over the given core resources
    pub fn reader(name: &str, app: &str, resources: &[&str]) -> Self {
        Self {
            api_version: "rbac.authorization.k8s.io/v1".to_string(),
            kind: "ClusterRole".to_string(),
            metadata: ObjectMeta::cluster_scoped(name, app),
            rules: vec![PolicyRule {
                api_groups: vec!["".to_string()],
                resources: resources.iter().map(|r| r.to_string()).collect(),
                verbs: vec![
                    "get".to_string(),
                    "list".to_string(),
                    "watch".to_string(),
                ],
            }],
        }
    }
}

/// A single capability rule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// API groups the rule applies to
    pub api_groups: Vec<String>,
    /// Resources the rule applies to
    pub resources: Vec<String>,
    /// Allowed verbs
    pub verbs: Vec<String>,
}

/// Binding between an identity and a capability grant (rbac ClusterRoleBinding)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleBinding {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Bound identities
    pub subjects: Vec<Subject>,
    /// The grant being bound
    pub role_ref: RoleRef,
}

impl ClusterRoleBinding {
    /// Bind a namespaced identity to a cluster-wide grant
    pub fn new(name: &str, app: &str, account: &ServiceAccount, role: &ClusterRole) -> Self {
        Self {
            api_version: "rbac.authorization.k8s.io/v1".to_string(),
            kind: "ClusterRoleBinding".to_string(),
            metadata: ObjectMeta::cluster_scoped(name, app),
            subjects: vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: account.metadata.name.clone(),
                namespace: account.metadata.namespace.clone(),
            }],
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "ClusterRole".to_string(),
                name: role.metadata.name.clone(),
            },
        }
    }
}

/// A bound identity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Identity kind
    pub kind: String,
    /// Identity name
    pub name: String,
    /// Identity namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Reference to the bound grant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    /// API group of the grant
    pub api_group: String,
    /// Grant kind
    pub kind: String,
    /// Grant name
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_port_omits_name_field() {
        let port = ContainerPort {
            container_port: 3100,
            name: None,
        };
        let yaml = serde_yaml::to_string(&port).unwrap();
        assert!(!yaml.contains("name"));
        assert!(yaml.contains("containerPort: 3100"));
    }

    #[test]
    fn test_exposure_serializes_as_cluster_api_token() {
        let service = Service::new(
            "loki",
            "monitoring",
            ServiceExposure::ClusterIP,
            vec![ServicePort {
                name: None,
                port: 3100,
                target_port: 3100,
            }],
        );
        let yaml = serde_yaml::to_string(&service).unwrap();
        assert!(yaml.contains("type: ClusterIP"));
        assert!(yaml.contains("targetPort: 3100"));
    }

    #[test]
    fn test_binding_references_account_and_role() {
        let account = ServiceAccount::new("alloy", "monitoring");
        let role = ClusterRole::reader("alloy-cluster-reader", "alloy", &["pods", "nodes"]);
        let binding = ClusterRoleBinding::new("alloy-cluster-reader", "alloy", &account, &role);

        assert_eq!(binding.subjects[0].namespace.as_deref(), Some("monitoring"));
        assert_eq!(binding.role_ref.name, "alloy-cluster-reader");
    }
}
