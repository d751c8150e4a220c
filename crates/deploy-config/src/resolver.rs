//! Per-service environment resolution.
//!
//! Concatenation order is fixed: the `global` section first (only for
//! services flagged as global consumers), then the service's own section.
//! A key present in both keeps its first (global) position but takes the
//! service-own value.

use crate::EnvTable;
use deploy_registry::ServiceDecl;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single name/value pair destined for a container's environment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Variable value, treated as an opaque string
    pub value: String,
}

/// Resolve the ordered environment for one service.
///
/// A service with no applicable section at all yields an empty list; that
/// is worth a warning but never stops a deployment.
pub fn resolve_env(service: &ServiceDecl<'_>, table: &EnvTable) -> Vec<EnvVar> {
    let mut merged: IndexMap<String, String> = IndexMap::new();

    if service.global_env() {
        for (key, value) in &table.global {
            merged.insert(key.clone(), value.clone());
        }
    }

    if let Some(section) = table.section(service.name()) {
        for (key, value) in section {
            merged.insert(key.clone(), value.clone());
        }
    }

    if merged.is_empty() {
        warn!(
            "No environment defined for service '{}'; deploying without injected variables",
            service.name()
        );
    }

    merged
        .into_iter()
        .map(|(name, value)| EnvVar { name, value })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;
    use deploy_registry::AppService;
    use std::path::PathBuf;

    fn app(name: &str, global_env: bool) -> AppService {
        AppService {
            name: name.to_string(),
            build_context: PathBuf::from("services").join(name),
            image: name.to_string(),
            ports: vec![8080],
            namespace: "apps".to_string(),
            global_env,
        }
    }

    #[test]
    fn test_global_section_comes_first() {
        let table = parse_str("global:\n  B: \"2\"\nx:\n  A: \"1\"\n").unwrap();
        let service = app("x", true);

        let env = resolve_env(&ServiceDecl::App(&service), &table);
        assert_eq!(
            env,
            vec![
                EnvVar {
                    name: "B".to_string(),
                    value: "2".to_string()
                },
                EnvVar {
                    name: "A".to_string(),
                    value: "1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_non_consumer_skips_global() {
        let table = parse_str("global:\n  B: \"2\"\nx:\n  A: \"1\"\n").unwrap();
        let service = app("x", false);

        let env = resolve_env(&ServiceDecl::App(&service), &table);
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].name, "A");
    }

    #[test]
    fn test_own_value_wins_keeping_global_position() {
        let table = parse_str(
            "global:\n  SHARED: \"from-global\"\n  OTHER: \"o\"\nx:\n  SHARED: \"from-service\"\n",
        )
        .unwrap();
        let service = app("x", true);

        let env = resolve_env(&ServiceDecl::App(&service), &table);
        assert_eq!(env[0].name, "SHARED");
        assert_eq!(env[0].value, "from-service");
        assert_eq!(env[1].name, "OTHER");
    }

    #[test]
    fn test_missing_sections_yield_empty_env() {
        let table = parse_str("other:\n  A: \"1\"\n").unwrap();
        let service = app("x", false);

        let env = resolve_env(&ServiceDecl::App(&service), &table);
        assert!(env.is_empty());
    }
}
