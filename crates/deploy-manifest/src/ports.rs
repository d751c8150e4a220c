//! Port naming.
//!
//! Multi-port workloads must name every port or the cluster rejects the
//! object. Names come from a fixed positional table, overridden by a small
//! set of well-known exceptions (the OTLP port is always `otlp`, and 9090
//! means different things on different services).

use crate::{Result, SynthesisError};

/// Positional names handed out to otherwise anonymous ports, in order.
/// Sized to the largest port list in the catalog; going past the end is a
/// synthesis error, not a silently unnamed port.
const POSITIONAL_NAMES: &[&str] = &[
    "http", "grpc", "metrics", "otlp", "admin", "api", "debug", "gateway",
];

/// A fixed name for a well-known port, optionally scoped to one service
#[derive(Debug, Clone)]
struct NameException {
    port: u16,
    service: Option<&'static str>,
    name: &'static str,
}

/// Assigns names to the ports of a service
#[derive(Debug, Clone)]
pub struct PortNamingTable {
    positional: &'static [&'static str],
    exceptions: Vec<NameException>,
}

impl PortNamingTable {
    /// The standard table used by the deployer
    pub fn standard() -> Self {
        Self {
            positional: POSITIONAL_NAMES,
            exceptions: vec![
                // OTLP ingest keeps its conventional name everywhere
                NameException {
                    port: 4317,
                    service: None,
                    name: "otlp",
                },
                NameException {
                    port: 9090,
                    service: Some("operational-api"),
                    name: "grpc-api",
                },
                NameException {
                    port: 9090,
                    service: Some("prometheus"),
                    name: "metrics",
                },
            ],
        }
    }

    /// Name every port of a service.
    ///
    /// A single-port service gets no name (`[None]`); a multi-port service
    /// gets one distinct name per port. Exceptions are applied first, then
    /// the remaining ports take positional names in declaration order,
    /// skipping names an exception already claimed.
    pub fn name_ports(&self, service: &str, ports: &[u16]) -> Result<Vec<Option<String>>> {
        if ports.len() <= 1 {
            return Ok(vec![None; ports.len()]);
        }

        let mut names: Vec<Option<String>> = vec![None; ports.len()];
        let mut used: Vec<&str> = Vec::new();

        for (idx, port) in ports.iter().enumerate() {
            if let Some(name) = self.exception_for(service, *port) {
                names[idx] = Some(name.to_string());
                used.push(name);
            }
        }

        // names actually available to this service: its exception-named
        // ports plus whatever positional names the exceptions left unclaimed
        let available: Vec<&&str> = self
            .positional
            .iter()
            .filter(|candidate| !used.contains(*candidate))
            .collect();
        let capacity = used.len() + available.len();

        let mut positional = available.into_iter();
        for name in names.iter_mut() {
            if name.is_none() {
                match positional.next() {
                    Some(candidate) => *name = Some((*candidate).to_string()),
                    None => {
                        return Err(SynthesisError::PortNamesExhausted {
                            service: service.to_string(),
                            count: ports.len(),
                            capacity,
                        });
                    }
                }
            }
        }

        Ok(names)
    }

    fn exception_for(&self, service: &str, port: u16) -> Option<&'static str> {
        self.exceptions
            .iter()
            .find(|e| e.port == port && e.service.is_none_or(|s| s == service))
            .map(|e| e.name)
    }
}

impl Default for PortNamingTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_port_gets_no_name() {
        let table = PortNamingTable::standard();
        let names = table.name_ports("ztac-engine", &[8081]).unwrap();
        assert_eq!(names, vec![None]);
    }

    #[test]
    fn test_multi_port_names_are_distinct_and_complete() {
        let table = PortNamingTable::standard();
        let names = table
            .name_ports("operational-api", &[8080, 9090, 4317])
            .unwrap();

        let named: Vec<_> = names.iter().map(|n| n.as_deref().unwrap()).collect();
        assert_eq!(named, vec!["http", "grpc-api", "otlp"]);

        let mut dedup = named.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), named.len());
    }

    #[test]
    fn test_otlp_exception_applies_regardless_of_position() {
        let table = PortNamingTable::standard();
        let names = table.name_ports("collector", &[4317, 8080]).unwrap();
        assert_eq!(names[0].as_deref(), Some("otlp"));
        // positional "otlp" is skipped because the exception claimed it
        assert_eq!(names[1].as_deref(), Some("http"));
    }

    #[test]
    fn test_service_scoped_exception() {
        let table = PortNamingTable::standard();
        let prom = table.name_ports("prometheus", &[9090, 8080]).unwrap();
        assert_eq!(prom[0].as_deref(), Some("metrics"));

        let other = table.name_ports("something-else", &[9090, 8080]).unwrap();
        assert_eq!(other[0].as_deref(), Some("http"));
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let table = PortNamingTable::standard();
        let ports: Vec<u16> = (8000..8012).collect();
        let result = table.name_ports("port-hog", &ports);
        assert!(matches!(
            result,
            Err(SynthesisError::PortNamesExhausted {
                count: 12,
                capacity: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_exhaustion_capacity_counts_what_was_actually_available() {
        let table = PortNamingTable::standard();
        // 9090 takes the "metrics" exception on prometheus, leaving seven
        // positional names for the other nine ports
        let mut ports = vec![9090];
        ports.extend(8000..8009);
        let result = table.name_ports("prometheus", &ports);
        assert!(matches!(
            result,
            Err(SynthesisError::PortNamesExhausted {
                count: 10,
                capacity: 8,
                ..
            })
        ));
    }
}
