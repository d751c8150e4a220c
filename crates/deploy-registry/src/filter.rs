//! Include/exclude selection of services for a run.

use crate::{RegistryError, Result};

/// Decides which catalog services participate in the current run.
///
/// Built from the two mutually exclusive selector flags. Matching is
/// whole-name: a service participates only when its full name appears as a
/// token in the list, so `--only api` never drags in `api-gateway`.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionFilter {
    /// No selector given; every service participates
    All,
    /// Only the listed services participate
    Only(Vec<String>),
    /// Every service except the listed ones participates
    Exclude(Vec<String>),
}

impl SelectionFilter {
    /// Build a filter from the raw selector flags.
    ///
    /// Giving both lists is a structural error and is reported before any
    /// side effect happens.
    pub fn from_flags(only: Option<String>, exclude: Option<String>) -> Result<Self> {
        match (only, exclude) {
            (Some(_), Some(_)) => Err(RegistryError::ConflictingSelectors),
            (Some(list), None) => Ok(SelectionFilter::Only(parse_list(&list))),
            (None, Some(list)) => Ok(SelectionFilter::Exclude(parse_list(&list))),
            (None, None) => Ok(SelectionFilter::All),
        }
    }

    /// Convenience constructor for an include list
    pub fn only(list: String) -> Result<Self> {
        Self::from_flags(Some(list), None)
    }

    /// Convenience constructor for an exclude list
    pub fn exclude(list: String) -> Result<Self> {
        Self::from_flags(None, Some(list))
    }

    /// Whether the named service participates in this run
    pub fn matches(&self, name: &str) -> bool {
        match self {
            SelectionFilter::All => true,
            SelectionFilter::Only(names) => names.iter().any(|n| n == name),
            SelectionFilter::Exclude(names) => !names.iter().any(|n| n == name),
        }
    }
}

fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter_matches_everything() {
        let filter = SelectionFilter::from_flags(None, None).unwrap();
        assert_eq!(filter, SelectionFilter::All);
        assert!(filter.matches("prometheus"));
    }

    #[test]
    fn test_conflicting_selectors_rejected() {
        let result = SelectionFilter::from_flags(Some("a".into()), Some("b".into()));
        assert!(matches!(result, Err(RegistryError::ConflictingSelectors)));
    }

    #[test]
    fn test_only_matches_whole_names() {
        let filter = SelectionFilter::only("a,b".to_string()).unwrap();
        assert!(filter.matches("a"));
        assert!(filter.matches("b"));
        // "ab" contains "a" as a substring but is not a listed token
        assert!(!filter.matches("ab"));
        assert!(!filter.matches("c"));
    }

    #[test]
    fn test_exclude_inverts_matching() {
        let filter = SelectionFilter::exclude("grafana, loki".to_string()).unwrap();
        assert!(!filter.matches("grafana"));
        assert!(!filter.matches("loki"));
        assert!(filter.matches("grafana-agent"));
        assert!(filter.matches("prometheus"));
    }

    #[test]
    fn test_empty_tokens_are_ignored() {
        let filter = SelectionFilter::only("a,,b,".to_string()).unwrap();
        assert_eq!(
            filter,
            SelectionFilter::Only(vec!["a".to_string(), "b".to_string()])
        );
    }
}
