//! # Protected Label Domains
//!
//! The platform reserves some label domains (for example `kubernetes.io`) for
//! its own control plane. A NamespaceLabel may not set keys in those domains.

use crate::crd::Labels;

/// Set of protected label domain suffixes
///
/// A label key has the form `domain/name` or is bare (`name`, no domain).
/// A key is protected when its domain ends with any configured suffix.
/// An empty set protects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedDomains {
    suffixes: Vec<String>,
}

impl ProtectedDomains {
    /// Parse a comma-separated suffix list
    ///
    /// Entries are trimmed and empty entries dropped, so `""`, `" "` and `","`
    /// all yield an empty policy.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    #[must_use]
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Return the protected suffix the key falls under, if any
    #[must_use]
    pub fn matching(&self, key: &str) -> Option<&str> {
        let domain = label_domain(key)?;
        self.suffixes
            .iter()
            .find(|suffix| domain.ends_with(suffix.as_str()))
            .map(String::as_str)
    }

    /// First protected key in `labels`, checked in key order
    #[must_use]
    pub fn first_violation<'a>(&'a self, labels: &'a Labels) -> Option<(&'a str, &'a str)> {
        if self.is_empty() {
            return None;
        }
        labels
            .keys()
            .find_map(|key| self.matching(key).map(|suffix| (key.as_str(), suffix)))
    }
}

/// Domain component of a label key, `None` for bare keys
#[must_use]
pub fn label_domain(key: &str) -> Option<&str> {
    key.split_once('/').map(|(domain, _)| domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_drops_empty_entries() {
        let domains = ProtectedDomains::parse(" kubernetes.io, ,k8s.io,");
        assert_eq!(domains.suffixes(), ["kubernetes.io", "k8s.io"]);
    }

    #[test]
    fn test_empty_configuration_protects_nothing() {
        for raw in ["", " ", ",", " , "] {
            let domains = ProtectedDomains::parse(raw);
            assert!(domains.is_empty(), "'{raw}' should disable the check");
            assert_eq!(domains.matching("kubernetes.io/x"), None);
        }
    }

    #[test]
    fn test_domain_suffix_match() {
        let domains = ProtectedDomains::parse("kubernetes.io");
        assert_eq!(domains.matching("kubernetes.io/x"), Some("kubernetes.io"));
        assert_eq!(
            domains.matching("node.kubernetes.io/role"),
            Some("kubernetes.io")
        );
        assert_eq!(domains.matching("example.com/kubernetes.io"), None);
        assert_eq!(domains.matching("kubernetes.io.example.com/x"), None);
    }

    #[test]
    fn test_bare_keys_have_no_domain() {
        let domains = ProtectedDomains::parse("kubernetes.io");
        assert_eq!(label_domain("team"), None);
        assert_eq!(domains.matching("team"), None);
        assert_eq!(domains.matching("kubernetes.io"), None);
    }

    #[test]
    fn test_first_violation_is_deterministic() {
        let domains = ProtectedDomains::parse("kubernetes.io,k8s.io");
        let labels: Labels = [
            ("team".to_string(), "a".to_string()),
            ("z.k8s.io/x".to_string(), "1".to_string()),
            ("a.kubernetes.io/y".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            domains.first_violation(&labels),
            Some(("a.kubernetes.io/y", "kubernetes.io"))
        );
    }
}
