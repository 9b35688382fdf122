//! Feature gate parsing

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Gates that kubeadm itself understands
pub const KUBEADM_FEATURE_GATES: [&str; 6] = [
    "CoreDNS",
    "DynamicKubeletConfig",
    "SelfHosting",
    "StoreCertsInSecrets",
    "HighAvailability",
    "Auditing",
];

/// A feature gate string split by consumer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureGates {
    /// Gates written into the bootstrap config's `featureGates`
    pub kubeadm: BTreeMap<String, bool>,
    /// Gates passed to components as `--feature-gates`
    pub components: BTreeMap<String, bool>,
}

impl FeatureGates {
    /// Parse comma separated `Gate=bool` pairs
    pub fn parse(gates: &str) -> Result<Self> {
        let mut parsed = FeatureGates::default();

        for entry in gates.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = |reason: String| Error::FeatureGateParse {
                gates: gates.to_string(),
                reason,
            };
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| invalid(format!("{entry:?} is not of the form Gate=bool")))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(invalid(format!("{entry:?} has no gate name")));
            }
            let enabled = parse_bool(value.trim())
                .ok_or_else(|| invalid(format!("{value:?} is not a boolean for {name}")))?;

            let target = if KUBEADM_FEATURE_GATES.contains(&name) {
                &mut parsed.kubeadm
            } else {
                &mut parsed.components
            };
            target.insert(name.to_string(), enabled);
        }

        Ok(parsed)
    }

    /// Component gates as a `--feature-gates` value, sorted by name
    pub fn component_flag(&self) -> Option<String> {
        if self.components.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .components
            .iter()
            .map(|(name, enabled)| format!("{name}={enabled}"))
            .collect();
        Some(pairs.join(","))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_between_kubeadm_and_components() {
        let gates = FeatureGates::parse("PodPriority=false, CoreDNS=true,Auditing=False,APIResponseCompression=1").unwrap();

        assert_eq!(gates.kubeadm.len(), 2);
        assert!(gates.kubeadm["CoreDNS"]);
        assert!(!gates.kubeadm["Auditing"]);
        assert_eq!(
            gates.component_flag().as_deref(),
            Some("APIResponseCompression=true,PodPriority=false")
        );
    }

    #[test]
    fn test_empty_string_has_no_gates() {
        let gates = FeatureGates::parse("").unwrap();
        assert_eq!(gates, FeatureGates::default());
        assert_eq!(gates.component_flag(), None);
    }

    #[test]
    fn test_malformed_pairs() {
        for input in ["CoreDNS", "CoreDNS=yes", "=true", "A=true,B"] {
            let err = FeatureGates::parse(input).unwrap_err();
            assert!(matches!(err, Error::FeatureGateParse { .. }), "{input:?}");
        }
    }
}
