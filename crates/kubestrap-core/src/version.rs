//! Kubernetes release parsing and version-gated capabilities
//!
//! kubeadm's command line and configuration schema changed incompatibly
//! across releases. Every threshold lives here; the rest of the crate reads
//! the derived flags on [`ResolvedVersion`] instead of comparing versions.

use crate::error::{Error, Result};
use semver::{Prerelease, Version};
use std::fmt;

/// Releases at or above this use the v1alpha3 bootstrap schema
pub const SCHEMA_V1ALPHA3_SINCE: Version = Version::new(1, 12, 0);

/// Releases at or above this use `kubeadm init phase ...`
pub const INIT_PHASES_SINCE: Version = Version::new(1, 13, 0);

/// First pre-release of `major.minor`, e.g. `1.10.0-alpha.0`
pub fn first_alpha(major: u64, minor: u64) -> Version {
    Version {
        pre: Prerelease::new("alpha.0").unwrap_or(Prerelease::EMPTY),
        ..Version::new(major, minor, 0)
    }
}

/// Releases at or above this suppress the master taint through the bootstrap config
pub fn no_taint_master_since() -> Version {
    first_alpha(1, 10)
}

/// Releases at or above this skip the noisy preflight checks
pub fn skip_preflight_since() -> Version {
    first_alpha(1, 9)
}

/// Parse a release string such as `v1.12.3` or `1.12.3`
pub fn parse_kubernetes_version(version: &str) -> Result<Version> {
    let trimmed = version.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).map_err(|source| Error::InvalidVersion {
        version: version.to_string(),
        source,
    })
}

/// Whether `low <= version < high`, with `None` leaving that side unbounded
pub fn is_between(version: &Version, low: Option<&Version>, high: Option<&Version>) -> bool {
    low.is_none_or(|low| version >= low) && high.is_none_or(|high| version < high)
}

/// Bootstrap configuration schema understood by a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSchema {
    /// `MasterConfiguration`, before 1.12
    V1Alpha1,
    /// `InitConfiguration` + `ClusterConfiguration`, from 1.12
    V1Alpha3,
}

impl ConfigSchema {
    /// The `apiVersion` written into the document
    pub fn api_version(&self) -> &'static str {
        match self {
            ConfigSchema::V1Alpha1 => "kubeadm.k8s.io/v1alpha1",
            ConfigSchema::V1Alpha3 => "kubeadm.k8s.io/v1alpha3",
        }
    }
}

/// Phase subcommand naming used by a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseVocabulary {
    /// `kubeadm alpha phase ... controlplane`
    Alpha,
    /// `kubeadm init phase ... control-plane`
    Init,
}

impl PhaseVocabulary {
    /// The subcommand that owns `phase`
    pub fn prefix(&self) -> &'static str {
        match self {
            PhaseVocabulary::Alpha => "alpha",
            PhaseVocabulary::Init => "init",
        }
    }

    /// Name of the static pod phase for the control plane
    pub fn control_plane(&self) -> &'static str {
        match self {
            PhaseVocabulary::Alpha => "controlplane",
            PhaseVocabulary::Init => "control-plane",
        }
    }
}

/// A parsed release together with everything derived from it
///
/// Computed fresh for every operation; nothing here is cached between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    version: Version,
    schema: ConfigSchema,
    phases: PhaseVocabulary,
    no_taint_master: bool,
    skip_preflight_checks: bool,
}

impl ResolvedVersion {
    /// Parse and derive; malformed input fails with [`Error::InvalidVersion`]
    pub fn parse(version: &str) -> Result<Self> {
        Ok(Self::from_version(parse_kubernetes_version(version)?))
    }

    /// Derive capabilities for an already parsed version
    pub fn from_version(version: Version) -> Self {
        let schema = if version >= SCHEMA_V1ALPHA3_SINCE {
            ConfigSchema::V1Alpha3
        } else {
            ConfigSchema::V1Alpha1
        };
        let phases = if version >= INIT_PHASES_SINCE {
            PhaseVocabulary::Init
        } else {
            PhaseVocabulary::Alpha
        };

        Self {
            no_taint_master: version >= no_taint_master_since(),
            skip_preflight_checks: is_between(&version, Some(&skip_preflight_since()), None),
            schema,
            phases,
            version,
        }
    }

    /// The normalized semantic version
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Release tag with the `v` prefix, as used in URLs and cache paths
    pub fn release_tag(&self) -> String {
        format!("v{}", self.version)
    }

    /// Bootstrap configuration schema
    pub fn schema(&self) -> ConfigSchema {
        self.schema
    }

    /// Phase command vocabulary
    pub fn phases(&self) -> PhaseVocabulary {
        self.phases
    }

    /// Whether the bootstrap config itself keeps the master untainted
    pub fn no_taint_master(&self) -> bool {
        self.no_taint_master
    }

    /// Whether the master taint must be removed by hand after `kubeadm init`
    pub fn needs_master_unmark(&self) -> bool {
        !self.no_taint_master
    }

    /// Whether `kubeadm init` ignores the known-noisy preflight checks
    pub fn skip_preflight_checks(&self) -> bool {
        self.skip_preflight_checks
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_optional() {
        assert_eq!(parse_kubernetes_version("v1.12.3").unwrap(), Version::new(1, 12, 3));
        assert_eq!(parse_kubernetes_version("1.12.3").unwrap(), Version::new(1, 12, 3));
    }

    #[test]
    fn test_malformed_versions_fail() {
        for input in ["", "v", "1.12", "latest", "vv1.12.0", "1.12.x"] {
            let err = ResolvedVersion::parse(input).unwrap_err();
            assert!(matches!(err, Error::InvalidVersion { .. }), "{input:?} gave {err}");
        }
    }

    #[test]
    fn test_thresholds_are_pre_releases() {
        assert_eq!(no_taint_master_since().to_string(), "1.10.0-alpha.0");
        assert_eq!(skip_preflight_since().to_string(), "1.9.0-alpha.0");
    }

    #[test]
    fn test_is_between_is_half_open() {
        let low = Version::new(1, 9, 0);
        let high = Version::new(1, 11, 0);
        assert!(is_between(&Version::new(1, 9, 0), Some(&low), Some(&high)));
        assert!(is_between(&Version::new(1, 10, 7), Some(&low), Some(&high)));
        assert!(!is_between(&Version::new(1, 11, 0), Some(&low), Some(&high)));
        assert!(!is_between(&Version::new(1, 8, 15), Some(&low), Some(&high)));
        assert!(is_between(&Version::new(0, 1, 0), None, None));
    }

    #[test]
    fn test_pre_releases_sort_before_release() {
        let beta = ResolvedVersion::parse("v1.12.0-beta.1").unwrap();
        assert_eq!(beta.schema(), ConfigSchema::V1Alpha1);

        let alpha = ResolvedVersion::parse("v1.10.0-alpha.1").unwrap();
        assert!(alpha.no_taint_master());
        assert!(ResolvedVersion::parse("v1.9.11").unwrap().needs_master_unmark());
    }

    #[test]
    fn test_release_tag() {
        let version = ResolvedVersion::parse("1.13.0").unwrap();
        assert_eq!(version.release_tag(), "v1.13.0");
        assert_eq!(version.to_string(), "v1.13.0");
    }
}
