//! Properties of the version resolver across release ranges

use kubestrap_core::version::{ConfigSchema, PhaseVocabulary, is_between, parse_kubernetes_version};
use kubestrap_core::{Error, ResolvedVersion};
use semver::Version;

const RELEASES: &[&str] = &[
    "1.7.5",
    "1.8.0",
    "1.9.0-alpha.0",
    "1.9.0-beta.2",
    "1.9.11",
    "1.10.0-alpha.0",
    "1.10.0",
    "1.11.10",
    "1.12.0-rc.1",
    "1.12.0",
    "1.12.10",
    "1.13.0-alpha.3",
    "1.13.0",
    "1.14.0",
    "1.20.2",
];

fn resolved() -> Vec<ResolvedVersion> {
    RELEASES
        .iter()
        .map(|v| ResolvedVersion::parse(v).unwrap())
        .collect()
}

/// Once a capability switches on it stays on for every later release
fn assert_monotonic(name: &str, flags: impl Iterator<Item = bool>) {
    let flags: Vec<bool> = flags.collect();
    let first_on = flags.iter().position(|f| *f).unwrap_or(flags.len());
    assert!(
        flags[first_on..].iter().all(|f| *f),
        "{name} flips back off: {flags:?}"
    );
}

#[test]
fn test_release_list_is_sorted() {
    let versions: Vec<Version> = resolved().iter().map(|v| v.version().clone()).collect();
    assert!(versions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_capabilities_are_monotonic() {
    let versions = resolved();
    assert_monotonic("schema", versions.iter().map(|v| v.schema() == ConfigSchema::V1Alpha3));
    assert_monotonic("phases", versions.iter().map(|v| v.phases() == PhaseVocabulary::Init));
    assert_monotonic("no taint master", versions.iter().map(|v| v.no_taint_master()));
    assert_monotonic("skip preflight", versions.iter().map(|v| v.skip_preflight_checks()));
}

#[test]
fn test_thresholds() {
    let at = |v: &str| ResolvedVersion::parse(v).unwrap();

    assert_eq!(at("1.11.10").schema(), ConfigSchema::V1Alpha1);
    assert_eq!(at("1.12.0-rc.1").schema(), ConfigSchema::V1Alpha1);
    assert_eq!(at("1.12.0").schema(), ConfigSchema::V1Alpha3);

    assert_eq!(at("1.13.0-alpha.3").phases(), PhaseVocabulary::Alpha);
    assert_eq!(at("1.13.0").phases(), PhaseVocabulary::Init);

    assert!(at("1.9.11").needs_master_unmark());
    assert!(at("1.10.0-alpha.0").no_taint_master());

    assert!(!at("1.8.0").skip_preflight_checks());
    assert!(at("1.9.0-alpha.0").skip_preflight_checks());
}

#[test]
fn test_parse_is_total() {
    for input in ["v1.13.0", "1.13.0", "garbage", "v1", "", "1.13.0.0", " v1.12.3 "] {
        match ResolvedVersion::parse(input) {
            Ok(resolved) => {
                assert_eq!(resolved.version(), &parse_kubernetes_version(input).unwrap());
                assert_eq!(resolved, ResolvedVersion::parse(input).unwrap());
            }
            Err(Error::InvalidVersion { version, .. }) => assert_eq!(version, input),
            Err(other) => panic!("unexpected error for {input:?}: {other}"),
        }
    }
}

#[test]
fn test_is_between_unbounded_sides() {
    let v = Version::new(1, 10, 0);
    assert!(is_between(&v, None, Some(&Version::new(1, 11, 0))));
    assert!(is_between(&v, Some(&Version::new(1, 10, 0)), None));
    assert!(!is_between(&v, None, Some(&Version::new(1, 10, 0))));
}
