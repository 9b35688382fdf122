//! Bridge CNI configuration used when no network add-on is installed

use super::{ArtifactKind, RenderedArtifact};
use crate::constants::{DEFAULT_CNI_CONFIG_PATH, DEFAULT_RKT_NET_CONFIG_PATH};
use crate::error::{Error, Result};
use serde_json::json;

/// The same bridge network, once for CNI and once for rkt
pub fn default_cni_config() -> Result<Vec<RenderedArtifact>> {
    let config = json!({
        "cniVersion": "0.3.0",
        "name": "rkt.kubernetes.io",
        "type": "bridge",
        "bridge": "mybridge",
        "mtu": 1460,
        "addIf": "true",
        "isGateway": true,
        "ipMasq": true,
        "ipam": {
            "type": "host-local",
            "subnet": "10.1.0.0/16",
            "gateway": "10.1.0.1",
            "routes": [{ "dst": "0.0.0.0/0" }]
        }
    });
    let mut contents = serde_json::to_string_pretty(&config).map_err(|e| Error::TemplateRender {
        artifact: ArtifactKind::CniDefault,
        reason: e.to_string(),
    })?;
    contents.push('\n');

    Ok([DEFAULT_CNI_CONFIG_PATH, DEFAULT_RKT_NET_CONFIG_PATH]
        .into_iter()
        .map(|path| RenderedArtifact::new(ArtifactKind::CniDefault, path, contents.clone(), "0644"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_network() {
        let artifacts = default_cni_config().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&artifacts[0].contents).unwrap();
        assert_eq!(parsed["type"], "bridge");
        assert_eq!(parsed["ipam"]["subnet"], "10.1.0.0/16");
    }
}
