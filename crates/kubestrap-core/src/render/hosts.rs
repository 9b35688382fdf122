//! `/etc/hosts` for the node

use super::{ArtifactKind, RenderedArtifact};
use crate::constants::ETC_HOSTS;
use crate::error::{Error, Result};
use kubestrap_config::ClusterConfig;

/// Resolve the node's own name before cluster DNS is up
pub fn hosts_file(cfg: &ClusterConfig) -> Result<RenderedArtifact> {
    if cfg.node_name.is_empty() || cfg.node_ip.is_empty() {
        return Err(Error::TemplateRender {
            artifact: ArtifactKind::HostsFile,
            reason: "node name and address are required".to_string(),
        });
    }

    let contents = format!(
        "127.0.0.1\tlocalhost\n\
         ::1\tlocalhost ip6-localhost ip6-loopback\n\
         {ip}\t{name}\n",
        ip = cfg.node_ip,
        name = cfg.node_name,
    );
    Ok(RenderedArtifact::new(ArtifactKind::HostsFile, ETC_HOSTS, contents, "0644"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_entries() {
        let cfg = ClusterConfig {
            node_name: "kubestrap".to_string(),
            node_ip: "192.168.39.10".to_string(),
            ..Default::default()
        };
        let hosts = hosts_file(&cfg).unwrap();
        assert_eq!(
            hosts.contents,
            "127.0.0.1\tlocalhost\n::1\tlocalhost ip6-localhost ip6-loopback\n192.168.39.10\tkubestrap\n"
        );
    }
}
