use anyhow::{Context, Result};
use kubestrap_config::Config;

pub async fn run(config: &Config) -> Result<()> {
    println!("Updating cluster to {}...", config.cluster.kubernetes_version);
    super::bootstrapper(config)
        .update_cluster(&config.cluster)
        .await
        .context("Failed to update cluster")?;

    println!("✓ Cluster updated");
    Ok(())
}
