use anyhow::{Context, Result};
use kubestrap_config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let bootstrapper = super::bootstrapper(config);

    println!("Starting cluster {} ({})...", config.cluster.node_name, config.cluster.kubernetes_version);
    bootstrapper
        .update_cluster(&config.cluster)
        .await
        .context("Failed to update cluster")?;
    bootstrapper
        .start_cluster(&config.cluster)
        .await
        .context("Failed to start cluster")?;

    println!("✓ Cluster started");
    Ok(())
}
