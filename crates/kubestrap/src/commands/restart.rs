use anyhow::{Context, Result};
use kubestrap_config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let bootstrapper = super::bootstrapper(config);

    println!("Restarting cluster {}...", config.cluster.node_name);
    bootstrapper
        .update_cluster(&config.cluster)
        .await
        .context("Failed to update cluster")?;
    bootstrapper
        .restart_cluster(&config.cluster)
        .await
        .context("Failed to restart cluster")?;

    println!("✓ Cluster restarted");
    Ok(())
}
