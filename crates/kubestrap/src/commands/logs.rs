use anyhow::{Context, Result};
use kubestrap_config::Config;

pub async fn run(config: &Config, follow: bool) -> Result<()> {
    let mut stdout = futures::io::AllowStdIo::new(std::io::stdout());
    super::bootstrapper(config)
        .cluster_logs_to(follow, &mut stdout)
        .await
        .context("Failed to get cluster logs")
}
