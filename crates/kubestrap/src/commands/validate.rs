use anyhow::Result;
use kubestrap_config::Config;
use kubestrap_core::ResolvedVersion;
use std::path::Path;

pub fn run(config_path: &Path, config: &Config) -> Result<()> {
    println!("Validating {}...", config_path.display());

    // Structural validation already happened while parsing
    let version = ResolvedVersion::parse(&config.cluster.kubernetes_version)?;
    kubestrap_core::generate_artifacts(&config.cluster)?;

    println!("✓ Configuration valid");
    println!("  Node: {} ({})", config.cluster.node_name, config.cluster.node_ip);
    println!("  Kubernetes: {} (config schema {:?}, phases {:?})", version, version.schema(), version.phases());
    match &config.ssh {
        Some(ssh) => println!("  Target: ssh {}", ssh.host),
        None => println!("  Target: local"),
    }
    if !config.cluster.extra_options.is_empty() {
        println!("  Extra options: {}", config.cluster.extra_options.len());
    }

    Ok(())
}
