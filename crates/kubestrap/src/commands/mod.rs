pub mod logs;
pub mod restart;
pub mod start;
pub mod status;
pub mod update;
pub mod validate;

use command_executor::{CommandRunner, ExecRunner, SshConfig, SshRunner};
use kubestrap_config::Config;
use kubestrap_core::KubeadmBootstrapper;
use std::sync::Arc;

/// Run locally, or over SSH when the configuration has an `ssh` section
pub fn runner(config: &Config) -> Arc<dyn CommandRunner> {
    let Some(ssh) = &config.ssh else {
        return Arc::new(ExecRunner);
    };

    let mut ssh_config = SshConfig::new(&ssh.host);
    if let Some(user) = &ssh.user {
        ssh_config = ssh_config.with_user(user);
    }
    if let Some(port) = ssh.port {
        ssh_config = ssh_config.with_port(port);
    }
    if let Some(identity) = ssh.identity_file() {
        ssh_config = ssh_config.with_identity_file(identity);
    }
    for arg in &ssh.extra_args {
        ssh_config = ssh_config.with_extra_arg(arg);
    }
    Arc::new(SshRunner::new(ssh_config))
}

pub fn bootstrapper(config: &Config) -> KubeadmBootstrapper {
    KubeadmBootstrapper::from_settings(runner(config), &config.settings)
}
