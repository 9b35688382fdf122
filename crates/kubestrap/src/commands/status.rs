use anyhow::{Context, Result};
use comfy_table::{Cell, Color, Table};
use kubestrap_config::Config;
use kubestrap_core::LifecycleState;

pub async fn run(config: &Config) -> Result<()> {
    let bootstrapper = super::bootstrapper(config);

    let kubelet = bootstrapper
        .kubelet_status()
        .await
        .context("Failed to get kubelet status")?;
    let apiserver = bootstrapper
        .apiserver_status(&config.cluster)
        .await
        .context("Failed to get API server status")?;

    let mut table = Table::new();
    table.set_header(vec!["COMPONENT", "STATUS"]);
    for (component, state) in [("kubelet", kubelet), ("apiserver", apiserver)] {
        table.add_row(vec![
            Cell::new(component),
            Cell::new(state).fg(state_color(state)),
        ]);
    }

    println!("{}", table);
    Ok(())
}

fn state_color(state: LifecycleState) -> Color {
    match state {
        LifecycleState::Running => Color::Green,
        LifecycleState::Starting => Color::Yellow,
        LifecycleState::Stopped => Color::DarkGrey,
        LifecycleState::Error => Color::Red,
    }
}
