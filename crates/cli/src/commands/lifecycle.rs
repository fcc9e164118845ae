use anyhow::Result;
use dialoguer::{Confirm, theme::ColorfulTheme};
use lando_dock_core::{LifecycleOperation, PowerOffOutcome};
use tracing::info;

use super::user_error;
use crate::display::status_icon;
use crate::lock::OperationLock;
use crate::workspace::Workspace;

fn confirm(prompt: String) -> bool {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

pub fn lifecycle_command(
    workspace: &Workspace,
    operation: LifecycleOperation,
    app: Option<&str>,
    yes: bool,
) -> Result<()> {
    let mut session = workspace.open_session()?;

    let name = match app {
        Some(name) => name.to_string(),
        None => session
            .active()
            .map(|active| active.name.clone())
            .ok_or_else(|| user_error(lando_dock_core::Error::NoActiveApp))?,
    };

    let destructive = matches!(
        operation,
        LifecycleOperation::Rebuild | LifecycleOperation::Destroy
    );
    if destructive && !yes && !confirm(format!("Really {operation} '{name}'?")) {
        println!("❎ {operation} cancelled");
        return Ok(());
    }

    let target = match app {
        Some(name) => session.registry().find_by_name(name),
        None => session.active(),
    };
    // an unknown app is reported by the lifecycle call itself
    let _lock = match target {
        Some(target) => Some(OperationLock::acquire(&workspace.root, target, operation)?),
        None => None,
    };

    println!("⏳ Running lando {operation} for '{name}'...");
    let outcome = session.lifecycle(operation, app);
    // statuses are saved whether or not the operation succeeded
    workspace.save(&session)?;
    let status = outcome.map_err(user_error)?;

    info!("{} finished for {}", operation, name);
    println!("{} '{name}' is {status}", status_icon(status));
    Ok(())
}

pub fn power_off_command(workspace: &Workspace, yes: bool) -> Result<()> {
    let mut session = workspace.open_session()?;

    let outcome = session.power_off(|| {
        yes || confirm("Stop every Lando app on this machine?".to_string())
    });
    workspace.save(&session)?;

    match outcome.map_err(user_error)? {
        PowerOffOutcome::Cancelled => println!("❎ Power off cancelled"),
        PowerOffOutcome::Completed { stopped } => {
            println!("🔌 Lando powered off");
            for name in stopped {
                println!("   • {name} stopped");
            }
        }
    }
    Ok(())
}
