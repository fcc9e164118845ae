use anyhow::Result;
use lando_dock_core::shim;

use super::shim::print_install_report;
use super::user_error;
use crate::workspace::Workspace;

pub fn intercept_enable_command(workspace: &Workspace) -> Result<()> {
    let mut session = workspace.open_session()?;

    let binary = workspace.settings.resolve_binary();
    let report = shim::install(session.interceptor().shim_dir(), &binary.to_string_lossy())
        .map_err(user_error)?;
    print_install_report(&report);

    let enabled = session.enable_interception();
    workspace.save(&session)?;
    enabled.map_err(user_error)?;

    if let Some(app) = session.interceptor().target() {
        println!("🐘 php in new terminals now runs inside '{app}'");
    }
    println!("   Open a new integrated terminal to pick up the change");
    Ok(())
}

pub fn intercept_disable_command(workspace: &Workspace) -> Result<()> {
    let mut session = workspace.open_session()?;

    let disabled = session.disable_interception();
    workspace.save(&session)?;

    if disabled.map_err(user_error)? {
        println!("✅ Terminal interception removed");
    } else {
        println!("ℹ️  Terminal interception was not enabled");
    }
    Ok(())
}

pub fn intercept_status_command(workspace: &Workspace) -> Result<()> {
    let session = workspace.open_session()?;
    let interceptor = session.interceptor();

    match interceptor.target() {
        Some(app) => println!("🐘 Intercepting php for '{app}'"),
        None => println!("⚪ Terminal interception is off"),
    }
    println!("   Shim directory: {}", interceptor.shim_dir().display());
    println!(
        "   Settings file: {}",
        interceptor.store().path().display()
    );
    workspace.save(&session)
}
