use anyhow::Result;
use lando_dock_core::ContextFlags;

use crate::display::print_context;
use crate::workspace::Workspace;

pub fn context_command(workspace: &Workspace, json: bool) -> Result<()> {
    let session = workspace.open_session()?;
    let flags = ContextFlags::derive(session.registry());

    if json {
        println!("{}", serde_json::to_string_pretty(&flags)?);
    } else {
        print_context(&flags);
    }
    workspace.save(&session)
}

pub fn docs_command(workspace: &Workspace) -> Result<()> {
    let session = workspace.open_session()?;
    println!("{}", session.documentation_url());
    Ok(())
}
