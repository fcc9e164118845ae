use anyhow::Result;
use tracing::debug;

use super::user_error;
use crate::workspace::Workspace;

pub fn run_tooling_command(workspace: &Workspace, tool: &str, args: &[String]) -> Result<()> {
    let session = workspace.open_session()?;
    debug!("Running tooling {} with {:?}", tool, args);

    let output = session.run_tooling(tool, args).map_err(user_error)?;
    if !output.success() {
        std::process::exit(output.status_code);
    }
    Ok(())
}

pub fn ssh_command(workspace: &Workspace, service: Option<&str>) -> Result<()> {
    let session = workspace.open_session()?;

    let output = session.open_terminal(service).map_err(user_error)?;
    if !output.success() {
        std::process::exit(output.status_code);
    }
    Ok(())
}
