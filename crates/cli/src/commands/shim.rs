use anyhow::Result;
use lando_dock_core::shim::{self, InstallReport};
use std::path::Path;

use super::user_error;
use crate::workspace::Workspace;

pub fn shim_install_command(workspace: &Workspace, dir: Option<&Path>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => workspace
            .settings
            .intercept
            .shim_dir
            .clone()
            .unwrap_or_else(|| shim::default_shim_dir(&workspace.root)),
    };

    let binary = workspace.settings.resolve_binary();
    let report = shim::install(&dir, &binary.to_string_lossy()).map_err(user_error)?;
    print_install_report(&report);
    Ok(())
}

pub(crate) fn print_install_report(report: &InstallReport) {
    for path in &report.written {
        println!("✅ Installed {}", path.display());
    }
    for path in &report.unchanged {
        println!("   {} is up to date", path.display());
    }
}
