use anyhow::{Context, Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};

use super::user_error;
use crate::display::{print_app_details, print_apps};
use crate::workspace::Workspace;

pub fn apps_command(workspace: &Workspace, json: bool, verbose: bool) -> Result<()> {
    let session = workspace.open_session()?;
    let apps = session.apps();

    if json {
        println!("{}", serde_json::to_string_pretty(&apps)?);
    } else if verbose {
        for app in &apps {
            print_app_details(app);
        }
    } else {
        print_apps(&apps, session.active());
    }

    workspace.save(&session)
}

/// Select by name, or pick interactively when no name is given.
pub fn select_command(workspace: &Workspace, name: Option<&str>) -> Result<()> {
    let mut session = workspace.open_session()?;

    let name = match name {
        Some(name) => name.to_string(),
        None => {
            let names: Vec<String> = session.apps().iter().map(|app| app.name.clone()).collect();
            if names.is_empty() {
                bail!("No Lando apps found in {}", workspace.root.display());
            }
            let current = session
                .active()
                .and_then(|active| names.iter().position(|n| *n == active.name))
                .unwrap_or(0);
            let choice = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Select a Lando app")
                .items(&names)
                .default(current)
                .interact()
                .context("No app selected")?;
            names[choice].clone()
        }
    };

    let selected = session.select_app(&name);
    // an unknown name clears the selection, which is worth persisting too
    workspace.save(&session)?;
    selected.map_err(user_error)?;

    println!("✅ Active app: {name}");
    Ok(())
}
