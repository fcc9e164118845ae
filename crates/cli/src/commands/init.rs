use anyhow::{Context, Result};
use lando_dock_core::Settings;
use lando_dock_core::config::SETTINGS_FILE_NAME;
use std::{env, path::Path};
use tracing::info;

use super::user_error;

pub fn init_command(root: Option<&Path>, force: bool) -> Result<()> {
    let root = match root {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("Failed to get current directory")?,
    };
    let root = root
        .canonicalize()
        .context("Failed to canonicalize workspace root")?;

    let settings_path = root.join(SETTINGS_FILE_NAME);
    if settings_path.exists() && !force {
        println!("❌ Settings already exist at: {}", settings_path.display());
        println!("   Use --force to overwrite");
        return Ok(());
    }

    Settings::default()
        .save_to_file(&settings_path)
        .map_err(user_error)?;
    info!("Wrote default settings to {:?}", settings_path);

    println!("✅ Created settings: {}", settings_path.display());
    println!("\n📝 Next steps:");
    println!("   lando-dock apps              # list discovered apps");
    println!("   lando-dock select <name>     # choose the active app");
    println!("   lando-dock intercept enable  # run php inside the container");
    Ok(())
}
