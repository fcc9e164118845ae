use anyhow::Result;
use clap::{Parser, Subcommand};
use lando_dock_core::LifecycleOperation;
use std::path::PathBuf;

use crate::commands::*;
use crate::workspace::Workspace;

#[derive(Parser, Debug)]
#[command(name = "lando-dock")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    /// Workspace folder (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the Lando apps found in the workspace
    #[command(visible_alias = "ls")]
    Apps {
        /// Print apps as JSON
        #[arg(long)]
        json: bool,

        /// Show services and tooling for each app
        #[arg(short, long)]
        verbose: bool,
    },
    /// Choose the active app (interactive when no name is given)
    Select { name: Option<String> },
    /// Start an app (the active one by default)
    Start { app: Option<String> },
    /// Stop an app
    Stop { app: Option<String> },
    /// Restart an app
    Restart { app: Option<String> },
    /// Rebuild an app's containers
    Rebuild {
        app: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Destroy an app's containers and volumes
    Destroy {
        app: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Stop every Lando app on this machine
    PowerOff {
        #[arg(short, long)]
        yes: bool,
    },
    /// Run a tooling command of the active app
    #[command(visible_alias = "r")]
    Run {
        tool: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Open a shell in one of the active app's services
    Ssh {
        #[arg(short, long)]
        service: Option<String>,
    },
    /// Print the documentation link for the active app's recipe
    Docs,
    /// Run php from integrated terminals inside the active app
    Intercept {
        #[command(subcommand)]
        action: InterceptAction,
    },
    /// Print the visibility flags menus and commands depend on
    Context {
        #[arg(long)]
        json: bool,
    },
    /// Watch definition files and keep the app list current
    Watch,
    /// Manage the php shims
    Shim {
        #[command(subcommand)]
        action: ShimAction,
    },
    /// Write default settings for the workspace
    Init {
        /// Overwrite existing settings
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum InterceptAction {
    /// Install shims and redirect php for the active app
    Enable,
    /// Restore the terminal environment
    Disable,
    /// Show whether interception is active
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ShimAction {
    /// Write the php shims
    Install {
        /// Target directory (defaults to the configured shim directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Execute the command
    pub fn execute(self) -> Result<()> {
        let root = self.workspace.as_deref();
        if let Commands::Init { force } = self.command {
            return init_command(root, force);
        }

        let workspace = Workspace::locate(root)?;
        match self.command {
            Commands::Apps { json, verbose } => apps_command(&workspace, json, verbose),
            Commands::Select { name } => select_command(&workspace, name.as_deref()),
            Commands::Start { app } => {
                lifecycle_command(&workspace, LifecycleOperation::Start, app.as_deref(), false)
            }
            Commands::Stop { app } => {
                lifecycle_command(&workspace, LifecycleOperation::Stop, app.as_deref(), false)
            }
            Commands::Restart { app } => {
                lifecycle_command(&workspace, LifecycleOperation::Restart, app.as_deref(), false)
            }
            Commands::Rebuild { app, yes } => {
                lifecycle_command(&workspace, LifecycleOperation::Rebuild, app.as_deref(), yes)
            }
            Commands::Destroy { app, yes } => {
                lifecycle_command(&workspace, LifecycleOperation::Destroy, app.as_deref(), yes)
            }
            Commands::PowerOff { yes } => power_off_command(&workspace, yes),
            Commands::Run { tool, args } => run_tooling_command(&workspace, &tool, &args),
            Commands::Ssh { service } => ssh_command(&workspace, service.as_deref()),
            Commands::Docs => docs_command(&workspace),
            Commands::Intercept { action } => match action {
                InterceptAction::Enable => intercept_enable_command(&workspace),
                InterceptAction::Disable => intercept_disable_command(&workspace),
                InterceptAction::Status => intercept_status_command(&workspace),
            },
            Commands::Context { json } => context_command(&workspace, json),
            Commands::Watch => watch_command(&workspace),
            Commands::Shim { action } => match action {
                ShimAction::Install { dir } => shim_install_command(&workspace, dir.as_deref()),
            },
            Commands::Init { .. } => unreachable!("handled above"),
        }
    }
}
