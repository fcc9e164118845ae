//! Lifecycle controller
//!
//! Drives apps through the status state machine by delegating to the lando
//! CLI. An operation is split into [`LifecycleController::begin`], which
//! checks the guard and records the transient status, and
//! [`LifecycleController::finish`], which settles or reverts it once the
//! external call returns. [`LifecycleController::run`] does both around a
//! blocking call. Nothing suspends between the guard check and the status
//! write, so at most one operation per app is ever in flight.

pub mod runner;

pub use runner::{CliRunner, CommandOutput, OutputMode, RecordedCall, ScriptedRunner, SystemRunner};

use crate::{
    error::{Error, Result},
    registry::AppRegistry,
    types::{AppDescriptor, AppStatus, LifecycleOperation},
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which app an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Active,
    Named(&'a str),
}

impl<'a> From<Option<&'a str>> for Target<'a> {
    fn from(name: Option<&'a str>) -> Self {
        name.map_or(Target::Active, Target::Named)
    }
}

/// An operation whose transient status is recorded and whose external call
/// has not completed yet
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending operation must be finished or its app stays busy"]
pub struct PendingOperation {
    pub app: String,
    pub definition_path: PathBuf,
    pub operation: LifecycleOperation,
    pub previous: AppStatus,
    pub transient: AppStatus,
    root: PathBuf,
}

impl PendingOperation {
    pub fn args(&self) -> Vec<String> {
        self.operation.cli_args()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerOffOutcome {
    /// The caller declined the confirmation
    Cancelled,
    /// lando powered off; these apps were marked stopped
    Completed { stopped: Vec<String> },
}

#[derive(Debug)]
pub struct LifecycleController<R> {
    runner: R,
}

impl<R: CliRunner> LifecycleController<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `operation` against `target` to completion.
    pub fn run(
        &self,
        registry: &mut AppRegistry,
        operation: LifecycleOperation,
        target: Target<'_>,
    ) -> Result<AppStatus> {
        let pending = self.begin(registry, operation, target)?;
        info!("Running lando {} for '{}'", operation, pending.app);
        let outcome = self
            .runner
            .run(&pending.args(), Some(pending.root()), OutputMode::Capture);
        self.finish(registry, pending, outcome)
    }

    /// Check the guard and move the app into the operation's transient status.
    pub fn begin(
        &self,
        registry: &mut AppRegistry,
        operation: LifecycleOperation,
        target: Target<'_>,
    ) -> Result<PendingOperation> {
        let app = resolve(registry, target)?;
        let previous = app.status;

        if previous.is_transient() {
            return Err(Error::OperationInProgress {
                app: app.name.clone(),
                status: previous,
            });
        }
        let Some(transient) = previous.begin(operation) else {
            return Err(Error::InvalidTransition {
                app: app.name.clone(),
                status: previous,
                operation,
            });
        };

        let pending = PendingOperation {
            app: app.name.clone(),
            definition_path: app.definition_path.clone(),
            operation,
            previous,
            transient,
            root: app.root().to_path_buf(),
        };
        registry.set_status(&pending.definition_path, transient);
        Ok(pending)
    }

    /// Settle a pending operation from the outcome of its external call.
    ///
    /// Success moves the app to the operation's final status. A non-zero exit,
    /// a spawn failure or a timeout reverts it to where it started and returns
    /// `ExternalCommandFailed` with the captured diagnostics.
    pub fn finish(
        &self,
        registry: &mut AppRegistry,
        pending: PendingOperation,
        outcome: io::Result<CommandOutput>,
    ) -> Result<AppStatus> {
        let PendingOperation {
            app,
            definition_path,
            operation,
            previous,
            transient,
            ..
        } = pending;

        let failure = match outcome {
            Ok(output) if output.success() => None,
            Ok(output) => Some(format!(
                "exit code {}\n{}",
                output.status_code,
                output.diagnostics()
            )),
            Err(e) => Some(e.to_string()),
        };

        match failure {
            None => {
                let settled = transient.complete(operation).unwrap_or(previous);
                if registry.set_status(&definition_path, settled).is_none() {
                    warn!("'{}' disappeared while lando {} was running", app, operation);
                }
                info!("lando {} succeeded for '{}'", operation, app);
                Ok(settled)
            }
            Some(diagnostics) => {
                registry.set_status(&definition_path, previous);
                warn!("lando {} failed for '{}'; reverted to {}", operation, app, previous);
                Err(Error::ExternalCommandFailed {
                    app,
                    operation: operation.to_string(),
                    diagnostics,
                })
            }
        }
    }

    /// Stop every lando container on the machine.
    ///
    /// Not tied to the active app. `confirm` is asked first; on success every
    /// app marked running is marked stopped.
    pub fn power_off(
        &self,
        registry: &mut AppRegistry,
        confirm: impl FnOnce() -> bool,
    ) -> Result<PowerOffOutcome> {
        if !confirm() {
            info!("Power off cancelled");
            return Ok(PowerOffOutcome::Cancelled);
        }

        let args = vec!["poweroff".to_string()];
        let outcome = self.runner.run(&args, None, OutputMode::Capture);
        let diagnostics = match outcome {
            Ok(output) if output.success() => None,
            Ok(output) => Some(output.diagnostics()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(diagnostics) = diagnostics {
            return Err(Error::ExternalCommandFailed {
                app: "all apps".to_string(),
                operation: "power off".to_string(),
                diagnostics,
            });
        }

        let running: Vec<(String, PathBuf)> = registry
            .apps()
            .filter(|app| app.status == AppStatus::Running)
            .map(|app| (app.name.clone(), app.definition_path.clone()))
            .collect();
        for (_, path) in &running {
            registry.set_status(path, AppStatus::Stopped);
        }

        let stopped: Vec<String> = running.into_iter().map(|(name, _)| name).collect();
        info!("Powered off; {} app(s) marked stopped", stopped.len());
        Ok(PowerOffOutcome::Completed { stopped })
    }

    /// Run one of the active app's tooling commands, passing `args` through.
    ///
    /// The terminal is handed to the command; its exit code is returned
    /// as-is rather than treated as a failure.
    pub fn run_tooling(
        &self,
        registry: &AppRegistry,
        tool: &str,
        args: &[String],
    ) -> Result<CommandOutput> {
        let app = resolve(registry, Target::Active)?;
        if app.tool(tool).is_none() {
            return Err(Error::UnknownTooling {
                app: app.name.clone(),
                tool: tool.to_string(),
            });
        }

        let mut argv = vec![tool.to_string()];
        argv.extend(args.iter().cloned());
        debug!("Running tooling '{}' for '{}'", tool, app.name);
        self.runner
            .run(&argv, Some(app.root()), OutputMode::Inherit)
            .map_err(|e| Error::ExternalCommandFailed {
                app: app.name.clone(),
                operation: format!("run {tool}"),
                diagnostics: e.to_string(),
            })
    }

    /// Open an interactive shell in one of the active app's services,
    /// `appserver` unless another is named.
    pub fn open_terminal(
        &self,
        registry: &AppRegistry,
        service: Option<&str>,
    ) -> Result<CommandOutput> {
        let app = resolve(registry, Target::Active)?;
        let service = terminal_service(app, service);

        let args = vec!["ssh".to_string(), "-s".to_string(), service.clone()];
        debug!("Opening a shell in {}:{}", app.name, service);
        self.runner
            .run(&args, Some(app.root()), OutputMode::Inherit)
            .map_err(|e| Error::ExternalCommandFailed {
                app: app.name.clone(),
                operation: "open a terminal in".to_string(),
                diagnostics: e.to_string(),
            })
    }
}

fn resolve<'r>(registry: &'r AppRegistry, target: Target<'_>) -> Result<&'r AppDescriptor> {
    match target {
        Target::Active => registry.active().ok_or(Error::NoActiveApp),
        Target::Named(name) => registry
            .find_by_name(name)
            .ok_or_else(|| Error::NoSuchApp(name.to_string())),
    }
}

fn terminal_service(app: &AppDescriptor, requested: Option<&str>) -> String {
    if let Some(service) = requested {
        return service.to_string();
    }
    if app.services.is_empty() || app.services.contains_key("appserver") {
        return "appserver".to_string();
    }
    app.services
        .keys()
        .next()
        .cloned()
        .unwrap_or_else(|| "appserver".to_string())
}
