//! Command surface over the registry, lifecycle controller and interceptor
//!
//! Every editor command maps onto one method here. The session keeps
//! interception pointed at the active app: selecting another app re-targets
//! the patch, losing the selection removes it.

use crate::{
    config::Settings,
    context::{ContextProjector, ContextStore},
    error::{Error, Result},
    interceptor::{JsonSettingsStore, RestorePoints, TerminalEnvInterceptor, TerminalEnvStore},
    lifecycle::{CliRunner, CommandOutput, LifecycleController, PowerOffOutcome, SystemRunner, Target},
    recipes,
    registry::{AppRegistry, ScanReport},
    shim,
    types::{AppDescriptor, AppStatus, LifecycleOperation},
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct Session<R, E> {
    settings: Settings,
    folders: Vec<PathBuf>,
    registry: AppRegistry,
    controller: LifecycleController<R>,
    interceptor: TerminalEnvInterceptor<E>,
}

impl Session<SystemRunner, JsonSettingsStore> {
    /// A session running the real lando binary and editing the workspace's
    /// `.vscode/settings.json`.
    pub fn for_workspace(root: &Path, settings: Settings) -> Self {
        let runner =
            SystemRunner::new(settings.resolve_binary()).with_timeout(settings.command_timeout());
        let shim_dir = settings
            .intercept
            .shim_dir
            .clone()
            .unwrap_or_else(|| shim::default_shim_dir(root));
        let mut session = Session::new(settings, runner, JsonSettingsStore::for_workspace(root), shim_dir);
        session.add_folder(root);
        session
    }
}

impl<R: CliRunner, E: TerminalEnvStore> Session<R, E> {
    pub fn new(settings: Settings, runner: R, env_store: E, shim_dir: impl Into<PathBuf>) -> Self {
        let interceptor = TerminalEnvInterceptor::new(env_store, shim_dir)
            .with_platforms(settings.intercept.platforms.clone());
        Self {
            registry: AppRegistry::with_settings(&settings),
            controller: LifecycleController::new(runner),
            interceptor,
            folders: Vec::new(),
            settings,
        }
    }

    /// Publish visibility flags to `store` now and after every change.
    pub fn with_context_store(mut self, store: impl ContextStore + 'static) -> Self {
        let mut projector = ContextProjector::new(store);
        projector.project(&self.registry);
        self.registry.subscribe(Box::new(projector));
        self
    }

    /// Resume interception state saved by an earlier session
    pub fn with_restore_points(mut self, restore: RestorePoints) -> Self {
        self.interceptor = self.interceptor.with_restore_points(restore);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AppRegistry {
        &mut self.registry
    }

    pub fn runner(&self) -> &R {
        self.controller.runner()
    }

    pub fn interceptor(&self) -> &TerminalEnvInterceptor<E> {
        &self.interceptor
    }

    pub fn restore_points(&self) -> &RestorePoints {
        self.interceptor.restore_points()
    }

    // ---- workspace -----------------------------------------------------

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    pub fn add_folder(&mut self, folder: impl Into<PathBuf>) {
        let folder = folder.into();
        if !self.folders.contains(&folder) {
            self.folders.push(folder);
        }
    }

    pub fn remove_folder(&mut self, folder: &Path) -> ScanReport {
        self.folders.retain(|f| f != folder);
        let report = self.registry.remove_folder(folder);
        self.sync_interception_logged();
        report
    }

    /// Scan every workspace folder
    pub fn scan(&mut self) -> ScanReport {
        self.scan_preferring(None)
    }

    /// Scan, then select `preferred` if it was found. Interception is synced
    /// once, against the final selection.
    pub fn scan_preferring(&mut self, preferred: Option<&str>) -> ScanReport {
        let report = self.registry.scan(&self.folders);
        if let Some(name) = preferred {
            // an unknown name would clear the auto-selected app, so look first
            if self.registry.find_by_name(name).is_none() {
                debug!("Previously selected app '{}' is gone", name);
            } else if let Err(e) = self.registry.set_active(name) {
                warn!("Could not restore selection of '{}': {}", name, e);
            }
        }
        self.sync_interception_logged();
        report
    }

    /// Reconcile after a definition file changed on disk
    pub fn rescan_path(&mut self, changed: &Path) -> ScanReport {
        let report = self.registry.rescan_path(changed);
        self.sync_interception_logged();
        report
    }

    /// Reconcile after a directory appeared, moved or disappeared
    pub fn rescan_tree(&mut self, dir: &Path) -> ScanReport {
        let report = self.registry.rescan_tree(dir);
        self.sync_interception_logged();
        report
    }

    pub fn apps(&self) -> Vec<&AppDescriptor> {
        self.registry.apps().collect()
    }

    pub fn active(&self) -> Option<&AppDescriptor> {
        self.registry.active()
    }

    // ---- selection -----------------------------------------------------

    pub fn select_app(&mut self, name: &str) -> Result<()> {
        let selected = self.registry.set_active(name).map(|_| ());
        // an unknown name also clears the selection, which must drop interception
        self.sync_interception()?;
        selected
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.registry.clear_active();
        self.sync_interception()
    }

    // ---- lifecycle -----------------------------------------------------

    pub fn start(&mut self, app: Option<&str>) -> Result<AppStatus> {
        self.lifecycle(LifecycleOperation::Start, app)
    }

    pub fn stop(&mut self, app: Option<&str>) -> Result<AppStatus> {
        self.lifecycle(LifecycleOperation::Stop, app)
    }

    pub fn restart(&mut self, app: Option<&str>) -> Result<AppStatus> {
        self.lifecycle(LifecycleOperation::Restart, app)
    }

    pub fn rebuild(&mut self, app: Option<&str>) -> Result<AppStatus> {
        self.lifecycle(LifecycleOperation::Rebuild, app)
    }

    pub fn destroy(&mut self, app: Option<&str>) -> Result<AppStatus> {
        self.lifecycle(LifecycleOperation::Destroy, app)
    }

    pub fn lifecycle(&mut self, operation: LifecycleOperation, app: Option<&str>) -> Result<AppStatus> {
        self.controller
            .run(&mut self.registry, operation, Target::from(app))
    }

    pub fn power_off(&mut self, confirm: impl FnOnce() -> bool) -> Result<PowerOffOutcome> {
        self.controller.power_off(&mut self.registry, confirm)
    }

    pub fn run_tooling(&self, tool: &str, args: &[String]) -> Result<CommandOutput> {
        self.controller.run_tooling(&self.registry, tool, args)
    }

    pub fn open_terminal(&self, service: Option<&str>) -> Result<CommandOutput> {
        self.controller.open_terminal(&self.registry, service)
    }

    /// Documentation for the active app's recipe, or the general docs
    pub fn documentation_url(&self) -> String {
        recipes::documentation_url(self.active().and_then(|app| app.recipe.as_deref()))
    }

    // ---- interception --------------------------------------------------

    pub fn enable_interception(&mut self) -> Result<()> {
        let app = self.registry.active().ok_or(Error::NoActiveApp)?;
        self.interceptor
            .enable(&app.name, app.root(), &self.settings.intercept.exec_cwd)
    }

    pub fn disable_interception(&mut self) -> Result<bool> {
        self.interceptor.disable()
    }

    /// Point interception at the active app, or remove it when there is none.
    /// With `intercept.enabled` set, interception is switched on as soon as an
    /// app is active.
    fn sync_interception(&mut self) -> Result<()> {
        let active = self
            .registry
            .active()
            .map(|app| (app.name.clone(), app.root().to_path_buf()));
        let enabled = self.interceptor.is_enabled();
        let exec_cwd = &self.settings.intercept.exec_cwd;
        match active {
            None if enabled => {
                debug!("No active app; removing terminal interception");
                self.interceptor.disable().map(|_| ())
            }
            Some((name, root))
                if enabled
                    && (self.interceptor.target() != Some(name.as_str())
                        || self.interceptor.target_root() != Some(root.as_path())) =>
            {
                debug!("Re-targeting terminal interception to '{}'", name);
                self.interceptor.enable(&name, &root, exec_cwd)
            }
            Some((name, root)) if !enabled && self.settings.intercept.enabled => {
                self.interceptor.enable(&name, &root, exec_cwd)
            }
            _ => Ok(()),
        }
    }

    fn sync_interception_logged(&mut self) {
        if let Err(e) = self.sync_interception() {
            warn!("Could not update terminal interception: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{APP_BUILDING, APP_RUNNING, HAS_ACTIVE_APP, MemoryContextStore};
    use crate::interceptor::{APP_ROOT_VAR, CONTAINER_VAR, MemoryEnvStore, TerminalPlatform};
    use crate::lifecycle::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(apps: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (dir, body) in apps {
            let dir = temp.path().join(dir);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(".lando.yml"), body).unwrap();
        }
        temp
    }

    fn session(
        root: &Path,
        settings: Settings,
    ) -> (Session<ScriptedRunner, MemoryEnvStore>, MemoryEnvStore, MemoryContextStore) {
        let env = MemoryEnvStore::new();
        let context = MemoryContextStore::new();
        let mut session = Session::new(settings, ScriptedRunner::new(), env.clone(), root.join("bin"))
            .with_context_store(context.clone());
        session.add_folder(root);
        (session, env, context)
    }

    fn linux_var(env: &MemoryEnvStore, key: &str) -> Option<String> {
        env.bucket(TerminalPlatform::Linux)
            .and_then(|bucket| bucket.get(key).cloned().flatten())
    }

    fn container(env: &MemoryEnvStore) -> Option<String> {
        linux_var(env, CONTAINER_VAR)
    }

    #[test]
    fn test_context_published_before_first_scan() {
        let temp = workspace(&[]);
        let (_session, _env, context) = session(temp.path(), Settings::default());
        assert_eq!(context.writes(), 5);
        assert!(!context.flag(HAS_ACTIVE_APP));
    }

    #[test]
    fn test_rebuild_reports_building_while_in_flight() {
        let temp = workspace(&[("site", "name: site\n")]);
        let (mut session, _env, context) = session(temp.path(), Settings::default());
        session.scan();

        let controller = LifecycleController::new(ScriptedRunner::new());
        let pending = controller
            .begin(session.registry_mut(), LifecycleOperation::Rebuild, Target::Active)
            .unwrap();
        assert!(context.flag(APP_BUILDING));

        controller
            .finish(session.registry_mut(), pending, Ok(CommandOutput::default()))
            .unwrap();
        assert!(!context.flag(APP_BUILDING));
        assert!(context.flag(APP_RUNNING));
    }

    #[test]
    fn test_selecting_another_app_retargets_interception() {
        let temp = workspace(&[("one", "name: one\n"), ("two", "name: two\n")]);
        let (mut session, env, _context) = session(temp.path(), Settings::default());
        session.scan();
        assert_eq!(session.active().map(|a| a.name.as_str()), Some("one"));

        session.enable_interception().unwrap();
        assert_eq!(container(&env).as_deref(), Some("one"));

        session.select_app("two").unwrap();
        assert_eq!(container(&env).as_deref(), Some("two"));

        // the restore point still holds the untouched bucket
        session.disable_interception().unwrap();
        assert_eq!(env.bucket(TerminalPlatform::Linux), None);
    }

    #[test]
    fn test_interception_exports_the_active_app_root() {
        let temp = workspace(&[("one", "name: site\n")]);
        let (mut session, env, _context) = session(temp.path(), Settings::default());
        session.scan();
        session.enable_interception().unwrap();

        assert_eq!(
            linux_var(&env, APP_ROOT_VAR),
            Some(temp.path().join("one").display().to_string())
        );
    }

    #[test]
    fn test_same_name_in_another_folder_retargets_interception() {
        let temp = workspace(&[("two", "name: site\n")]);
        let (session, env, _context) = session(temp.path(), Settings::default());
        // left over from a session where "site" lived in another folder
        let mut restore = RestorePoints::default();
        restore.app = Some("site".to_string());
        restore.app_root = Some(temp.path().join("one"));
        restore.buckets.insert(TerminalPlatform::Linux, None);
        let mut session = session.with_restore_points(restore);

        session.scan();

        assert_eq!(
            session.interceptor().target_root(),
            Some(temp.path().join("two").as_path())
        );
        assert_eq!(
            linux_var(&env, APP_ROOT_VAR),
            Some(temp.path().join("two").display().to_string())
        );
        // the original restore point survives the re-target
        session.disable_interception().unwrap();
        assert_eq!(env.bucket(TerminalPlatform::Linux), None);
    }

    #[test]
    fn test_unknown_selection_disables_interception() {
        let temp = workspace(&[("one", "name: one\n")]);
        let (mut session, env, _context) = session(temp.path(), Settings::default());
        session.scan();
        session.enable_interception().unwrap();

        let err = session.select_app("missing").unwrap_err();
        assert!(matches!(err, Error::NoSuchApp(_)));
        assert!(session.active().is_none());
        assert!(!session.interceptor().is_enabled());
        assert_eq!(container(&env), None);
    }

    #[test]
    fn test_saved_selection_is_restored_unless_gone() {
        let temp = workspace(&[("one", "name: one\n"), ("two", "name: two\n")]);

        let (mut resumed, _env, _context) = session(temp.path(), Settings::default());
        resumed.scan_preferring(Some("two"));
        assert_eq!(resumed.active().map(|a| a.name.as_str()), Some("two"));

        let (mut fresh, _env, _context) = session(temp.path(), Settings::default());
        fresh.scan_preferring(Some("ghost"));
        assert_eq!(fresh.active().map(|a| a.name.as_str()), Some("one"));
    }

    #[test]
    fn test_interception_needs_an_active_app() {
        let temp = workspace(&[]);
        let (mut session, env, _context) = session(temp.path(), Settings::default());
        session.scan();
        assert!(matches!(session.enable_interception(), Err(Error::NoActiveApp)));
        assert_eq!(env.writes(), 0);
    }

    #[test]
    fn test_intercept_setting_enables_on_first_scan() {
        let temp = workspace(&[("one", "name: one\n")]);
        let mut settings = Settings::default();
        settings.intercept.enabled = true;
        let (mut session, env, _context) = session(temp.path(), settings);

        session.scan();
        assert_eq!(container(&env).as_deref(), Some("one"));
    }

    #[test]
    fn test_deleting_active_app_removes_interception() {
        let temp = workspace(&[("one", "name: one\n")]);
        let (mut session, env, _context) = session(temp.path(), Settings::default());
        session.scan();
        session.enable_interception().unwrap();

        fs::remove_file(temp.path().join("one/.lando.yml")).unwrap();
        session.rescan_path(&temp.path().join("one/.lando.yml"));

        assert!(session.apps().is_empty());
        assert_eq!(container(&env), None);
    }

    #[test]
    fn test_documentation_url_follows_active_recipe() {
        let temp = workspace(&[("wp", "name: blog\nrecipe: wordpress\n")]);
        let (mut session, _env, _context) = session(temp.path(), Settings::default());
        assert_eq!(session.documentation_url(), "https://docs.lando.dev/");
        session.scan();
        assert_eq!(
            session.documentation_url(),
            "https://docs.lando.dev/plugins/wordpress/"
        );
    }
}
