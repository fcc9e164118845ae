//! The app registry: every discovered app plus the active selection
//!
//! Descriptors are keyed by the directory holding their definition files, so
//! re-scanning a directory replaces its descriptor in place. Scan results
//! carry a [`ScanTicket`]; a result older than one already applied for the
//! same directory is dropped.

pub mod debounce;
pub mod events;
pub mod scan;

pub use debounce::Debouncer;
pub use events::{RegistryEvent, RegistryListener};
pub use scan::{DirectoryScan, ScanOptions, ScanOutcome};

use crate::{
    config::Settings,
    error::{Error, Result},
    recipes,
    types::{AppDescriptor, AppStatus, ToolingEntry},
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sequence number stamped on a scan when it is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanTicket(u64);

/// Summary of one reconciliation pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub loaded: usize,
    pub removed: usize,
    /// Directories whose files could not be parsed, with the reason
    pub failed: Vec<(PathBuf, String)>,
    /// Results dropped because a newer scan had already been applied
    pub discarded: usize,
}

impl ScanReport {
    fn absorb(&mut self, other: ScanReport) {
        self.loaded += other.loaded;
        self.removed += other.removed;
        self.failed.extend(other.failed);
        self.discarded += other.discarded;
    }
}

#[derive(Debug)]
struct RegistryEntry {
    dir: PathBuf,
    descriptor: AppDescriptor,
    /// Position in the global order of applied scans; larger is more recent
    scan_order: u64,
}

pub struct AppRegistry {
    entries: Vec<RegistryEntry>,
    active: Option<PathBuf>,
    next_ticket: u64,
    next_scan_order: u64,
    applied: HashMap<PathBuf, ScanTicket>,
    options: ScanOptions,
    auto_activate: bool,
    listeners: Vec<Box<dyn RegistryListener>>,
}

impl std::fmt::Debug for AppRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRegistry")
            .field("apps", &self.entries.iter().map(|e| &e.descriptor.name).collect::<Vec<_>>())
            .field("active", &self.active)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

impl AppRegistry {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            entries: Vec::new(),
            active: None,
            next_ticket: 1,
            next_scan_order: 1,
            applied: HashMap::new(),
            options,
            auto_activate: false,
            listeners: Vec::new(),
        }
    }

    pub fn with_settings(settings: &Settings) -> Self {
        let mut registry = Self::new(ScanOptions::from(settings));
        registry.auto_activate = settings.auto_activate;
        registry
    }

    pub fn set_auto_activate(&mut self, enabled: bool) {
        self.auto_activate = enabled;
    }

    /// Register a listener. It is called for every later event.
    pub fn subscribe(&mut self, listener: Box<dyn RegistryListener>) {
        self.listeners.push(listener);
    }

    // ---- queries -------------------------------------------------------

    /// Apps in discovery order
    pub fn apps(&self) -> impl Iterator<Item = &AppDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Owned copy of every descriptor, in discovery order
    pub fn snapshot(&self) -> Vec<AppDescriptor> {
        self.apps().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, definition_path: &Path) -> Option<&AppDescriptor> {
        self.apps().find(|app| app.definition_path == definition_path)
    }

    /// Look an app up by name. When several folders define the same name the
    /// most recently scanned one wins.
    pub fn find_by_name(&self, name: &str) -> Option<&AppDescriptor> {
        let mut matches: Vec<&RegistryEntry> = self
            .entries
            .iter()
            .filter(|e| e.descriptor.name == name)
            .collect();
        if matches.len() > 1 {
            warn!(
                "{} apps are named '{}'; using the most recently scanned ({:?})",
                matches.len(),
                name,
                matches.iter().max_by_key(|e| e.scan_order).map(|e| &e.dir)
            );
        }
        matches.sort_by_key(|e| e.scan_order);
        matches.pop().map(|e| &e.descriptor)
    }

    pub fn active(&self) -> Option<&AppDescriptor> {
        self.active.as_deref().and_then(|path| self.get(path))
    }

    /// Recipe defaults lookup, see [`recipes::resolve_default_tooling`]
    pub fn resolve_default_tooling(recipe: &str) -> Vec<ToolingEntry> {
        recipes::resolve_default_tooling(recipe)
    }

    // ---- selection -----------------------------------------------------

    /// Make `name` the active app.
    ///
    /// Naming an app that is not (or no longer) known clears the current
    /// selection and fails with `NoSuchApp`.
    pub fn set_active(&mut self, name: &str) -> Result<&AppDescriptor> {
        let Some(path) = self.find_by_name(name).map(|app| app.definition_path.clone()) else {
            if self.active.is_some() {
                self.update_active(None);
            }
            return Err(Error::NoSuchApp(name.to_string()));
        };

        if self.active.as_ref() != Some(&path) {
            self.update_active(Some(path.clone()));
        }
        self.get(&path)
            .ok_or_else(|| Error::NoSuchApp(name.to_string()))
    }

    pub fn clear_active(&mut self) {
        if self.active.is_some() {
            self.update_active(None);
        }
    }

    fn update_active(&mut self, path: Option<PathBuf>) {
        self.active = path;
        let name = self.active().map(|app| app.name.clone());
        info!("Active app: {}", name.as_deref().unwrap_or("<none>"));
        self.emit(RegistryEvent::ActiveAppChanged { name });
    }

    fn ensure_active(&mut self) {
        if self.auto_activate && self.active.is_none() {
            if let Some(first) = self.entries.first() {
                let path = first.descriptor.definition_path.clone();
                self.update_active(Some(path));
            }
        }
    }

    // ---- status --------------------------------------------------------

    /// Record a status change and notify listeners. Returns the previous
    /// status, or `None` when the app is no longer registered.
    pub(crate) fn set_status(&mut self, definition_path: &Path, status: AppStatus) -> Option<AppStatus> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.descriptor.definition_path == definition_path)?;
        let from = entry.descriptor.status;
        entry.descriptor.status = status;
        let name = entry.descriptor.name.clone();
        debug!("{}: {} -> {}", name, from, status);
        self.emit(RegistryEvent::StatusChanged {
            name,
            definition_path: definition_path.to_path_buf(),
            from,
            to: status,
        });
        Some(from)
    }

    /// Re-apply statuses observed by an earlier process. Only settled
    /// statuses are taken; an app left mid-operation stays `stopped`.
    pub fn restore_statuses(&mut self, statuses: &BTreeMap<PathBuf, AppStatus>) {
        for (path, status) in statuses {
            if status.is_transient() {
                debug!("Ignoring saved {} status for {:?}", status, path);
                continue;
            }
            let known = self.get(path).map(|app| app.status);
            if known.is_some_and(|current| current != *status) {
                self.set_status(path, *status);
            }
        }
    }

    /// Status of every app keyed by definition path
    pub fn statuses(&self) -> BTreeMap<PathBuf, AppStatus> {
        self.apps()
            .map(|app| (app.definition_path.clone(), app.status))
            .collect()
    }

    // ---- scanning ------------------------------------------------------

    pub fn issue_ticket(&mut self) -> ScanTicket {
        let ticket = ScanTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Scan whole workspace folders and reconcile: apps found are added or
    /// replaced, apps under these folders that are gone are removed.
    pub fn scan(&mut self, folders: &[PathBuf]) -> ScanReport {
        let ticket = self.issue_ticket();
        let mut scans = Vec::new();
        for folder in folders {
            info!("Scanning {:?} for apps", folder);
            scans.extend(self.scan_tree(folder));
        }
        self.apply(ticket, scans)
    }

    /// Rescan everything below `dir`, for a directory that was created,
    /// moved or deleted inside a workspace folder.
    pub fn rescan_tree(&mut self, dir: &Path) -> ScanReport {
        let ticket = self.issue_ticket();
        let scans = self.scan_tree(dir);
        self.apply(ticket, scans)
    }

    fn scan_tree(&self, folder: &Path) -> Vec<DirectoryScan> {
        let groups = scan::discover(folder, &self.options);

        // apps registered under this folder whose directory disappeared
        let mut scans: Vec<DirectoryScan> = self
            .entries
            .iter()
            .filter(|entry| entry.dir.starts_with(folder) && !groups.contains_key(&entry.dir))
            .map(|entry| DirectoryScan {
                dir: entry.dir.clone(),
                outcome: ScanOutcome::Missing,
            })
            .collect();
        for (dir, files) in groups {
            scans.push(scan::scan_files(&dir, files));
        }
        scans
    }

    /// Re-read the app owning a changed, created or deleted definition file.
    pub fn rescan_path(&mut self, changed: &Path) -> ScanReport {
        let ticket = self.issue_ticket();
        let dir = if changed.is_dir() {
            changed
        } else {
            changed.parent().unwrap_or(changed)
        };
        let scan = scan::scan_directory(dir);
        self.apply(ticket, vec![scan])
    }

    /// Drop every app belonging to a workspace folder that was closed.
    pub fn remove_folder(&mut self, folder: &Path) -> ScanReport {
        let ticket = self.issue_ticket();
        let scans = self
            .entries
            .iter()
            .filter(|e| e.dir.starts_with(folder))
            .map(|e| DirectoryScan {
                dir: e.dir.clone(),
                outcome: ScanOutcome::Missing,
            })
            .collect();
        self.apply(ticket, scans)
    }

    /// Apply scan results produced under `ticket`.
    ///
    /// Results for a directory that already saw a newer ticket are discarded.
    /// Listeners are notified once, after every result is in place.
    pub fn apply(&mut self, ticket: ScanTicket, scans: Vec<DirectoryScan>) -> ScanReport {
        let mut report = ScanReport::default();
        let active_before = self.active.clone();

        for scan in scans {
            report.absorb(self.apply_one(ticket, scan));
        }

        if report.loaded > 0 || report.removed > 0 {
            self.emit(RegistryEvent::AppsChanged);
        }
        if self.active != active_before {
            let name = self.active().map(|app| app.name.clone());
            self.emit(RegistryEvent::ActiveAppChanged { name });
        }
        self.ensure_active();

        report
    }

    fn apply_one(&mut self, ticket: ScanTicket, scan: DirectoryScan) -> ScanReport {
        let mut report = ScanReport::default();
        let DirectoryScan { dir, outcome } = scan;

        if let Some(applied) = self.applied.get(&dir) {
            if ticket < *applied {
                debug!(
                    "Discarding stale scan {:?} of {:?}; {:?} already applied",
                    ticket, dir, applied
                );
                report.discarded += 1;
                return report;
            }
        }
        self.applied.insert(dir.clone(), ticket);

        let existing = self.entries.iter().position(|e| e.dir == dir);
        match outcome {
            ScanOutcome::Loaded(mut descriptor) => {
                self.warn_on_duplicate_name(&dir, &descriptor.name);
                let scan_order = self.next_scan_order;
                self.next_scan_order += 1;

                match existing {
                    Some(index) => {
                        let entry = &mut self.entries[index];
                        descriptor.status = entry.descriptor.status;
                        if self.active.as_ref() == Some(&entry.descriptor.definition_path) {
                            self.active = Some(descriptor.definition_path.clone());
                        }
                        debug!("Updated app '{}' from {:?}", descriptor.name, dir);
                        entry.descriptor = descriptor;
                        entry.scan_order = scan_order;
                    }
                    None => {
                        info!("Discovered app '{}' in {:?}", descriptor.name, dir);
                        self.entries.push(RegistryEntry {
                            dir,
                            descriptor,
                            scan_order,
                        });
                    }
                }
                report.loaded += 1;
            }
            ScanOutcome::Missing => {
                if let Some(index) = existing {
                    let entry = self.entries.remove(index);
                    info!("Removed app '{}' ({:?})", entry.descriptor.name, entry.dir);
                    if self.active.as_ref() == Some(&entry.descriptor.definition_path) {
                        self.active = None;
                    }
                    report.removed += 1;
                }
            }
            ScanOutcome::Failed(e) => {
                warn!("Skipping app in {:?}: {}", dir, e);
                report.failed.push((dir, e.to_string()));
            }
        }

        report
    }

    fn warn_on_duplicate_name(&self, dir: &Path, name: &str) {
        if let Some(other) = self
            .entries
            .iter()
            .find(|e| e.dir != dir && e.descriptor.name == name)
        {
            warn!(
                "App name '{}' in {:?} is also used by {:?}; name lookups prefer the most recently scanned",
                name, dir, other.dir
            );
        }
    }

    fn emit(&mut self, event: RegistryEvent) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in listeners.iter_mut() {
            listener.on_event(&event, self);
        }
        // keep listeners that subscribed while we were dispatching
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }
}
