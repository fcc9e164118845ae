use anyhow::{Context, Result};
use lando_dock_core::parser::is_definition_file;
use lando_dock_core::registry::Debouncer;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::display::{ConsoleContextStore, print_apps, print_scan_report};
use crate::workspace::Workspace;

const IDLE_WAIT: Duration = Duration::from_secs(60);

fn is_excluded(path: &Path, root: &Path, exclude_dirs: &[String]) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| exclude_dirs.iter().any(|ex| c.as_os_str() == ex.as_str()))
}

/// A directory that appeared, vanished or was renamed. These come as one
/// event for the directory, not one per definition file inside it.
fn is_directory_change(kind: &EventKind, path: &Path, known_roots: &[PathBuf]) -> bool {
    let structural = matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    );
    structural
        && !is_definition_file(path)
        && (path.is_dir() || known_roots.iter().any(|root| root.starts_with(path)))
}

/// Keep the registry in sync with definition files until interrupted.
pub fn watch_command(workspace: &Workspace) -> Result<()> {
    let mut session = workspace
        .open_session()?
        .with_context_store(ConsoleContextStore::default());
    print_apps(&session.apps(), session.active());
    workspace.save(&session)?;

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })
    .context("Failed to create file watcher")?;
    watcher
        .watch(&workspace.root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", workspace.root.display()))?;

    println!("👀 Watching {} (Ctrl+C to stop)", workspace.root.display());

    let exclude_dirs = &workspace.settings.exclude_dirs;
    let mut debouncer = Debouncer::new(workspace.settings.debounce());
    loop {
        let wait = debouncer
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);

        match rx.recv_timeout(wait) {
            Ok(Ok(event)) => {
                if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
                    continue;
                }
                let known_roots: Vec<PathBuf> = session
                    .apps()
                    .iter()
                    .map(|app| app.root().to_path_buf())
                    .collect();
                for path in event.paths {
                    if is_excluded(&path, &workspace.root, exclude_dirs) {
                        continue;
                    }
                    if is_definition_file(&path) {
                        debug!("Definition file changed: {:?}", path);
                        debouncer.push(path, Instant::now());
                    } else if is_directory_change(&event.kind, &path, &known_roots) {
                        debug!("Directory changed: {:?}", path);
                        debouncer.push(path, Instant::now());
                    }
                }
            }
            Ok(Err(e)) => warn!("Watch error: {}", e),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let ready = debouncer.drain_ready(Instant::now());
        if ready.is_empty() {
            continue;
        }
        for path in ready {
            println!("🔄 {} changed", path.display());
            let report = if is_definition_file(&path) {
                session.rescan_path(&path)
            } else {
                session.rescan_tree(&path)
            };
            print_scan_report(&report);
        }
        workspace.save(&session)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};

    #[test]
    fn excluded_directories_are_matched_by_component() {
        let root = PathBuf::from("/work");
        let exclude = vec!["vendor".to_string(), "node_modules".to_string()];

        assert!(is_excluded(
            Path::new("/work/site/vendor/pkg/.lando.yml"),
            &root,
            &exclude
        ));
        assert!(!is_excluded(
            Path::new("/work/vendors-site/.lando.yml"),
            &root,
            &exclude
        ));
        assert!(!is_excluded(Path::new("/work/site/.lando.yml"), &root, &exclude));
    }

    #[test]
    fn directory_events_trigger_a_tree_rescan() {
        let temp = tempfile::TempDir::new().unwrap();
        let moved_in = temp.path().join("site");
        std::fs::create_dir_all(&moved_in).unwrap();

        let rename = EventKind::Modify(ModifyKind::Name(RenameMode::To));
        assert!(is_directory_change(&rename, &moved_in, &[]));
        assert!(is_directory_change(
            &EventKind::Create(CreateKind::Folder),
            &moved_in,
            &[]
        ));

        // gone from disk, but an app lived below it
        let removed = temp.path().join("old");
        let known = vec![removed.join("app")];
        assert!(is_directory_change(
            &EventKind::Remove(RemoveKind::Folder),
            &removed,
            &known
        ));
        assert!(!is_directory_change(
            &EventKind::Remove(RemoveKind::Folder),
            &removed,
            &[]
        ));

        // content edits inside a directory are not structural
        let edit = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(!is_directory_change(&edit, &moved_in, &[]));
    }
}
