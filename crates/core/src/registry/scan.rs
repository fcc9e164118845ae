//! Finding and loading definition files on disk

use crate::{
    config::{DefinitionLayer, LayerMerger, Settings},
    error::{Error, Result},
    parser::{self, discovery},
    recipes,
    types::AppDescriptor,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum depth of a definition file below the workspace folder
    pub max_depth: usize,
    pub exclude_dirs: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ScanOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_depth: settings.scan_depth,
            exclude_dirs: settings.exclude_dirs.clone(),
        }
    }
}

/// What scanning one directory produced
#[derive(Debug)]
pub enum ScanOutcome {
    Loaded(AppDescriptor),
    /// No definition files remain in the directory
    Missing,
    Failed(Error),
}

#[derive(Debug)]
pub struct DirectoryScan {
    pub dir: PathBuf,
    pub outcome: ScanOutcome,
}

/// Every definition file below `folder`, grouped by directory. Directories
/// come back in path order so repeated scans are stable.
pub fn discover(folder: &Path, options: &ScanOptions) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(folder)
        .max_depth(options.max_depth)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            match e.file_name().to_str() {
                Some(name) => !options.exclude_dirs.iter().any(|excluded| excluded == name),
                None => true,
            }
        })
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || !discovery::is_definition_file(entry.path()) {
            continue;
        }
        if let Some(dir) = entry.path().parent() {
            groups
                .entry(dir.to_path_buf())
                .or_default()
                .push(entry.path().to_path_buf());
        }
    }

    debug!("Found {} app directories under {:?}", groups.len(), folder);
    groups
}

/// Definition files currently present in `dir`
pub fn definition_files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && discovery::is_definition_file(p))
            .collect(),
        Err(e) => {
            debug!("Cannot list {:?}: {}", dir, e);
            Vec::new()
        }
    }
}

/// Load the app defined by one directory's definition files.
pub fn scan_directory(dir: &Path) -> DirectoryScan {
    scan_files(dir, definition_files_in(dir))
}

pub fn scan_files(dir: &Path, files: Vec<PathBuf>) -> DirectoryScan {
    let layers = discovery::order_layers(files);
    let outcome = if layers.is_empty() {
        ScanOutcome::Missing
    } else {
        match load_layers(&layers) {
            Ok(descriptor) => ScanOutcome::Loaded(descriptor),
            Err(e) => ScanOutcome::Failed(e),
        }
    };
    DirectoryScan {
        dir: dir.to_path_buf(),
        outcome,
    }
}

/// Parse and merge ordered layers into a descriptor with recipe defaults
/// applied. A broken variant is skipped; a broken primary file fails the app.
pub fn load_layers(layers: &[PathBuf]) -> Result<AppDescriptor> {
    let primary = discovery::primary_path(layers)
        .cloned()
        .ok_or_else(|| Error::ConfigError("no definition files to load".to_string()))?;

    let mut merger = LayerMerger::new();
    for path in layers {
        let loaded = std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| parser::parse_document(&text, path));
        match loaded {
            Ok(document) => merger.push(DefinitionLayer {
                path: path.clone(),
                document,
            }),
            Err(e) if *path == primary => return Err(e),
            Err(e) => warn!("Skipping definition layer {:?}: {}", path, e),
        }
    }

    let definition = parser::parse_definition(&merger.merged(), &primary)?;
    Ok(recipes::apply_recipe_defaults(definition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_respects_exclusions_and_depth() -> Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::create_dir_all(root.join("site/web"))?;
        fs::create_dir_all(root.join("node_modules/pkg"))?;
        fs::create_dir_all(root.join("a/b/c/d"))?;
        fs::write(root.join("site/.lando.yml"), "name: site\n")?;
        fs::write(root.join("site/.lando.local.yml"), "")?;
        fs::write(root.join("node_modules/pkg/.lando.yml"), "name: pkg\n")?;
        fs::write(root.join("a/b/c/d/.lando.yml"), "name: deep\n")?;

        let options = ScanOptions {
            max_depth: 3,
            exclude_dirs: vec!["node_modules".to_string()],
        };
        let groups = discover(root, &options);

        assert_eq!(groups.len(), 1);
        let files = &groups[&root.join("site")];
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn test_variant_layers_merge_onto_base() -> Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().join("site");
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join(".lando.yml"),
            "name: site\nrecipe: lamp\ntooling:\n  deploy: ./deploy.sh\n",
        )?;
        fs::write(
            dir.join(".lando.local.yml"),
            "tooling:\n  deploy: ./deploy.sh --dry-run\n",
        )?;

        let app = match scan_directory(&dir).outcome {
            ScanOutcome::Loaded(app) => app,
            other => panic!("expected a loaded app, got {other:?}"),
        };
        assert_eq!(app.definition_path, dir.join(".lando.yml"));
        assert_eq!(
            app.tool("deploy").unwrap().command.steps(),
            vec!["./deploy.sh --dry-run"]
        );
        assert!(app.tool("php").is_some());
        Ok(())
    }

    #[test]
    fn test_broken_variant_is_skipped_but_broken_base_fails() -> Result<()> {
        let temp = TempDir::new()?;
        let dir = temp.path().to_path_buf();
        fs::write(dir.join(".lando.yml"), "name: site\n")?;
        fs::write(dir.join(".lando.local.yml"), "name: [broken\n")?;

        assert!(matches!(scan_directory(&dir).outcome, ScanOutcome::Loaded(_)));

        fs::write(dir.join(".lando.yml"), "name: [broken\n")?;
        assert!(matches!(
            scan_directory(&dir).outcome,
            ScanOutcome::Failed(Error::ParseError { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_empty_directory_is_missing() -> Result<()> {
        let temp = TempDir::new()?;
        assert!(matches!(scan_directory(temp.path()).outcome, ScanOutcome::Missing));
        Ok(())
    }
}
