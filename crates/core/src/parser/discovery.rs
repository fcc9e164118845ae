//! Recognising definition files and ordering variant layers

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const BASE_FILE_NAME: &str = ".lando.yml";

static DEFINITION_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.lando(?:\.([A-Za-z0-9_-]+))?\.yml$").expect("definition file pattern")
});

// Variants lando loads underneath the base file, lowest precedence first
const BEFORE_BASE: &[&str] = &["base", "dist", "recipe", "upstream"];
// Variants loaded on top of the base file
const AFTER_BASE: &[&str] = &["local", "user"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionFileKind {
    Base,
    Variant(String),
}

/// Classify a path by its file name; `None` for anything that is not a
/// definition file.
pub fn classify(path: &Path) -> Option<DefinitionFileKind> {
    let file_name = path.file_name()?.to_str()?;
    let captures = DEFINITION_FILE.captures(file_name)?;
    Some(match captures.get(1) {
        Some(variant) => DefinitionFileKind::Variant(variant.as_str().to_string()),
        None => DefinitionFileKind::Base,
    })
}

pub fn is_definition_file(path: &Path) -> bool {
    classify(path).is_some()
}

fn layer_rank(kind: &DefinitionFileKind) -> (usize, String) {
    match kind {
        DefinitionFileKind::Base => (BEFORE_BASE.len(), String::new()),
        DefinitionFileKind::Variant(name) => {
            if let Some(pos) = BEFORE_BASE.iter().position(|v| v == name) {
                (pos, String::new())
            } else if let Some(pos) = AFTER_BASE.iter().position(|v| v == name) {
                (BEFORE_BASE.len() + 1 + pos, String::new())
            } else {
                (BEFORE_BASE.len() + 1 + AFTER_BASE.len(), name.clone())
            }
        }
    }
}

/// Sort the definition files of one directory into layering order,
/// dropping anything that is not a definition file.
pub fn order_layers(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut ranked: Vec<((usize, String), PathBuf)> = paths
        .into_iter()
        .filter_map(|path| classify(&path).map(|kind| (layer_rank(&kind), path)))
        .collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0));
    ranked.into_iter().map(|(_, path)| path).collect()
}

/// The path a directory's descriptor is keyed by: the base file when it
/// exists, otherwise the lowest layer.
pub fn primary_path(ordered_layers: &[PathBuf]) -> Option<&PathBuf> {
    ordered_layers
        .iter()
        .find(|p| classify(p) == Some(DefinitionFileKind::Base))
        .or_else(|| ordered_layers.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Path::new("/a/.lando.yml")), Some(DefinitionFileKind::Base));
        assert_eq!(
            classify(Path::new("/a/.lando.local.yml")),
            Some(DefinitionFileKind::Variant("local".to_string()))
        );
        assert_eq!(classify(Path::new("/a/lando.yml")), None);
        assert_eq!(classify(Path::new("/a/.lando.yml.bak")), None);
        assert_eq!(classify(Path::new("/a/.lando..yml")), None);
    }

    #[test]
    fn test_layer_order() {
        let ordered = order_layers(vec![
            PathBuf::from("/a/.lando.user.yml"),
            PathBuf::from("/a/.lando.zeta.yml"),
            PathBuf::from("/a/.lando.yml"),
            PathBuf::from("/a/README.md"),
            PathBuf::from("/a/.lando.dist.yml"),
            PathBuf::from("/a/.lando.alpha.yml"),
            PathBuf::from("/a/.lando.local.yml"),
            PathBuf::from("/a/.lando.base.yml"),
        ]);
        let names: Vec<_> = ordered
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                ".lando.base.yml",
                ".lando.dist.yml",
                ".lando.yml",
                ".lando.local.yml",
                ".lando.user.yml",
                ".lando.alpha.yml",
                ".lando.zeta.yml",
            ]
        );
    }

    #[test]
    fn test_primary_path_prefers_base_file() {
        let layers = order_layers(vec![
            PathBuf::from("/a/.lando.local.yml"),
            PathBuf::from("/a/.lando.yml"),
        ]);
        assert_eq!(primary_path(&layers), Some(&PathBuf::from("/a/.lando.yml")));

        let only_variant = vec![PathBuf::from("/b/.lando.local.yml")];
        assert_eq!(
            primary_path(&only_variant),
            Some(&PathBuf::from("/b/.lando.local.yml"))
        );
    }
}
