use std::fs;
use std::path::{Path, PathBuf};

use crate::pattern::PatternStore;

/// Pattern store over a directory tree. Each pattern is either
/// `<root>/<name>/system.md` or the flat form `<root>/<name>.md`; the
/// directory form wins when both exist.
pub struct DirPatternStore {
    root: PathBuf,
}

impl DirPatternStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pattern_file(&self, name: &str) -> Option<PathBuf> {
        if !valid_name(name) {
            return None;
        }
        let nested = self.root.join(name).join("system.md");
        if nested.is_file() {
            return Some(nested);
        }
        let flat = self.root.join(format!("{name}.md"));
        flat.is_file().then_some(flat)
    }
}

impl PatternStore for DirPatternStore {
    fn get(&self, name: &str) -> Option<String> {
        let path = self.pattern_file(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!("failed to read pattern {}: {err}", path.display());
                None
            }
        }
    }

    fn list(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return vec![],
        };
        let mut names = vec![];
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if path.is_dir() && path.join("system.md").is_file() {
                names.push(stem.to_string());
            } else if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        names
    }
}

/// Names are plain identifiers; anything that could escape the root is
/// rejected rather than sanitized.
pub(crate) fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.')
}
