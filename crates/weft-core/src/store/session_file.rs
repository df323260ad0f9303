use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::session::{Session, SessionStore};
use crate::store::dir_store::valid_name;

/// Session store keeping one JSON file per named session under a root
/// directory. The root is created lazily on first save.
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self, name: &str) -> Result<PathBuf, EngineError> {
        if !valid_name(name) {
            return Err(EngineError::store(format!("invalid session name: {name}")));
        }
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, name: &str) -> Option<Session> {
        let path = self.session_path(name).ok()?;
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Session>(&text) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!("corrupt session file {}: {err}", path.display());
                None
            }
        }
    }

    fn save(&self, name: &str, session: &Session) -> Result<(), EngineError> {
        let path = self.session_path(name)?;
        fs::create_dir_all(&self.root)
            .map_err(|err| EngineError::store(format!("create {}: {err}", self.root.display())))?;
        let json = serde_json::to_string_pretty(session)
            .map_err(|err| EngineError::store(format!("serialize session {name}: {err}")))?;
        fs::write(&path, json)
            .map_err(|err| EngineError::store(format!("write {}: {err}", path.display())))
    }

    fn list(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return vec![],
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                    return None;
                }
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ai::Message;

    #[test]
    fn save_then_load_round_trips_messages() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions"));

        let mut session = Session::named("daily");
        session.append(Message::user("hi"));
        session.append(Message::assistant("hello"));
        store.save("daily", &session).unwrap();

        let loaded = store.load("daily").unwrap();
        assert_eq!(loaded, session);
        assert_eq!(store.list(), vec!["daily"]);
    }

    #[test]
    fn load_of_missing_or_corrupt_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.load("missing").is_none());

        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert!(store.load("bad").is_none());
    }

    #[test]
    fn invalid_names_fail_save_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions"));

        let err = store.save("../escape", &Session::anonymous());
        assert!(matches!(err, Err(EngineError::Store(_))));
        assert!(!dir.path().join("sessions").exists());
    }
}
