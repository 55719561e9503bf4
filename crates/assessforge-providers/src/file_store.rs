//! Directory-backed key/value store for drafts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use assessforge_core::traits::KeyValueStore;

use crate::error::CollaboratorError;

/// Stores each key as one JSON file inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// One file per key. Bytes outside `[A-Za-z0-9_-]` are percent-encoded,
    /// so distinct keys never share a file and no key can leave the directory.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut file = String::with_capacity(key.len());
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                file.push(char::from(byte));
            } else {
                file.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{file}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CollaboratorError::Storage(e).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(CollaboratorError::Storage)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(CollaboratorError::Storage)?;
        std::fs::rename(&tmp, &path).map_err(CollaboratorError::Storage)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CollaboratorError::Storage(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assessforge_core::draft::DraftStore;
    use assessforge_core::wizard::{AssignmentKind, AuthoringSession};

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("drafts"));

        assert_eq!(store.get("ns:a").unwrap(), None);
        store.set("ns:a", "{\"x\":1}").unwrap();
        assert_eq!(store.get("ns:a").unwrap().as_deref(), Some("{\"x\":1}"));
        assert!(dir.path().join("drafts").join("ns%3Aa.json").exists());

        store.remove("ns:a").unwrap();
        assert_eq!(store.get("ns:a").unwrap(), None);
        store.remove("ns:a").unwrap();
    }

    #[test]
    fn keys_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("../../etc/passwd", "x").unwrap();
        assert!(store.path_for("../../etc/passwd").starts_with(dir.path()));
        assert_eq!(store.get("../../etc/passwd").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn similar_keys_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.set("ns:class/7", "draft-for-class/7").unwrap();
        store.set("ns:class:7", "draft-for-class:7").unwrap();
        store.set("ns:class_7", "draft-for-class_7").unwrap();

        assert_eq!(
            store.get("ns:class/7").unwrap().as_deref(),
            Some("draft-for-class/7")
        );
        assert_eq!(
            store.get("ns:class:7").unwrap().as_deref(),
            Some("draft-for-class:7")
        );
        assert_eq!(
            store.get("ns:class_7").unwrap().as_deref(),
            Some("draft-for-class_7")
        );

        store.remove("ns:class:7").unwrap();
        assert!(store.get("ns:class/7").unwrap().is_some());
    }

    #[test]
    fn backs_a_draft_store() {
        let dir = tempfile::tempdir().unwrap();
        let drafts = DraftStore::new(Arc::new(FileStore::new(dir.path())), "assessforge-draft");
        let mut session = AuthoringSession::new(AssignmentKind::FileSubmission);
        session.basic.title = "Poster upload".into();

        drafts.save("term-1", &session).unwrap();
        let snapshot = drafts.load("term-1").unwrap().unwrap();
        assert_eq!(snapshot.session.basic.title, "Poster upload");
    }
}
