use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use system::SessionId;
use tokio::fs;

const SNAPSHOT_EXTENSION: &str = "png";

/// Where saved boards end up.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn store(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    async fn list(&self) -> io::Result<Vec<String>>;

    async fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>>;
}

/// `2024-05-01 134501.123456-7.png`: local time with the colons removed,
/// then the requesting session.
pub fn snapshot_name(at: DateTime<Local>, session_id: SessionId) -> String {
    format!(
        "{}-{}.{}",
        at.format("%Y-%m-%d %H%M%S%.6f"),
        session_id,
        SNAPSHOT_EXTENSION
    )
}

/// Names handed to a store are plain file names.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

fn check_name(name: &str) -> io::Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid snapshot name {:?}", name),
        ))
    }
}

/// Stores each snapshot as a file in one directory, created on first use.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SnapshotStore for DirectoryStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        check_name(name)?;
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        log::info!("Saving board to {}", path.display());
        fs::write(path, bytes).await
    }

    async fn list(&self) -> io::Result<Vec<String>> {
        let mut result = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(result),
            Err(err) => return Err(err),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(file_name) = entry.file_name().into_string() {
                if file_name.ends_with(&format!(".{}", SNAPSHOT_EXTENSION)) {
                    result.push(file_name);
                }
            }
        }
        result.sort();
        Ok(result)
    }

    async fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        check_name(name)?;
        match fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Keeps snapshots in memory. Used by tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshots(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.snapshots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        check_name(name)?;
        self.snapshots().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.snapshots().keys().cloned().collect())
    }

    async fn load(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        check_name(name)?;
        Ok(self.snapshots().get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn it_should_name_snapshots_by_time_and_session() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 13, 45, 1).unwrap();
        assert_eq!(snapshot_name(at, 7), "2024-05-01 134501.000000-7.png");
    }

    #[test]
    fn it_should_reject_path_like_names() {
        assert!(is_valid_name("2024-05-01 134501.000000-7.png"));
        assert!(!is_valid_name("../escape.png"));
        assert!(!is_valid_name("a\\b.png"));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name(""));
    }

    #[tokio::test]
    async fn it_should_store_and_list_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("Saved Boards"));
        assert!(store.list().await.unwrap().is_empty());

        store.store("b.png", b"second").await.unwrap();
        store.store("a.png", b"first").await.unwrap();
        std::fs::write(dir.path().join("Saved Boards").join("notes.txt"), b"x").unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a.png", "b.png"]);
        assert_eq!(store.load("a.png").await.unwrap(), Some(b"first".to_vec()));
        assert_eq!(store.load("missing.png").await.unwrap(), None);
        assert!(store.store("../x.png", b"").await.is_err());
    }

    #[tokio::test]
    async fn it_should_keep_snapshots_in_memory() {
        let store = MemoryStore::new();
        store.store("a.png", b"bytes").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["a.png"]);
        assert_eq!(store.load("a.png").await.unwrap(), Some(b"bytes".to_vec()));
    }
}
