use crate::error::StoreError;
use std::sync::{Arc, Mutex, PoisonError};

/// Durable medium holding the serialized layout document.
///
/// The whole document is read once at hydration and written whole on flush.
#[allow(async_fn_in_trait)]
pub trait StorageBackend {
    /// `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<String>, StoreError>;

    async fn save(&self, payload: &str) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-process buffer. Clones share the same buffer, so a test (or a host
/// that owns the real storage) can inspect what was flushed.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(payload: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl StorageBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.contents())
    }

    async fn save(&self, payload: &str) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileBackend;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::StorageBackend;
    use crate::error::StoreError;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};
    use tracing::debug;

    /// JSON document on disk. Saves write a sibling temp file, then rename it
    /// over the document.
    #[derive(Debug, Clone)]
    pub struct FileBackend {
        path: PathBuf,
    }

    impl FileBackend {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        pub(crate) fn temp_path(&self) -> PathBuf {
            let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
            name.push(".tmp");
            self.path.with_file_name(name)
        }
    }

    impl StorageBackend for FileBackend {
        async fn load(&self) -> Result<Option<String>, StoreError> {
            match tokio::fs::read_to_string(&self.path).await {
                Ok(s) => Ok(Some(s)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        async fn save(&self, payload: &str) -> Result<(), StoreError> {
            if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir).await?;
            }
            let tmp = self.temp_path();
            tokio::fs::write(&tmp, payload).await?;
            tokio::fs::rename(&tmp, &self.path).await?;
            debug!(path = %self.path.display(), bytes = payload.len(), "layout document saved");
            Ok(())
        }

        async fn clear(&self) -> Result<(), StoreError> {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_shared() {
        let backend = MemoryBackend::new();
        let view = backend.clone();
        assert_eq!(backend.load().await.unwrap(), None);
        backend.save("{}").await.unwrap();
        assert_eq!(view.contents().as_deref(), Some("{}"));
        backend.clear().await.unwrap();
        assert_eq!(view.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("nested").join("layouts.json"));
        assert_eq!(backend.load().await.unwrap(), None);
        backend.save(r#"{"a":{}}"#).await.unwrap();
        assert_eq!(backend.load().await.unwrap().as_deref(), Some(r#"{"a":{}}"#));
        assert!(!backend.temp_path().exists());
        backend.clear().await.unwrap();
        backend.clear().await.unwrap();
        assert_eq!(backend.load().await.unwrap(), None);
    }
}
