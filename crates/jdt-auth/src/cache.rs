//! Key-value storage capability behind the credential store
//!
//! `Cache` is the injected storage seam: the token manager never touches the
//! filesystem directly. `DiskCache` persists entries as files under a root
//! directory so a token survives process restarts; `MemoryCache` keeps them
//! in-process.
//!
//! Uses `Pin<Box<dyn Future>>` return types so stores can be shared as
//! `Arc<dyn Cache>`.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Boxed future returned by `Cache` operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Who may read a stored entry.
///
/// On disk, `Public` entries are mode 0644 and `Private` ones 0600.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

/// Persistent key-value storage.
pub trait Cache: Send + Sync {
    fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool>;

    /// Read an entry. Absent keys are `Ok(None)`, not an error.
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;

    /// Write an entry.
    ///
    /// With `visibility: None` an existing entry keeps its current
    /// visibility and a new entry is `Private`.
    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        visibility: Option<Visibility>,
    ) -> CacheFuture<'a, ()>;
}

/// Distinguishes temp files of concurrent writes within one process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// File-backed cache rooted at a directory. Keys are relative paths.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root. Absolute keys and `..`
    /// components are rejected.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(Error::Cache(format!("invalid cache key: {key:?}")));
        }
        Ok(self.root.join(relative))
    }

    async fn write_atomic(
        &self,
        key: &str,
        value: String,
        visibility: Option<Visibility>,
    ) -> Result<()> {
        let path = self.path_for(key)?;
        let dir = path
            .parent()
            .ok_or_else(|| Error::Cache("cache path has no parent directory".into()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Cache(format!("creating cache directory: {e}")))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = dir.join(format!(
            ".{file_name}.tmp.{}.{}",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        tokio::fs::write(&tmp_path, value.as_bytes())
            .await
            .map_err(|e| Error::Cache(format!("writing temp cache file: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = match visibility {
                Some(Visibility::Public) => 0o644,
                Some(Visibility::Private) => 0o600,
                None => tokio::fs::metadata(&path)
                    .await
                    .map(|m| m.permissions().mode() & 0o777)
                    .unwrap_or(0o600),
            };
            tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| Error::Cache(format!("setting cache file permissions: {e}")))?;
        }
        #[cfg(not(unix))]
        let _ = visibility;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Error::Cache(format!("renaming temp cache file: {e}")))?;

        debug!(path = %path.display(), "persisted cache entry");
        Ok(())
    }
}

impl Cache for DiskCache {
    fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            tokio::fs::try_exists(&path)
                .await
                .map_err(|e| Error::Cache(format!("checking cache file: {e}")))
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(Error::Cache(format!("reading cache file: {e}"))),
            }
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        visibility: Option<Visibility>,
    ) -> CacheFuture<'a, ()> {
        Box::pin(self.write_atomic(key, value, visibility))
    }
}

/// In-process cache. Counts reads so callers can assert on cache traffic.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Visibility)>>,
    reads: AtomicUsize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub async fn visibility(&self, key: &str) -> Option<Visibility> {
        self.entries.lock().await.get(key).map(|(_, v)| *v)
    }
}

impl Cache for MemoryCache {
    fn has<'a>(&'a self, key: &'a str) -> CacheFuture<'a, bool> {
        Box::pin(async move { Ok(self.entries.lock().await.contains_key(key)) })
    }

    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
        Box::pin(async move {
            self.reads.fetch_add(1, Ordering::Relaxed);
            Ok(self.entries.lock().await.get(key).map(|(v, _)| v.clone()))
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        visibility: Option<Visibility>,
    ) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.lock().await;
            let visibility = visibility
                .or_else(|| entries.get(key).map(|(_, v)| *v))
                .unwrap_or(Visibility::Private);
            entries.insert(key.to_string(), (value, visibility));
            Ok(())
        })
    }
}
