use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use uuid::Uuid;

/// Directories whose deletion left residue, retried by [`purge_pending_deletions`].
static PENDING_DELETIONS: LazyLock<Mutex<Vec<PathBuf>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

/// Create a uniquely named H2 home under the system temp directory.
///
/// A failed `create_dir_all` is only logged; the server reports the problem
/// when it tries to use the directory.
pub fn allocate_storage_dir() -> Result<PathBuf> {
    allocate_storage_dir_in(&std::env::temp_dir())
}

/// Create a uniquely named H2 home under `parent`.
pub fn allocate_storage_dir_in(parent: &Path) -> Result<PathBuf> {
    if parent.as_os_str().is_empty() {
        return Err(Error::configuration("Not able to create 'RandomH2Home'"));
    }
    let dir = parent.join(format!("H2_HOME_{}", Uuid::new_v4().simple()));

    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "RandomH2HomeDirectory was not created");
    } else {
        tracing::debug!(path = %dir.display(), "RandomH2HomeDirectory created");
    }
    Ok(dir)
}

/// Recursively delete `dir`.
///
/// Returns `true` when nothing is left. Residue is logged and queued for
/// [`purge_pending_deletions`].
pub async fn delete_storage_dir(dir: &Path) -> bool {
    if !dir.exists() {
        tracing::debug!(path = %dir.display(), "'dbDirectory' not existent");
        return true;
    }

    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        tracing::debug!(path = %dir.display(), error = %e, "Recursive delete failed");
    }

    if dir.exists() {
        tracing::warn!(path = %dir.display(), "'dbDirectory' still existent");
        queue_pending_deletion(dir);
        false
    } else {
        true
    }
}

/// Blocking variant of [`delete_storage_dir`] for finalizers.
pub(crate) fn delete_storage_dir_blocking(dir: &Path) -> bool {
    if !dir.exists() {
        return true;
    }
    let _ = std::fs::remove_dir_all(dir);
    if dir.exists() {
        tracing::warn!(path = %dir.display(), "'dbDirectory' still existent");
        queue_pending_deletion(dir);
        false
    } else {
        true
    }
}

fn queue_pending_deletion(dir: &Path) {
    let mut pending = PENDING_DELETIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if !pending.iter().any(|p| p == dir) {
        pending.push(dir.to_path_buf());
    }
}

/// Retry deleting every queued directory; returns how many are still left.
pub fn purge_pending_deletions() -> usize {
    let mut pending = PENDING_DELETIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    pending.retain(|dir| {
        if dir.exists() {
            let _ = std::fs::remove_dir_all(dir);
        }
        dir.exists()
    });
    if !pending.is_empty() {
        tracing::warn!(remaining = pending.len(), "Some 'dbDirectory' paths could not be deleted");
    }
    pending.len()
}
