//! Host Filesystem Access
//!
//! Minimal filesystem capability the bridge needs to resolve default
//! download destinations. Platforms differ in where evictable cache storage
//! lives (app cache dir, external cache, OPFS), so path resolution goes
//! through the host.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Directory for files the platform may evict when storage runs low.
    /// Default download destinations are placed beneath it.
    async fn cache_directory(&self) -> Result<PathBuf>;

    /// Create a directory and any missing parents.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Whether the path exists.
    async fn exists(&self, path: &Path) -> Result<bool>;
}
