//! Overlay File System
//!
//! Wraps an [`InMemoryFs`] with an optional read-only host-directory root.
//! Reads that miss the in-memory layer fall through to the host directory
//! and are materialized into the overlay; writes always land in the
//! overlay and shadow whatever the host holds. Deletes record a tombstone
//! so a later read doesn't resurrect the host copy.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::in_memory_fs::InMemoryFs;
use super::types::*;

pub struct OverlayFs {
    inner: InMemoryFs,
    host_root: Option<PathBuf>,
    tombstones: RwLock<HashSet<String>>,
}

impl OverlayFs {
    /// Overlay with no host root: behaves like a plain in-memory filesystem.
    pub fn new() -> Self {
        Self {
            inner: InMemoryFs::new(),
            host_root: None,
            tombstones: RwLock::new(HashSet::new()),
        }
    }

    /// Overlay backed by a host directory, mounted read-only at `/`.
    pub fn with_host_root(host_root: impl Into<PathBuf>) -> Self {
        Self {
            inner: InMemoryFs::new(),
            host_root: Some(host_root.into()),
            tombstones: RwLock::new(HashSet::new()),
        }
    }

    fn host_path(&self, root: &Path, path: &str) -> PathBuf {
        root.join(path.trim_start_matches('/'))
    }

    /// Materialize `path` from the host root into the overlay if it isn't
    /// already present and hasn't been deleted. No-op without a host root.
    async fn import_from_host(&self, path: &str) {
        if self.inner.exists(path).await {
            return;
        }
        let Some(root) = &self.host_root else { return };
        if self.tombstones.read().await.contains(path) {
            return;
        }

        let host_path = self.host_path(root, path);
        let Ok(meta) = tokio::fs::metadata(&host_path).await else { return };

        if meta.is_dir() {
            let _ = self.inner.mkdir(path, &MkdirOptions { recursive: true }).await;
            self.import_host_children(path, &host_path).await;
        } else if meta.is_file() {
            if let Ok(bytes) = tokio::fs::read(&host_path).await {
                let _ = self.inner.write_file(path, &bytes).await;
            }
        }
    }

    /// One level of lazy directory import: list the host directory and stub
    /// in each child (files fully read, directories created empty) so a
    /// subsequent `readdir`/`stat` on the child sees it without re-walking.
    async fn import_host_children(&self, dir_path: &str, host_dir: &Path) {
        let Ok(mut entries) = tokio::fs::read_dir(host_dir).await else { return };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let child_path = if dir_path == "/" {
                format!("/{}", name)
            } else {
                format!("{}/{}", dir_path, name)
            };

            if self.inner.exists(&child_path).await || self.tombstones.read().await.contains(&child_path) {
                continue;
            }

            let Ok(file_type) = entry.file_type().await else { continue };
            if file_type.is_dir() {
                let _ = self.inner.mkdir(&child_path, &MkdirOptions { recursive: true }).await;
            } else if file_type.is_file() {
                if let Ok(bytes) = tokio::fs::read(entry.path()).await {
                    let _ = self.inner.write_file(&child_path, &bytes).await;
                }
            }
        }
    }

    async fn tombstone(&self, path: &str) {
        self.tombstones.write().await.insert(path.to_string());
    }

    async fn untombstone(&self, path: &str) {
        self.tombstones.write().await.remove(path);
    }
}

impl Default for OverlayFs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystem for OverlayFs {
    async fn read_file(&self, path: &str) -> Result<String, FsError> {
        self.import_from_host(path).await;
        self.inner.read_file(path).await
    }

    async fn read_file_buffer(&self, path: &str) -> Result<Vec<u8>, FsError> {
        self.import_from_host(path).await;
        self.inner.read_file_buffer(path).await
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), FsError> {
        self.untombstone(path).await;
        self.inner.write_file(path, content).await
    }

    async fn append_file(&self, path: &str, content: &[u8]) -> Result<(), FsError> {
        self.import_from_host(path).await;
        self.untombstone(path).await;
        self.inner.append_file(path, content).await
    }

    async fn exists(&self, path: &str) -> bool {
        self.import_from_host(path).await;
        self.inner.exists(path).await
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        self.import_from_host(path).await;
        self.inner.stat(path).await
    }

    async fn lstat(&self, path: &str) -> Result<FsStat, FsError> {
        self.import_from_host(path).await;
        self.inner.lstat(path).await
    }

    async fn mkdir(&self, path: &str, options: &MkdirOptions) -> Result<(), FsError> {
        self.untombstone(path).await;
        self.inner.mkdir(path, options).await
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        self.import_from_host(path).await;
        self.inner.readdir(path).await
    }

    async fn readdir_with_file_types(&self, path: &str) -> Result<Vec<DirentEntry>, FsError> {
        self.import_from_host(path).await;
        self.inner.readdir_with_file_types(path).await
    }

    async fn rm(&self, path: &str, options: &RmOptions) -> Result<(), FsError> {
        self.import_from_host(path).await;
        self.inner.rm(path, options).await?;
        self.tombstone(path).await;
        Ok(())
    }

    async fn cp(&self, src: &str, dest: &str, options: &CpOptions) -> Result<(), FsError> {
        self.import_from_host(src).await;
        self.untombstone(dest).await;
        self.inner.cp(src, dest, options).await
    }

    async fn mv(&self, src: &str, dest: &str) -> Result<(), FsError> {
        self.import_from_host(src).await;
        self.untombstone(dest).await;
        self.inner.mv(src, dest).await?;
        self.tombstone(src).await;
        Ok(())
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<(), FsError> {
        self.import_from_host(path).await;
        self.inner.chmod(path, mode).await
    }

    async fn symlink(&self, target: &str, link_path: &str) -> Result<(), FsError> {
        self.untombstone(link_path).await;
        self.inner.symlink(target, link_path).await
    }

    async fn link(&self, existing_path: &str, new_path: &str) -> Result<(), FsError> {
        self.import_from_host(existing_path).await;
        self.untombstone(new_path).await;
        self.inner.link(existing_path, new_path).await
    }

    async fn readlink(&self, path: &str) -> Result<String, FsError> {
        self.import_from_host(path).await;
        self.inner.readlink(path).await
    }

    async fn realpath(&self, path: &str) -> Result<String, FsError> {
        self.import_from_host(path).await;
        self.inner.realpath(path).await
    }

    async fn utimes(&self, path: &str, mtime: std::time::SystemTime) -> Result<(), FsError> {
        self.import_from_host(path).await;
        self.inner.utimes(path, mtime).await
    }

    fn resolve_path(&self, base: &str, path: &str) -> String {
        self.inner.resolve_path(base, path)
    }

    fn get_all_paths(&self) -> Vec<String> {
        // Only paths already materialized into the overlay are visible here;
        // unvisited host-only paths are not walked eagerly. Glob expansion
        // and similar enumeration only see what's been touched so far.
        self.inner.get_all_paths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn make_host_dir() -> tempfile_like::TempDir {
        tempfile_like::TempDir::new()
    }

    // Minimal scoped temp-dir helper; avoids pulling in a dev-dependency
    // just for these tests.
    mod tempfile_like {
        use std::path::PathBuf;

        pub struct TempDir(PathBuf);

        impl TempDir {
            pub fn new() -> Self {
                let mut path = std::env::temp_dir();
                let unique = format!("just-bash-overlay-test-{}", std::process::id());
                path.push(unique);
                let _ = std::fs::create_dir_all(&path);
                Self(path)
            }

            pub fn path(&self) -> &std::path::Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    #[tokio::test]
    async fn reads_fall_through_to_host() {
        let dir = make_host_dir().await;
        let mut f = std::fs::File::create(dir.path().join("hello.txt")).unwrap();
        f.write_all(b"hi from host").unwrap();

        let overlay = OverlayFs::with_host_root(dir.path());
        let content = overlay.read_file("/hello.txt").await.unwrap();
        assert_eq!(content, "hi from host");
    }

    #[tokio::test]
    async fn writes_shadow_the_host_copy() {
        let dir = make_host_dir().await;
        std::fs::write(dir.path().join("f.txt"), "host").unwrap();

        let overlay = OverlayFs::with_host_root(dir.path());
        overlay.write_file("/f.txt", b"overlay").await.unwrap();

        assert_eq!(overlay.read_file("/f.txt").await.unwrap(), "overlay");
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "host");
    }

    #[tokio::test]
    async fn delete_tombstones_the_host_copy() {
        let dir = make_host_dir().await;
        std::fs::write(dir.path().join("f.txt"), "host").unwrap();

        let overlay = OverlayFs::with_host_root(dir.path());
        assert!(overlay.exists("/f.txt").await);
        overlay.rm("/f.txt", &RmOptions::default()).await.unwrap();

        assert!(!overlay.exists("/f.txt").await);
    }
}
