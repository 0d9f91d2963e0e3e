use anyhow::{bail, Context, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::model::BlobRef;
use crate::store::traits::BlobStore;

/// Blob store writing images under a local directory.
///
/// The blob id is the relative path; the url is that path appended to
/// `public_base_url`, which is expected to serve `root` (see `/media`).
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a blob path below `root`, rejecting anything that could escape it
    fn resolve(&self, blob_path: &str) -> Result<PathBuf> {
        let relative = Path::new(blob_path);
        if blob_path.is_empty() || blob_path.contains('\\') {
            bail!("invalid blob path {:?}", blob_path);
        }
        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                bail!("invalid blob path {:?}", blob_path);
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<BlobRef> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create blob directory for {}", path))?;
        }

        // Write to a sibling temp file first so readers never see a partial image
        let staging = target.with_extension("png.part");
        tokio::fs::write(&staging, &bytes)
            .await
            .with_context(|| format!("Failed to write blob {}", path))?;
        tokio::fs::rename(&staging, &target)
            .await
            .with_context(|| format!("Failed to finalize blob {}", path))?;

        Ok(BlobRef {
            url: format!("{}/{}", self.public_base_url, path),
            blob_id: path.to_string(),
        })
    }

    async fn delete(&self, blob_id: &str) -> Result<()> {
        let target = self.resolve(blob_id)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Blob {} already absent", blob_id);
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete blob {}", blob_id)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // Prefixes are directory-shaped ("wardrobe/U1/"), so walk from there
        let start = self.resolve(prefix.trim_end_matches('/'))?;
        let mut pending = vec![start];
        let mut found = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to list {}", dir.display()))
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().map(|ext| ext == "part").unwrap_or(false) {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let id = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if id.starts_with(prefix) {
                        found.push(id);
                    }
                }
            }
        }

        found.sort();
        Ok(found)
    }
}
