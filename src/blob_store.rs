//! Object storage for listing images.
//!
//! Stored objects are addressed by URL. The only structure the rest of the
//! crate relies on is that a URL ends in `<folder>/<stem>.<ext>`, from which
//! [object_key] derives the key that [BlobStore::delete] accepts.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use axum::body::Bytes;
use regex::Regex;
use std::{path::PathBuf, sync::OnceLock};
use uuid::Uuid;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the public URL of the new object.
    async fn put(&self, bytes: Bytes, suggested_name: &str) -> Result<String>;
    /// Delete the object behind `key`, as produced by [object_key].
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Derive the deletable key from an object URL: the last two path segments,
/// with the file extension stripped.
///
/// `https://cdn.example.com/upload/v1/properties/abc123.jpg` becomes
/// `properties/abc123`.
pub fn object_key(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let mut segments = path.rsplit('/');
    let file_name = segments.next()?;
    let folder = segments.next()?;
    let stem = file_name.split('.').next()?;
    if folder.is_empty() || stem.is_empty() {
        return None;
    }

    Some(format!("{folder}/{stem}"))
}

fn safe_segment(segment: &str) -> bool {
    static SAFE: OnceLock<Regex> = OnceLock::new();
    SAFE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+$").expect("segment pattern compiles")
    })
    .is_match(segment)
}

fn extension_of(suggested_name: &str) -> String {
    match suggested_name.rsplit_once('.') {
        Some((_, ext)) if safe_segment(ext) => ext.to_ascii_lowercase(),
        _ => "bin".to_string(),
    }
}

/// Stores images on local disk under `<root>/<folder>/`, to be served
/// statically at `public_base`.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
    folder: String,
    public_base: String,
}

impl LocalBlobStore {
    pub fn new(
        root: impl Into<PathBuf>,
        folder: impl Into<String>,
        public_base: impl Into<String>,
    ) -> Result<Self> {
        let folder = folder.into();
        if !safe_segment(&folder) {
            bail!("blob folder {folder:?} must be a single plain path segment");
        }
        Ok(Self {
            root: root.into(),
            folder,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, bytes: Bytes, suggested_name: &str) -> Result<String> {
        let dir = self.root.join(&self.folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let file_name =
            format!("{}.{}", Uuid::new_v4().simple(), extension_of(suggested_name));
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        Ok(format!("{}/{}/{}", self.public_base, self.folder, file_name))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let Some((folder, stem)) = key.split_once('/') else {
            bail!("malformed object key {key:?}");
        };
        if !safe_segment(folder) || !safe_segment(stem) {
            bail!("malformed object key {key:?}");
        }

        let dir = self.root.join(folder);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("reading {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(stem) {
                tokio::fs::remove_file(&path)
                    .await
                    .with_context(|| format!("removing {}", path.display()))?;
                return Ok(());
            }
        }

        bail!("no object stored under {key:?}")
    }
}
