//! Local media storage.
//!
//! Uploads and derived variants live under one media root and are addressed
//! by storage-relative paths with forward slashes (`gallery/pool.jpg`). The
//! same relative path, prefixed with `media_url`, is the public URL.
//!
//! Relative paths are validated before they touch the filesystem: absolute
//! paths and `..` components are rejected.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
}

/// An uploaded original, bound to one entity field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceImage {
    pub path: String,
}

impl SourceImage {
    /// Wrap a stored field value. Empty or missing means "no image".
    pub fn from_field(value: Option<&str>) -> Option<Self> {
        value
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Self {
                path: p.to_string(),
            })
    }

    pub fn content_type(&self) -> &'static str {
        let ext = self
            .path
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            _ => "application/octet-stream",
        }
    }
}

/// Filesystem-backed media storage rooted at `media_root`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    media_url: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, media_url: &str) -> Self {
        let mut media_url = media_url.to_string();
        if !media_url.ends_with('/') {
            media_url.push('/');
        }
        Self {
            root: root.into(),
            media_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem path for a storage-relative path.
    pub fn path(&self, rel: &str) -> Result<PathBuf, StorageError> {
        let rel_path = Path::new(rel);
        let safe = !rel.is_empty()
            && rel_path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StorageError::InvalidPath(rel.to_string()));
        }
        Ok(self.root.join(rel_path))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).is_ok_and(|p| p.is_file())
    }

    /// Public URL of a stored file, relative to the site root.
    pub fn url(&self, rel: &str) -> String {
        format!("{}{}", self.media_url, rel.trim_start_matches('/'))
    }

    pub fn read(&self, rel: &str) -> Result<Vec<u8>, StorageError> {
        Ok(std::fs::read(self.path(rel)?)?)
    }

    /// Store `bytes` under `upload_to`, keeping the sanitized file name and
    /// appending `_1`, `_2`, … on collision. Returns the storage-relative path.
    pub fn save(&self, upload_to: &str, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let dir = upload_to.trim_matches('/');
        let (stem, ext) = split_filename(filename);
        let stem = if stem.is_empty() { "upload".to_string() } else { stem };

        let abs_dir = self.path(dir)?;
        std::fs::create_dir_all(&abs_dir)?;

        let mut n = 0u32;
        loop {
            let name = match (n, ext.as_str()) {
                (0, "") => stem.clone(),
                (0, e) => format!("{stem}.{e}"),
                (n, "") => format!("{stem}_{n}"),
                (n, e) => format!("{stem}_{n}.{e}"),
            };
            let rel = format!("{dir}/{name}");
            let abs = self.path(&rel)?;
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&abs)
            {
                Ok(mut file) => {
                    use std::io::Write;
                    file.write_all(bytes)?;
                    return Ok(rel);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub fn delete(&self, rel: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(rel)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored directory tree, tolerating its absence.
    pub fn delete_dir(&self, rel: &str) -> Result<(), StorageError> {
        match std::fs::remove_dir_all(self.path(rel)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Split an upload's file name into a sanitized stem and lowercase extension.
fn split_filename(filename: &str) -> (String, String) {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = match base.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s, e.to_ascii_lowercase()),
        _ => (base, String::new()),
    };
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let ext = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    (stem, ext)
}
