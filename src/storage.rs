//! Image uploads: validation, randomized on-disk names and removal.

use axum::body::Bytes;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::config::PUBLIC_UPLOAD_PREFIX;

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

lazy_static::lazy_static! {
    /// Word characters, dash, dot and space only.
    static ref FILENAME_SAFE: Regex = Regex::new(r"^[\w\-. ]+$").unwrap();
}

/// One `images` part of a multipart form.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    /// Buffered content. Left empty once `size` passed the cap.
    pub data: Bytes,
    /// Total size of the part as received.
    pub size: usize,
}

/// Why an uploaded file was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing filename")]
    EmptyName,
    #[error("unsafe filename {0:?}")]
    UnsafeName(String),
    #[error("empty file")]
    Empty,
    #[error("file too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("disallowed type {0:?}")]
    DisallowedType(String),
}

pub fn is_safe_filename(name: &str) -> bool {
    FILENAME_SAFE.is_match(name)
}

/// Mime type implied by a filename's extension, if the extension is known.
fn guess_mime_from_extension(name: &str) -> Option<&'static str> {
    mime_guess::from_path(name).first_raw()
}

fn random_prefix() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Directory of uploaded images, served under [`PUBLIC_UPLOAD_PREFIX`].
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            root: root.into(),
            max_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    pub fn check(&self, file: &UploadedFile) -> Result<(), Rejection> {
        let name = file.file_name.as_deref().unwrap_or("").trim();
        if name.is_empty() {
            return Err(Rejection::EmptyName);
        }
        let name = file.file_name.as_deref().unwrap_or("");
        if !is_safe_filename(name) {
            return Err(Rejection::UnsafeName(name.to_string()));
        }
        if file.size == 0 {
            return Err(Rejection::Empty);
        }
        if file.size > self.max_size {
            return Err(Rejection::TooLarge {
                size: file.size,
                max: self.max_size,
            });
        }

        let declared = file.content_type.as_deref().unwrap_or("");
        if !ALLOWED_IMAGE_TYPES.contains(&declared) {
            return Err(Rejection::DisallowedType(declared.to_string()));
        }
        if let Some(guessed) = guess_mime_from_extension(name) {
            if !ALLOWED_IMAGE_TYPES.contains(&guessed) {
                return Err(Rejection::DisallowedType(guessed.to_string()));
            }
        }

        Ok(())
    }

    /// Writes an already checked file and returns its public url.
    async fn write(&self, file: &UploadedFile) -> std::io::Result<String> {
        let name = file.file_name.as_deref().unwrap_or("image");
        let stored = format!("{}_{}", random_prefix(), name);
        tokio::fs::write(self.root.join(&stored), &file.data).await?;

        tracing::info!(file = %stored, size = file.size, "image stored");
        Ok(format!("{PUBLIC_UPLOAD_PREFIX}/{stored}"))
    }

    /// Stores every file that passes [`ImageStore::check`], in order, and
    /// returns their urls. Rejected files are skipped. If a write fails the
    /// files already written for this batch are removed.
    pub async fn store_accepted(&self, files: &[UploadedFile]) -> std::io::Result<Vec<String>> {
        self.ensure_dir().await?;

        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            if let Err(reason) = self.check(file) {
                tracing::warn!(
                    file = file.file_name.as_deref().unwrap_or(""),
                    reason = %reason,
                    "image rejected"
                );
                continue;
            }

            match self.write(file).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    self.discard(&urls).await;
                    return Err(e);
                }
            }
        }

        Ok(urls)
    }

    /// On-disk path for a public url, if the url points into this store.
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(PUBLIC_UPLOAD_PREFIX)?.strip_prefix('/')?;
        if name.starts_with('.') || !is_safe_filename(name) {
            return None;
        }
        Some(self.root.join(name))
    }

    /// Deletes the file behind `url`. Returns false when there was nothing to delete.
    pub async fn remove(&self, url: &str) -> std::io::Result<bool> {
        let Some(path) = self.path_for(url) else {
            tracing::warn!(url = %url, "refusing to remove path outside the upload directory");
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(url = %url, "image removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Best-effort removal; failures are logged.
    pub async fn discard(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.remove(url).await {
                tracing::error!(url = %url, error = %e, "failed to remove image");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_IMAGE_SIZE;

    fn upload(name: &str, content_type: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_string()),
            content_type: Some(content_type.to_string()),
            data: Bytes::from(vec![0x89; size]),
            size,
        }
    }

    fn store(dir: &tempfile::TempDir) -> ImageStore {
        ImageStore::new(dir.path().join("uploads"), DEFAULT_MAX_IMAGE_SIZE)
    }

    #[test]
    fn test_safe_filename() {
        assert!(is_safe_filename("photo-1 final.png"));
        assert!(is_safe_filename("été.jpg"));
        assert!(!is_safe_filename("../../etc/passwd"));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename("a\\b.png"));
        assert!(!is_safe_filename("x;rm.png"));
        assert!(!is_safe_filename(""));
    }

    #[test]
    fn test_check_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert_eq!(store.check(&upload("  ", "image/png", 10)), Err(Rejection::EmptyName));
        assert!(matches!(
            store.check(&upload("../../etc/passwd", "image/png", 10)),
            Err(Rejection::UnsafeName(_))
        ));
        assert_eq!(store.check(&upload("a.png", "image/png", 0)), Err(Rejection::Empty));
        assert!(matches!(
            store.check(&upload("a.png", "image/png", 6 * 1024 * 1024)),
            Err(Rejection::TooLarge { .. })
        ));
        assert!(matches!(
            store.check(&upload("a.png", "text/plain", 10)),
            Err(Rejection::DisallowedType(_))
        ));
        assert!(matches!(
            store.check(&upload("a.svg", "image/png", 10)),
            Err(Rejection::DisallowedType(_))
        ));
    }

    #[test]
    fn test_extension_must_agree_with_image_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        for name in ["evil.py", "page.xhtml", "notes.md", "run.bat"] {
            assert!(
                matches!(
                    store.check(&upload(name, "image/png", 10)),
                    Err(Rejection::DisallowedType(_))
                ),
                "{name} should be rejected"
            );
        }
        assert!(store.check(&upload("photo.jpeg", "image/jpeg", 10)).is_ok());
    }

    #[test]
    fn test_check_accepts_allowed_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert!(store.check(&upload("a.png", "image/png", 4 * 1024 * 1024)).is_ok());
        assert!(store.check(&upload("b.JPG", "image/jpeg", 10)).is_ok());
        assert!(store.check(&upload("c.webp", "image/webp", 10)).is_ok());
        // Unknown extension: only the declared type counts.
        assert!(store.check(&upload("scan", "image/gif", 10)).is_ok());
        assert!(store.check(&upload("a.png", "image/png", DEFAULT_MAX_IMAGE_SIZE)).is_ok());
    }

    #[tokio::test]
    async fn test_store_accepted_skips_rejected_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let files = vec![
            upload("one.png", "image/png", 16),
            upload("../../etc/passwd", "image/png", 16),
            upload("big.png", "image/png", 6 * 1024 * 1024),
            upload("two.gif", "image/gif", 16),
        ];
        let urls = store.store_accepted(&files).await.unwrap();

        assert_eq!(urls.len(), 2);
        assert!(urls[0].starts_with("/static/uploads/") && urls[0].ends_with("_one.png"));
        assert!(urls[1].ends_with("_two.gif"));
        for url in &urls {
            assert!(store.path_for(url).unwrap().exists());
        }
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 2);
        assert!(!dir.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_stored_names_are_randomized() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let files = vec![upload("same.png", "image/png", 4), upload("same.png", "image/png", 4)];
        let urls = store.store_accepted(&files).await.unwrap();
        assert_ne!(urls[0], urls[1]);

        let name = urls[0].rsplit('/').next().unwrap();
        let (prefix, rest) = name.split_once('_').unwrap();
        assert_eq!(prefix.len(), 16);
        assert!(prefix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "same.png");
    }

    #[tokio::test]
    async fn test_remove_only_touches_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let urls = store
            .store_accepted(&[upload("gone.png", "image/png", 8)])
            .await
            .unwrap();
        assert!(store.remove(&urls[0]).await.unwrap());
        assert!(!store.remove(&urls[0]).await.unwrap());

        assert!(store.path_for("/static/uploads/../secret").is_none());
        assert!(store.path_for("/elsewhere/x.png").is_none());
        assert!(!store.remove("/static/uploads/../../Cargo.toml").await.unwrap());
    }
}
