//! Upload file store.
//!
//! Images live flat in one directory under generated `{uuid}{ext}` names.
//! Every name coming back from a client is validated before it touches the
//! filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::image::DEFAULT_EXTENSION;
use crate::types::{QcError, Result};

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open the store, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save bytes under a fresh unique name and return that name
    pub async fn save(&self, bytes: &[u8], original_name: Option<&str>) -> Result<String> {
        let name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let path = self.root.join(&name);
        tokio::fs::write(&path, bytes).await?;
        debug!(file = %name, bytes = bytes.len(), "Stored upload");
        Ok(name)
    }

    /// Resolve a stored name to its path
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(QcError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored file; returns whether it existed
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(file = %name, "Upload already missing on delete");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// `.ext` of the client's file name, or the default when absent or odd
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0');

    if invalid {
        return Err(QcError::Validation(format!("Invalid file name: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Some("part.png")), ".png");
        assert_eq!(extension_of(Some("photo.JPEG")), ".JPEG");
        assert_eq!(extension_of(Some("noext")), ".jpg");
        assert_eq!(extension_of(None), ".jpg");
        assert_eq!(extension_of(Some("x.p/ng")), ".jpg");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("abc.jpg").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b.jpg").is_err());
        assert!(validate_name("a\\b.jpg").is_err());
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path().join("uploads")).unwrap();

        let name = store.save(b"pixels", Some("widget.png")).await.unwrap();
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 36 + 4);

        assert_eq!(store.read(&name).await.unwrap(), b"pixels");
        assert!(store.remove(&name).await.unwrap());
        assert!(!store.remove(&name).await.unwrap());
        assert!(matches!(store.read(&name).await, Err(QcError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path()).unwrap();

        let a = store.save(b"1", None).await.unwrap();
        let b = store.save(b"2", None).await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.read("../secret").await,
            Err(QcError::Validation(_))
        ));
    }
}
