//! On-disk storage for uploaded files and their thumbnails.
//!
//! Layout under the upload root:
//! `<root>/<category>/<uuid><ext>` for blobs and `<root>/thumbnails/<saved_name>`
//! for image thumbnails.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

const THUMBNAIL_DIR: &str = "thumbnails";

/// What an upload is for. Decides the directory and accepted content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    Profile,
    Document,
}

impl UploadCategory {
    pub const ALL: [UploadCategory; 2] = [UploadCategory::Profile, UploadCategory::Document];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(UploadCategory::Profile),
            "document" => Some(UploadCategory::Document),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::Profile => "profile",
            UploadCategory::Document => "document",
        }
    }

    pub fn dir_name(&self) -> &'static str {
        self.as_str()
    }

    pub fn allowed_content_types(&self) -> &'static [&'static str] {
        match self {
            UploadCategory::Profile => &["image/jpeg", "image/png"],
            UploadCategory::Document => &["application/pdf"],
        }
    }

    pub fn allows(&self, content_type: &str) -> bool {
        self.allowed_content_types().contains(&content_type)
    }
}

/// Whether a thumbnail should be generated for this content type.
pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// File extension (with leading dot) for a stored blob.
///
/// Uses the original name's extension when it is short and alphanumeric,
/// otherwise one derived from the content type.
pub fn extension_for(original_name: &str, content_type: &str) -> String {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    if let Some(ext) = from_name {
        return format!(".{}", ext.to_ascii_lowercase());
    }

    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "application/pdf" => ".pdf",
        _ => "",
    }
    .to_string()
}

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    /// A stored name that would escape the upload root.
    InvalidName,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "Storage I/O error: {}", e),
            StorageError::InvalidName => write!(f, "Invalid stored file name"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::InvalidName => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

fn check_name(saved_name: &str) -> Result<&str, StorageError> {
    let valid = !saved_name.is_empty()
        && !saved_name.starts_with('.')
        && saved_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if valid {
        Ok(saved_name)
    } else {
        Err(StorageError::InvalidName)
    }
}

/// Treat "not found" as a successful no-op for removals.
fn removed(result: std::io::Result<()>) -> Result<bool, StorageError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Cheap to clone; holds only the root path.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create the upload root and its subdirectories if missing.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        for category in UploadCategory::ALL {
            tokio::fs::create_dir_all(root.join(category.dir_name())).await?;
        }
        tokio::fs::create_dir_all(root.join(THUMBNAIL_DIR)).await?;
        Ok(Self { root })
    }

    pub fn blob_path(
        &self,
        category: UploadCategory,
        saved_name: &str,
    ) -> Result<PathBuf, StorageError> {
        Ok(self
            .root
            .join(category.dir_name())
            .join(check_name(saved_name)?))
    }

    pub fn thumbnail_path(&self, saved_name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(THUMBNAIL_DIR).join(check_name(saved_name)?))
    }

    /// Write a new blob under a fresh random name and return that name.
    pub async fn save(
        &self,
        category: UploadCategory,
        extension: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let saved_name = format!("{}{}", Uuid::new_v4(), extension);
        tokio::fs::write(self.blob_path(category, &saved_name)?, data).await?;
        Ok(saved_name)
    }

    /// Read a blob. Returns `None` if it is not on disk.
    pub async fn read(
        &self,
        category: UploadCategory,
        saved_name: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.blob_path(category, saved_name)?).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns false if the blob was already gone.
    pub async fn remove(
        &self,
        category: UploadCategory,
        saved_name: &str,
    ) -> Result<bool, StorageError> {
        removed(tokio::fs::remove_file(self.blob_path(category, saved_name)?).await)
    }

    pub async fn save_thumbnail(&self, saved_name: &str, data: &[u8]) -> Result<(), StorageError> {
        tokio::fs::write(self.thumbnail_path(saved_name)?, data).await?;
        Ok(())
    }

    pub async fn remove_thumbnail(&self, saved_name: &str) -> Result<bool, StorageError> {
        removed(tokio::fs::remove_file(self.thumbnail_path(saved_name)?).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(UploadCategory::parse("profile"), Some(UploadCategory::Profile));
        assert_eq!(UploadCategory::parse("document"), Some(UploadCategory::Document));
        assert_eq!(UploadCategory::parse("avatar"), None);
        assert_eq!(UploadCategory::parse("Profile"), None);
    }

    #[test]
    fn test_category_content_types() {
        assert!(UploadCategory::Profile.allows("image/png"));
        assert!(UploadCategory::Profile.allows("image/jpeg"));
        assert!(!UploadCategory::Profile.allows("application/pdf"));
        assert!(UploadCategory::Document.allows("application/pdf"));
        assert!(!UploadCategory::Document.allows("image/gif"));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("me.PNG", "image/png"), ".png");
        assert_eq!(extension_for("report.pdf", "application/pdf"), ".pdf");
        assert_eq!(extension_for("noext", "image/jpeg"), ".jpg");
        assert_eq!(extension_for("weird.p/df", "application/pdf"), ".pdf");
        assert_eq!(extension_for("noext", "text/plain"), "");
    }

    #[test]
    fn test_rejects_path_traversal() {
        let storage = FileStorage {
            root: PathBuf::from("/tmp/uploads"),
        };
        assert!(storage.blob_path(UploadCategory::Profile, "../secret").is_err());
        assert!(storage.thumbnail_path("a/b.png").is_err());
        assert!(storage.thumbnail_path("").is_err());
        assert!(storage.blob_path(UploadCategory::Profile, "abc-123.png").is_ok());
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::init(dir.path()).await.unwrap();

        let name = storage
            .save(UploadCategory::Document, ".pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert!(name.ends_with(".pdf"));
        assert!(dir.path().join("document").join(&name).exists());

        let data = storage.read(UploadCategory::Document, &name).await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"%PDF-1.4"[..]));

        assert!(storage.remove(UploadCategory::Document, &name).await.unwrap());
        assert!(!storage.remove(UploadCategory::Document, &name).await.unwrap());
        assert!(storage.read(UploadCategory::Document, &name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_thumbnail_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::init(dir.path()).await.unwrap();

        storage.save_thumbnail("x.png", b"jpeg").await.unwrap();
        assert!(dir.path().join("thumbnails").join("x.png").exists());
        assert!(storage.remove_thumbnail("x.png").await.unwrap());
        assert!(!storage.remove_thumbnail("x.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::init(dir.path()).await.unwrap();

        let a = storage.save(UploadCategory::Profile, ".png", b"a").await.unwrap();
        let b = storage.save(UploadCategory::Profile, ".png", b"b").await.unwrap();
        assert_ne!(a, b);
    }
}
