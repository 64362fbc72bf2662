//! Validation of files shared into the converter.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::media::{convertible_targets, extension_from_mime, is_mime_type, MimeType};

/// Why a shared file was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    /// The request names no file, or the file does not exist.
    #[error("Missing file: {0}")]
    MissingFile(PathBuf),

    /// No mime type was given and none could be inferred from the file name.
    #[error("Mime type not found: {0}")]
    UnknownMime(PathBuf),

    /// The mime type string is malformed.
    #[error("Invalid mime type: {0}")]
    InvalidMime(String),

    /// The mime type has no known file extension.
    #[error("Unknown file extension of this mime type: {0}")]
    UnknownExtension(String),

    /// The mime type cannot be converted into anything.
    #[error("Cannot convert from this mime type: {0}")]
    NotConvertible(String),
}

/// A file handed to the converter, with an optional declared mime type.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    pub path: PathBuf,
    pub mime: Option<String>,
}

impl ShareRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Checks the request and works out what the file can become.
    pub fn validate(&self) -> Result<ShareInfo, ShareError> {
        ShareInfo::from_request(self)
    }
}

/// A validated shared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareInfo {
    pub path: PathBuf,
    pub mime: String,
    /// Extension the imported copy is stored under.
    pub extension: String,
    /// Types the file can be converted into.
    pub convertible_to: Vec<MimeType>,
}

impl ShareInfo {
    pub fn from_request(request: &ShareRequest) -> Result<Self, ShareError> {
        if request.path.as_os_str().is_empty() || !request.path.is_file() {
            return Err(ShareError::MissingFile(request.path.clone()));
        }

        let mime = match &request.mime {
            Some(mime) => mime.trim().to_ascii_lowercase(),
            None => infer_mime(&request.path)
                .ok_or_else(|| ShareError::UnknownMime(request.path.clone()))?,
        };
        if !is_mime_type(&mime) {
            return Err(ShareError::InvalidMime(mime));
        }

        let extension = extension_from_mime(&mime)
            .ok_or_else(|| ShareError::UnknownExtension(mime.clone()))?
            .to_string();
        let convertible_to =
            convertible_targets(&mime).ok_or_else(|| ShareError::NotConvertible(mime.clone()))?;

        Ok(Self {
            path: request.path.clone(),
            mime,
            extension,
            convertible_to,
        })
    }

    /// Catalogue type of the shared file.
    pub fn mime_type(&self) -> Option<MimeType> {
        MimeType::from_mime(&self.mime)
    }

    pub fn can_convert_to(&self, target: MimeType) -> bool {
        self.convertible_to.contains(&target)
    }
}

/// Mime type implied by a file's extension.
fn infer_mime(path: &Path) -> Option<String> {
    MimeType::from_path(path).map(|m| m.mime())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_file(name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, b"data").unwrap();
        (dir, path)
    }

    #[test]
    fn test_valid_with_declared_mime() {
        let (_dir, path) = shared_file("clip.bin");
        let info = ShareRequest::new(&path).with_mime("video/mp4").validate().unwrap();
        assert_eq!(info.mime, "video/mp4");
        assert_eq!(info.extension, "mp4");
        assert!(info.can_convert_to(MimeType::Gif));
        assert!(!info.can_convert_to(MimeType::Quicktime));
        assert_eq!(info.mime_type(), Some(MimeType::Quicktime));
    }

    #[test]
    fn test_infers_mime_from_extension() {
        let (_dir, path) = shared_file("photo.JPG");
        let info = ShareRequest::new(&path).validate().unwrap();
        assert_eq!(info.mime, "image/jpeg");
        assert_eq!(info.extension, "jpeg");
    }

    #[test]
    fn test_missing_file() {
        let err = ShareRequest::new("/nonexistent/clip.mp4").validate().unwrap_err();
        assert!(matches!(err, ShareError::MissingFile(_)));
        let err = ShareRequest::new("").validate().unwrap_err();
        assert!(matches!(err, ShareError::MissingFile(_)));
    }

    #[test]
    fn test_unknown_mime() {
        let (_dir, path) = shared_file("notes.txt");
        let err = ShareRequest::new(&path).validate().unwrap_err();
        assert!(matches!(err, ShareError::UnknownMime(_)));
    }

    #[test]
    fn test_invalid_mime() {
        let (_dir, path) = shared_file("clip.mp4");
        let err = ShareRequest::new(&path).with_mime("video").validate().unwrap_err();
        assert_eq!(err, ShareError::InvalidMime("video".to_string()));
    }

    #[test]
    fn test_unknown_extension() {
        let (_dir, path) = shared_file("song.flac");
        let err = ShareRequest::new(&path)
            .with_mime("audio/flac")
            .validate()
            .unwrap_err();
        assert_eq!(err, ShareError::UnknownExtension("audio/flac".to_string()));
    }
}
