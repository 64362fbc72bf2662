//! Scratch directories for imported inputs and produced outputs.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub const INPUT_DIR_NAME: &str = "input";
pub const OUTPUT_DIR_NAME: &str = "output";

/// Errors from scratch directory operations.
#[derive(Debug, Error)]
pub enum FilesError {
    /// File to import does not exist or is not a regular file.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// File is not a regular file inside the output directory.
    #[error("File cannot be exported: {path}. It must be a file in the output directory ({output_dir})")]
    NotExportable { path: PathBuf, output_dir: PathBuf },

    /// I/O error on a specific path.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FilesError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The input and output directories under one root.
///
/// Inputs are copied into `input/` under fresh names before processing;
/// outputs are written to `output/`, the only place files are exported from.
#[derive(Debug, Clone)]
pub struct AppDirs {
    input: PathBuf,
    output: PathBuf,
}

impl AppDirs {
    /// Creates both directories under `root` if missing.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, FilesError> {
        let root = root.as_ref();
        let dirs = Self {
            input: root.join(INPUT_DIR_NAME),
            output: root.join(OUTPUT_DIR_NAME),
        };
        dirs.ensure().await?;
        Ok(dirs)
    }

    async fn ensure(&self) -> Result<(), FilesError> {
        for dir in [&self.input, &self.output] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| FilesError::io(dir, e))?;
        }
        Ok(())
    }

    pub fn input_dir(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Copies `source` into the input directory under a new unique name.
    pub async fn import(&self, source: &Path, extension: &str) -> Result<PathBuf, FilesError> {
        let is_file = tokio::fs::metadata(source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(FilesError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        self.ensure().await?;
        let name = format!("{}.{}", Uuid::new_v4(), extension.trim_start_matches('.'));
        let target = self.input.join(name);
        tokio::fs::copy(source, &target)
            .await
            .map_err(|e| FilesError::io(&target, e))?;
        debug!("Imported {} as {}", source.display(), target.display());
        Ok(target)
    }

    /// Where the output for `input` with the given extension goes.
    pub fn output_for(&self, input: &Path, extension: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.output
            .join(format!("{}.{}", stem, extension.trim_start_matches('.')))
    }

    /// Deletes everything in the input directory. Returns how many entries were removed.
    pub async fn clear_input(&self) -> Result<usize, FilesError> {
        clear_dir(&self.input).await
    }

    /// Deletes everything in the output directory. Returns how many entries were removed.
    pub async fn clear_output(&self) -> Result<usize, FilesError> {
        clear_dir(&self.output).await
    }

    /// Whether `file` exists, is a regular file, and sits directly in the output directory.
    pub async fn can_export(&self, file: &Path) -> bool {
        let Ok(meta) = tokio::fs::metadata(file).await else {
            return false;
        };
        if !meta.is_file() {
            return false;
        }
        let Some(parent) = file.parent() else {
            return false;
        };
        match (
            tokio::fs::canonicalize(parent).await,
            tokio::fs::canonicalize(&self.output).await,
        ) {
            (Ok(parent), Ok(output)) => parent == output,
            _ => false,
        }
    }

    /// Like [`can_export`](Self::can_export), but fails with the reason.
    pub async fn ensure_exportable(&self, file: &Path) -> Result<(), FilesError> {
        if self.can_export(file).await {
            Ok(())
        } else {
            Err(FilesError::NotExportable {
                path: file.to_path_buf(),
                output_dir: self.output.clone(),
            })
        }
    }

    /// Copies `file` into the output directory unless a file with that name is already there.
    pub async fn copy_to_output(&self, file: &Path) -> Result<PathBuf, FilesError> {
        let name = file.file_name().ok_or_else(|| FilesError::SourceNotFound {
            path: file.to_path_buf(),
        })?;
        let target = self.output.join(name);
        if !tokio::fs::try_exists(&target)
            .await
            .map_err(|e| FilesError::io(&target, e))?
        {
            self.ensure().await?;
            tokio::fs::copy(file, &target)
                .await
                .map_err(|e| FilesError::io(file, e))?;
        }
        Ok(target)
    }
}

async fn clear_dir(dir: &Path) -> Result<usize, FilesError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(FilesError::io(dir, e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| FilesError::io(dir, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| FilesError::io(&path, e))?;
        let result = if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        result.map_err(|e| FilesError::io(&path, e))?;
        removed += 1;
    }

    if removed > 0 {
        info!("Cleared {} entries from {}", removed, dir.display());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (tempfile::TempDir, AppDirs) {
        let root = tempfile::tempdir().unwrap();
        let dirs = AppDirs::open(root.path()).await.unwrap();
        (root, dirs)
    }

    #[tokio::test]
    async fn test_open_creates_directories() {
        let (root, dirs) = setup().await;
        assert!(root.path().join("input").is_dir());
        assert!(root.path().join("output").is_dir());
        assert_eq!(dirs.output_dir(), root.path().join("output"));
    }

    #[tokio::test]
    async fn test_import_copies_under_unique_name() {
        let (root, dirs) = setup().await;
        let source = root.path().join("shared.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();

        let first = dirs.import(&source, "mp4").await.unwrap();
        let second = dirs.import(&source, ".mp4").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(first.parent().unwrap(), dirs.input_dir());
        assert_eq!(first.extension().unwrap(), "mp4");
        assert_eq!(tokio::fs::read(&first).await.unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_import_missing_source() {
        let (root, dirs) = setup().await;
        let result = dirs.import(&root.path().join("nope.mp4"), "mp4").await;
        assert!(matches!(result, Err(FilesError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_output_for() {
        let (_root, dirs) = setup().await;
        let out = dirs.output_for(Path::new("/x/input/abc.mp4"), "gif");
        assert_eq!(out, dirs.output_dir().join("abc.gif"));
    }

    #[tokio::test]
    async fn test_can_export_only_output_files() {
        let (root, dirs) = setup().await;
        let inside = dirs.output_dir().join("a.gif");
        let outside = root.path().join("b.gif");
        let nested = dirs.output_dir().join("sub");
        tokio::fs::write(&inside, b"x").await.unwrap();
        tokio::fs::write(&outside, b"x").await.unwrap();
        tokio::fs::create_dir(&nested).await.unwrap();

        assert!(dirs.can_export(&inside).await);
        assert!(!dirs.can_export(&outside).await);
        assert!(!dirs.can_export(&nested).await);
        assert!(!dirs.can_export(&dirs.output_dir().join("missing.gif")).await);
        assert!(matches!(
            dirs.ensure_exportable(&outside).await,
            Err(FilesError::NotExportable { .. })
        ));
    }

    #[tokio::test]
    async fn test_copy_to_output_keeps_existing() {
        let (root, dirs) = setup().await;
        let source = root.path().join("c.png");
        tokio::fs::write(&source, b"new").await.unwrap();
        tokio::fs::write(dirs.output_dir().join("c.png"), b"old")
            .await
            .unwrap();

        let target = dirs.copy_to_output(&source).await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_clear_directories() {
        let (_root, dirs) = setup().await;
        tokio::fs::write(dirs.input_dir().join("a"), b"1").await.unwrap();
        tokio::fs::create_dir(dirs.input_dir().join("d")).await.unwrap();
        tokio::fs::write(dirs.input_dir().join("d").join("b"), b"2")
            .await
            .unwrap();

        assert_eq!(dirs.clear_input().await.unwrap(), 2);
        assert_eq!(dirs.clear_input().await.unwrap(), 0);
        assert!(dirs.input_dir().is_dir());
        assert_eq!(dirs.clear_output().await.unwrap(), 0);
    }
}
