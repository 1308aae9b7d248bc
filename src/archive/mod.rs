//! # Archiver: package a job's output directory into one artifact.
//!
//! Invoked only after a zero exit code. Produces `<dirname>.zip` as a
//! sibling of the source directory (so `downloads/<contentId>/` becomes
//! `downloads/<contentId>.zip`), using Deflate at maximum compression.
//! On success the source directory is removed; on failure it is left intact
//! for diagnosis and the job fails with `archive_creation_failed`.
//!
//! Zip creation is blocking I/O and runs on the blocking pool via
//! [`tokio::task::spawn_blocking`].

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors raised while packaging an output directory.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The source directory does not exist or is not a directory.
    #[error("source directory missing: {0}")]
    SourceMissing(PathBuf),

    /// Filesystem or zip-encoding failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Zip container failure.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The archiving task was aborted before completing.
    #[error("archive task aborted")]
    Aborted,
}

/// Packages `source_dir` into a sibling zip and deletes the source.
///
/// Returns the artifact path. The source directory is only removed after the
/// zip has been fully written and flushed.
pub async fn archive_output(source_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let source = source_dir.to_path_buf();
    let artifact = sibling_zip_path(&source)?;

    let zip_path = artifact.clone();
    tokio::task::spawn_blocking(move || match write_zip(&source, &zip_path) {
        // The source is only removed once the zip is fully on disk.
        Ok(()) => std::fs::remove_dir_all(&source).map_err(ArchiveError::from),
        Err(e) => {
            let _ = std::fs::remove_file(&zip_path);
            Err(e)
        }
    })
    .await
    .map_err(|_| ArchiveError::Aborted)??;

    info!(artifact = %artifact.display(), "artifact packaged");
    Ok(artifact)
}

/// `downloads/<name>/` → `downloads/<name>.zip`.
fn sibling_zip_path(source: &Path) -> Result<PathBuf, ArchiveError> {
    if !source.is_dir() {
        return Err(ArchiveError::SourceMissing(source.to_path_buf()));
    }
    let name = source
        .file_name()
        .ok_or_else(|| ArchiveError::SourceMissing(source.to_path_buf()))?;
    let mut artifact = source.with_file_name(name.to_os_string());
    artifact.set_extension("zip");
    Ok(artifact)
}

fn write_zip(source: &Path, zip_path: &Path) -> Result<(), ArchiveError> {
    let file = File::create(zip_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut buf = Vec::with_capacity(64 * 1024);
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| ArchiveError::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| ArchiveError::Io(std::io::Error::other(e)))?;
        let rel_name = rel.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(rel_name, options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(rel_name, options)?;
            let mut f = File::open(entry.path())?;
            buf.clear();
            f.read_to_end(&mut buf)?;
            zip.write_all(&buf)?;
        }
        // Symlinks and other special files are skipped.
    }

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn populate(dir: &Path) {
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("video.mp4"), vec![0u8; 2048]).unwrap();
        fs::write(dir.join("sub/info.txt"), "metadata").unwrap();
    }

    #[tokio::test]
    async fn archives_directory_and_removes_source() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("2234989491");
        populate(&source);

        let artifact = archive_output(&source).await.unwrap();

        assert_eq!(artifact, root.path().join("2234989491.zip"));
        assert!(artifact.is_file());
        assert!(fs::metadata(&artifact).unwrap().len() > 0);
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn missing_source_leaves_no_artifact() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("gone");

        let err = archive_output(&source).await.unwrap_err();
        assert!(matches!(err, ArchiveError::SourceMissing(_)));
        assert!(!root.path().join("gone.zip").exists());
    }

    #[tokio::test]
    async fn empty_directory_still_produces_an_archive() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("88888888");
        fs::create_dir_all(&source).unwrap();

        let artifact = archive_output(&source).await.unwrap();
        assert!(artifact.is_file());
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn archive_contains_nested_entries() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("77777777");
        populate(&source);

        let artifact = archive_output(&source).await.unwrap();

        let file = File::open(&artifact).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "video.mp4"));
        assert!(names.iter().any(|n| n == "sub/info.txt"));
    }
}
