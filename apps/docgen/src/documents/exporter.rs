//! PDF export to the local filesystem.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::info;

use crate::docs_client::{DocumentHandle, DocumentService, ExportFormat};
use crate::documents::DocumentError;

/// Exports `handle` as PDF to `output_path`, replacing any existing file.
/// Returns the number of bytes written.
///
/// The file only appears at `output_path` once it is complete.
pub async fn export_to_file(
    service: &dyn DocumentService,
    handle: &DocumentHandle,
    output_path: &Path,
) -> Result<u64, DocumentError> {
    let bytes = service
        .export_as(handle, ExportFormat::Pdf)
        .await
        .map_err(|source| DocumentError::ExportFailed {
            handle: handle.clone(),
            source,
        })?;
    let len = bytes.len() as u64;

    write_atomically(output_path, bytes)
        .await
        .map_err(|source| DocumentError::WriteFailed {
            path: output_path.to_path_buf(),
            source,
        })?;

    info!("Exported {handle} to {} ({len} bytes)", output_path.display());
    Ok(len)
}

/// Writes into a temp file beside `path`, then renames it over `path`.
async fn write_atomically(path: &Path, bytes: Bytes) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> io::Result<()> {
        // Dropped (and removed) on any early return.
        let mut tmp = tempfile::Builder::new()
            .prefix(".docgen-")
            .suffix(".partial")
            .tempfile_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs_client::fake::InMemoryDocumentService;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_writes_pdf_and_creates_directory() {
        let service = InMemoryDocumentService::with_document("copy", "Acme");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cv.pdf");

        let written = export_to_file(&service, &DocumentHandle::new("copy"), &path)
            .await
            .unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert!(contents.starts_with(b"%PDF"));
        assert_eq!(written, contents.len() as u64);
    }

    #[tokio::test]
    async fn test_export_overwrites_existing_file() {
        let service = InMemoryDocumentService::with_document("copy", "fresh");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"stale content that is longer than the new one").unwrap();

        export_to_file(&service, &DocumentHandle::new("copy"), &path)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4\nfresh");
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_no_file() {
        let service = InMemoryDocumentService::with_document("copy", "Acme");
        service.fail_export();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cv.pdf");

        let err = export_to_file(&service, &DocumentHandle::new("copy"), &path)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::ExportFailed { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_target_is_write_failure() {
        let service = InMemoryDocumentService::with_document("copy", "Acme");
        let dir = TempDir::new().unwrap();
        // A regular file where the output directory should be.
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();

        let err = export_to_file(
            &service,
            &DocumentHandle::new("copy"),
            &blocker.join("cv.pdf"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DocumentError::WriteFailed { .. }));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }
}
