//! File content storage: staged uploads, moves, deletes and streaming reads.
//!
//! Uploads are written chunk by chunk into a staging directory first, so the
//! final location is only decided once every multipart field has been read.
//! [`FileDisk::commit`] then moves the staged file into its folder.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures_util::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::domain::EntryName;
use crate::error::StorageError;

/// Read size for download streams.
pub const READ_CHUNK_BYTES: usize = 64 * 1024;

/// A fully written upload waiting in the staging directory.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    size_bytes: u64,
}

impl StagedUpload {
    /// Location in the staging directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Streaming writer for one upload.
#[derive(Debug)]
pub struct UploadWriter {
    file: File,
    path: PathBuf,
    written: u64,
}

impl UploadWriter {
    /// Appends a chunk.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Filesystem`] if the write fails.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file.write_all(chunk).await?;
        self.written = self.written.saturating_add(chunk.len() as u64);
        Ok(())
    }

    /// Flushes and closes the file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Filesystem`] if the flush fails. The partial
    /// file is removed.
    pub async fn finish(mut self) -> Result<StagedUpload, StorageError> {
        if let Err(err) = self.flush().await {
            self.abort().await;
            return Err(err.into());
        }
        Ok(StagedUpload {
            path: self.path,
            size_bytes: self.written,
        })
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }

    /// Drops the partial upload.
    pub async fn abort(self) {
        drop(self.file);
        remove_quietly(&self.path).await;
    }
}

/// Manages file content under a storage root.
#[derive(Debug, Clone)]
pub struct FileDisk {
    base_path: PathBuf,
    staging_path: PathBuf,
    allowed_extensions: Option<Vec<String>>,
}

impl FileDisk {
    /// Creates a file store.
    ///
    /// `allowed_extensions` holds lowercased extensions with a leading dot;
    /// `None` accepts every extension.
    #[must_use]
    pub fn new(
        base_path: impl Into<PathBuf>,
        staging_path: impl Into<PathBuf>,
        allowed_extensions: Option<Vec<String>>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            staging_path: staging_path.into(),
            allowed_extensions: allowed_extensions
                .map(|list| list.into_iter().map(|e| e.to_ascii_lowercase()).collect()),
        }
    }

    /// Returns the storage root.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Checks a file name's extension against the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ExtensionNotAllowed`] when an allow-list is
    /// configured and the extension is not on it.
    pub fn ensure_extension_allowed(&self, name: &EntryName) -> Result<(), StorageError> {
        let Some(allowed) = &self.allowed_extensions else {
            return Ok(());
        };
        let ext = name.extension().to_ascii_lowercase();
        if allowed.iter().any(|candidate| *candidate == ext) {
            Ok(())
        } else {
            Err(StorageError::ExtensionNotAllowed(ext))
        }
    }

    fn ensure_under_root(&self, path: &Path) -> Result<(), StorageError> {
        if path.starts_with(&self.base_path) {
            Ok(())
        } else {
            Err(StorageError::Internal(format!(
                "path escapes storage root: {}",
                path.display()
            )))
        }
    }

    /// Opens a new staged upload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Filesystem`] if the staging directory or the
    /// file cannot be created.
    pub async fn begin_upload(&self) -> Result<UploadWriter, StorageError> {
        tokio::fs::create_dir_all(&self.staging_path).await?;
        let path = self
            .staging_path
            .join(format!("{}.part", uuid::Uuid::new_v4()));
        let file = File::create(&path).await?;
        Ok(UploadWriter {
            file,
            path,
            written: 0,
        })
    }

    /// Moves a staged upload to `dir/file_name`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the destination exists,
    /// [`StorageError::Internal`] if it lies outside the storage root, or
    /// [`StorageError::Filesystem`] if the move fails. The staged file is
    /// removed in every case.
    pub async fn commit(
        &self,
        staged: StagedUpload,
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, StorageError> {
        let destination = dir.join(file_name);
        let outcome = async {
            if tokio::fs::try_exists(&destination).await? {
                return Err(StorageError::Conflict(format!(
                    "file already exists: {}",
                    destination.display()
                )));
            }
            self.move_file(&staged.path, &destination).await
        }
        .await;
        if outcome.is_err() {
            remove_quietly(&staged.path).await;
        }
        outcome.map(|()| destination)
    }

    /// Removes a staged upload that will not be committed.
    pub async fn discard(&self, staged: StagedUpload) {
        remove_quietly(&staged.path).await;
    }

    /// Moves a file, creating the destination's parent. Falls back to copy
    /// and remove when a plain rename is not possible (e.g. across devices).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if `from` does not exist,
    /// [`StorageError::Internal`] if `to` lies outside the storage root, or
    /// [`StorageError::Filesystem`] if both rename and copy fail.
    pub async fn move_file(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        self.ensure_under_root(to)?;
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::rename(from, to).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::FileNotFound(from.display().to_string()))
            }
            Err(err) => {
                tracing::debug!(error = %err, from = %from.display(), "rename failed, copying");
                tokio::fs::copy(from, to).await?;
                tokio::fs::remove_file(from).await?;
                Ok(())
            }
        }
    }

    /// Removes a file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Filesystem`] if removal fails.
    pub async fn delete_file(&self, path: &Path) -> Result<(), StorageError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Opens a stored file and returns its content as a chunked stream.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the file is missing on disk,
    /// or [`StorageError::Filesystem`] if it cannot be opened.
    pub async fn open(
        &self,
        path: &Path,
    ) -> Result<impl Stream<Item = std::io::Result<Bytes>> + Send + 'static, StorageError> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(chunked(file))
    }

    /// Guesses a MIME type from the path's extension.
    #[must_use]
    pub fn mime_type_for(path: &Path) -> String {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

fn chunked(file: File) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    futures_util::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok(Some((Bytes::from(buf), file)))
    })
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await
        && err.kind() != ErrorKind::NotFound
    {
        tracing::warn!(error = %err, path = %path.display(), "failed to remove staged upload");
    }
}
