use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const STAGING_BUFFER_SIZE: usize = 64 * 1024;

/// File name prefix of every staging file.
pub const STAGING_PREFIX: &str = "tubely-upload-";

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// The upload body could not be read, including a client disconnecting
    /// mid-stream.
    #[error("failed to read upload body: {0}")]
    Read(std::io::Error),

    #[error("failed to write staging file: {0}")]
    Io(std::io::Error),
}

/// An upload body copied to a local temporary file.
///
/// The file is removed when this value is dropped, whatever happened to the
/// request in between.
pub struct StagedUpload {
    file: tokio::fs::File,
    path: TempPath,
    size: u64,
}

impl StagedUpload {
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle to the staged bytes, positioned at the start after staging.
    pub fn file_mut(&mut self) -> &mut tokio::fs::File {
        &mut self.file
    }

    pub async fn rewind(&mut self) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }

    /// Reads up to `limit` leading bytes and rewinds.
    pub async fn read_header(&mut self, limit: usize) -> std::io::Result<Vec<u8>> {
        self.rewind().await?;
        let mut header = Vec::with_capacity(limit);
        (&mut self.file)
            .take(limit as u64)
            .read_to_end(&mut header)
            .await?;
        self.rewind().await?;
        Ok(header)
    }
}

/// Copies upload bodies into temporary files under one directory.
#[derive(Debug, Clone)]
pub struct StagingWriter {
    dir: PathBuf,
}

impl StagingWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Streams `reader` into a new temporary file through a fixed-size buffer.
    ///
    /// Fails with [`StagingError::TooLarge`] as soon as more than `max_bytes`
    /// have been read; the oversize chunk is never written.
    pub async fn stage<'a>(
        &self,
        mut reader: impl AsyncRead + Unpin + Send + 'a,
        max_bytes: u64,
    ) -> Result<StagedUpload, StagingError> {
        let temp = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(StagingError::Io)?;
        let (std_file, path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let mut buffer = vec![0u8; STAGING_BUFFER_SIZE];
        let mut total_size: u64 = 0;

        loop {
            let n = reader.read(&mut buffer).await.map_err(StagingError::Read)?;
            if n == 0 {
                break;
            }

            total_size += n as u64;
            if total_size > max_bytes {
                return Err(StagingError::TooLarge { limit: max_bytes });
            }

            file.write_all(&buffer[..n])
                .await
                .map_err(StagingError::Io)?;
        }

        file.flush().await.map_err(StagingError::Io)?;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(StagingError::Io)?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = total_size,
            "Upload staged"
        );

        Ok(StagedUpload {
            file,
            path,
            size: total_size,
        })
    }
}
