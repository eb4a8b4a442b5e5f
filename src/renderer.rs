//! Result rendering
//!
//! Wraps the bytes returned by the API in a PNG blob and registers a local
//! reference that serves both inline display and download. The bytes are
//! passed through untouched.

use crate::error::{BgRemovalError, Result};
use crate::resources::{Blob, LocalRef, ResourceStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// MIME type of every result
pub const RESULT_MIME: &str = "image/png";

/// Facts about a completed removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalMetadata {
    /// Name of the file the result was produced from
    pub source_file_name: String,
    /// Size of the result in bytes
    pub result_bytes: usize,
    /// Time spent waiting on the API (milliseconds)
    pub request_duration_ms: u64,
    /// When the result was rendered
    pub completed_at: DateTime<Utc>,
}

/// A background-free image ready for display and download
#[derive(Debug, Clone)]
pub struct ResultImage {
    blob: Blob,
    local_ref: LocalRef,
    download_file_name: String,
    metadata: RemovalMetadata,
}

impl ResultImage {
    #[must_use]
    pub fn local_ref(&self) -> &LocalRef {
        &self.local_ref
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.blob.data()
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        self.blob.mime()
    }

    /// Fixed file name offered for download
    #[must_use]
    pub fn download_file_name(&self) -> &str {
        &self.download_file_name
    }

    #[must_use]
    pub fn metadata(&self) -> &RemovalMetadata {
        &self.metadata
    }

    /// Write the result into `dir` under the download file name
    ///
    /// # Errors
    /// - Directory cannot be created
    /// - File cannot be written
    pub fn download_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.download_file_name);
        self.save_as(&path)?;
        Ok(path)
    }

    /// Write the result to an explicit path
    ///
    /// # Errors
    /// - Parent directory cannot be created
    /// - File cannot be written
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BgRemovalError::file_io_error("create output directory", parent, &e)
            })?;
        }

        std::fs::write(path, self.blob.data())
            .map_err(|e| BgRemovalError::file_io_error("write result image", path, &e))?;

        log::info!("Saved result to {}", path.display());
        Ok(())
    }
}

/// Turns API responses into [`ResultImage`]s
#[derive(Debug, Clone)]
pub struct ResultRenderer {
    download_file_name: String,
}

impl ResultRenderer {
    pub fn new<S: Into<String>>(download_file_name: S) -> Self {
        Self {
            download_file_name: download_file_name.into(),
        }
    }

    /// Register `bytes` as a PNG result
    pub fn render(
        &self,
        bytes: Vec<u8>,
        source_file_name: &str,
        request_duration_ms: u64,
        store: &mut ResourceStore,
    ) -> ResultImage {
        let blob = Blob::new(bytes, RESULT_MIME);
        let local_ref = store.create_ref(&blob);

        ResultImage {
            metadata: RemovalMetadata {
                source_file_name: source_file_name.to_string(),
                result_bytes: blob.len(),
                request_duration_ms,
                completed_at: Utc::now(),
            },
            blob,
            local_ref,
            download_file_name: self.download_file_name.clone(),
        }
    }
}

impl Default for ResultRenderer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DOWNLOAD_FILE_NAME)
    }
}
