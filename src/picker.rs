//! File selection
//!
//! Reads a user-chosen file and checks that it is an image. The check is a MIME
//! filter only: content is sniffed from magic bytes and the file extension is
//! used as a fallback. Nothing is decoded, so corrupt or oversized images are
//! accepted here and left for the remote API to reject.

use crate::error::{BgRemovalError, Result};
use crate::resources::{Blob, LocalRef};
use image::ImageFormat;
use std::path::Path;

/// A file chosen by the user that passed the image MIME filter
#[derive(Debug, Clone)]
pub struct PickedFile {
    file_name: String,
    blob: Blob,
}

impl PickedFile {
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        self.blob.mime()
    }

    #[must_use]
    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    pub(crate) fn into_parts(self) -> (String, Blob) {
        (self.file_name, self.blob)
    }
}

/// The session's current input: a picked file plus its preview reference
#[derive(Debug, Clone)]
pub struct SelectedImage {
    file_name: String,
    blob: Blob,
    preview: LocalRef,
}

impl SelectedImage {
    pub(crate) fn new(picked: PickedFile, preview: LocalRef) -> Self {
        let (file_name, blob) = picked.into_parts();
        Self {
            file_name,
            blob,
            preview,
        }
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        self.blob.mime()
    }

    #[must_use]
    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    #[must_use]
    pub fn preview(&self) -> &LocalRef {
        &self.preview
    }
}

/// Picks image files from disk or memory
pub struct FilePicker;

impl FilePicker {
    /// Read a file from disk and accept it if it is an image
    ///
    /// # Errors
    /// - File cannot be read
    /// - Content and extension both fail to identify an image type
    pub fn pick_path<P: AsRef<Path>>(path: P) -> Result<PickedFile> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| BgRemovalError::file_io_error("read image file", path, &e))?;

        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        Self::pick_bytes(file_name, data)
    }

    /// Accept an in-memory file (e.g. stdin) if it is an image
    ///
    /// # Errors
    /// - Content and name both fail to identify an image type
    pub fn pick_bytes<S: Into<String>>(file_name: S, data: Vec<u8>) -> Result<PickedFile> {
        let file_name = file_name.into();
        let mime = Self::detect_mime(&data, &file_name).ok_or_else(|| {
            BgRemovalError::unsupported_format(format!(
                "'{}' is not a recognised image type",
                file_name
            ))
        })?;

        log::debug!("Picked {} ({}, {} bytes)", file_name, mime, data.len());

        Ok(PickedFile {
            file_name,
            blob: Blob::new(data, mime),
        })
    }

    /// Determine the image MIME type of a file, if it has one
    #[must_use]
    pub fn detect_mime(data: &[u8], file_name: &str) -> Option<&'static str> {
        let format = image::guess_format(data)
            .or_else(|_| ImageFormat::from_path(file_name))
            .ok()?;
        let mime = format.to_mime_type();
        mime.starts_with("image/").then_some(mime)
    }
}
