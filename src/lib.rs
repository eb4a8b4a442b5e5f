#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Background Removal Client
//!
//! Upload an image to a remote background-removal API (remove.bg compatible)
//! and get the transparent PNG back. The crate does no image processing of its
//! own: bytes go out as multipart form data and come back unmodified.
//!
//! ## Building blocks
//!
//! - [`FilePicker`]: reads a file and accepts it only if it is an image
//! - [`RemoveBgClient`]: one multipart `POST` per image, credential in a header
//! - [`ResultRenderer`]: wraps returned bytes for display and download
//! - [`RemovalSession`]: UI-agnostic state machine tying the three together,
//!   with a status watch channel and an event channel for notifications
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_client::{FilePicker, RemovalConfig, RemovalOutcome, RemovalSession, RemoveBgClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Credential comes from REMOVE_BG_API_KEY, never from source
//! let config = RemovalConfig::from_env()?;
//! let client = RemoveBgClient::new(config.clone())?;
//! let (mut session, mut events) = RemovalSession::new(&config);
//!
//! session.select_file(FilePicker::pick_path("cat.jpg")?);
//! if let RemovalOutcome::Succeeded(_) = session.remove_background(&client).await? {
//!     session.download_result(".")?; // ./removed_background.png
//! }
//!
//! while let Ok(event) = events.try_recv() {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): `bgremove-client` command-line interface, with console,
//!   compact or JSON logs to stderr or a file

pub mod client;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod picker;
pub mod renderer;
pub mod resources;
pub mod session;
#[cfg(feature = "cli")]
pub mod tracing_config;

use tokio::io::AsyncRead;

// Public API exports
pub use client::{RemovalService, RemoveBgClient};
pub use config::{ApiKey, RemovalConfig, RemovalConfigBuilder};
pub use error::{BgRemovalError, Result, REMOVAL_FAILED_MESSAGE};
pub use picker::{FilePicker, PickedFile, SelectedImage};
pub use renderer::{RemovalMetadata, ResultImage, ResultRenderer, RESULT_MIME};
pub use resources::{Blob, LocalRef, ResourceStore};
pub use session::{
    RemovalOutcome, RemovalSession, RemovalTicket, SessionEvent, SessionEvents, SessionState,
    SessionStatus,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat, TracingOutput};

/// Remove the background of an in-memory image
///
/// One request, no session. Unlike [`RemovalSession`], the cause of a
/// [`BgRemovalError::RemovalFailed`] is returned to the caller.
///
/// ```rust,no_run
/// use bgremove_client::{remove_background_from_bytes, RemovalConfig};
///
/// # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let config = RemovalConfig::from_env()?;
/// let png = remove_background_from_bytes("upload.jpg", upload, &config).await?;
/// std::fs::write("removed_background.png", png)?;
/// # Ok(())
/// # }
/// ```
pub async fn remove_background_from_bytes(
    file_name: &str,
    image_bytes: Vec<u8>,
    config: &RemovalConfig,
) -> Result<Vec<u8>> {
    let picked = FilePicker::pick_bytes(file_name, image_bytes)?;
    let client = RemoveBgClient::new(config.clone())?;

    let mut store = ResourceStore::new();
    let preview = store.create_ref(picked.blob());
    let image = SelectedImage::new(picked, preview);

    client.remove_background(&image).await
}

/// Remove the background of an image file
pub async fn remove_background_from_file<P: AsRef<std::path::Path>>(
    path: P,
    config: &RemovalConfig,
) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| BgRemovalError::file_io_error("read image file", path, &e))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

    remove_background_from_bytes(&file_name, data, config).await
}

/// Remove the background of an image read from an async stream
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    file_name: &str,
    config: &RemovalConfig,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;

    remove_background_from_bytes(file_name, buffer, config).await
}
