//! Background Removal CLI Tool
//!
//! Command-line interface for uploading images to a remote background removal
//! API with the bgremove-client library.

#[cfg(feature = "cli")]
use bgremove_client::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<std::process::ExitCode> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
