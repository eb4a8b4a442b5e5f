//! Background Removal CLI Tool
//!
//! One-shot mode uploads a single image and writes the result; without an input
//! the interactive shell drives a [`RemovalSession`] command by command.

use super::config::CliConfigBuilder;
use super::shell;
use crate::{
    session::{RemovalOutcome, RemovalSession, SessionEvents},
    tracing_config::{TracingConfig, TracingFormat},
    FilePicker, PickedFile, RemovalConfig, RemovalService, RemoveBgClient, ResultImage,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};

/// Remote background removal CLI tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-client")]
pub struct Cli {
    /// Image file to process (use "-" for stdin). Starts an interactive shell when omitted.
    #[arg(value_name = "INPUT")]
    pub input: Option<String>,

    /// Output file or directory. Use "-" for stdout. [default: ./removed_background.png]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// API key for the removal service
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Removal service endpoint
    #[arg(long, env = "REMOVE_BG_ENDPOINT")]
    pub endpoint: Option<String>,

    /// JSON configuration file [default: <config dir>/bgremove-client/config.json if present]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = TracingFormat::Console)]
    pub log_format: TracingFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings selected by the flags
    pub(crate) fn tracing_config(&self) -> TracingConfig {
        let config = TracingConfig::new()
            .with_verbosity(self.verbose)
            .with_format(self.log_format);
        match &self.log_file {
            Some(path) => config.with_log_file(path),
            None => config,
        }
    }
}

/// Where a one-shot result is written
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// How a one-shot run ended once its notifications were shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OneShotStatus {
    Written,
    /// The failure notice was already printed as a session event
    Failed,
}

pub async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    crate::tracing_config::init_cli_tracing(cli.tracing_config())
        .context("Failed to initialize tracing")?;

    if cli.show_config {
        show_config(&cli)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    info!(endpoint = %config.endpoint, "Using removal service");

    let client =
        RemoveBgClient::new(config.clone()).context("Failed to create removal client")?;

    let Some(input) = cli.input.as_deref() else {
        shell::run(&config, &client).await?;
        return Ok(ExitCode::SUCCESS);
    };

    let target = resolve_output_target(cli.output.as_deref(), &config.download_file_name);
    let picked = read_input(input)?;
    let status =
        process_single_input(picked, &target, &config, &client, &mut io::stderr()).await?;

    Ok(match status {
        OneShotStatus::Written => ExitCode::SUCCESS,
        OneShotStatus::Failed => ExitCode::FAILURE,
    })
}

/// Print the resolved configuration with the credential redacted
fn show_config(cli: &Cli) -> Result<()> {
    let config = CliConfigBuilder::resolve(cli)?;

    println!("⚙️  Effective configuration");
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?
    );
    println!(
        "API key: {}",
        if config.api_key.is_empty() { "not set" } else { "set (hidden)" }
    );
    if let Some(path) = RemovalConfig::default_config_path() {
        println!("Default config file: {}", path.display());
    }

    Ok(())
}

/// Upload one image, report session events to `notices`, and write its result
///
/// A removal failure is reported once, by its event, and returned as
/// [`OneShotStatus::Failed`] rather than as an error.
async fn process_single_input<S, W>(
    picked: PickedFile,
    target: &OutputTarget,
    config: &RemovalConfig,
    service: &S,
    notices: &mut W,
) -> Result<OneShotStatus>
where
    S: RemovalService + ?Sized,
    W: Write,
{
    let (mut session, mut events) = RemovalSession::new(config);
    let file_name = session.select_file(picked).file_name().to_string();

    let spinner = create_spinner(format!("Removing background from {}", file_name));
    let outcome = session
        .remove_background(service)
        .await
        .context("Failed to submit image")?;
    spinner.finish_and_clear();

    write_events(&mut events, notices).context("Failed to report session events")?;

    match outcome {
        RemovalOutcome::Succeeded(_) => {
            let result = session
                .result()
                .context("Result missing after successful removal")?;
            write_output(result, target, notices)?;
            Ok(OneShotStatus::Written)
        },
        RemovalOutcome::Failed | RemovalOutcome::Stale => Ok(OneShotStatus::Failed),
    }
}

/// Pick the input file, reading stdin for "-"
fn read_input(input: &str) -> Result<PickedFile> {
    if input == "-" {
        let data = read_stdin()?;
        return FilePicker::pick_bytes("stdin", data).context("Input from stdin is not an image");
    }

    FilePicker::pick_path(input).with_context(|| format!("Cannot use input '{}'", input))
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }

    Ok(buffer)
}

/// Decide where the result goes
///
/// No output means the download file name in the working directory; an
/// existing directory (or a path ending in a separator) receives the download
/// file name.
fn resolve_output_target(output: Option<&str>, download_file_name: &str) -> OutputTarget {
    match output {
        None => OutputTarget::File(PathBuf::from(download_file_name)),
        Some("-") => OutputTarget::Stdout,
        Some(path) => {
            let looks_like_dir = path.ends_with('/') || path.ends_with('\\');
            let path_buf = PathBuf::from(path);
            if looks_like_dir || path_buf.is_dir() {
                OutputTarget::File(path_buf.join(download_file_name))
            } else {
                OutputTarget::File(path_buf)
            }
        },
    }
}

fn write_output<W: Write>(result: &ResultImage, target: &OutputTarget, notices: &mut W) -> Result<()> {
    match target {
        OutputTarget::Stdout => write_stdout(result.bytes()),
        OutputTarget::File(path) => {
            result
                .save_as(path)
                .with_context(|| format!("Failed to write result to {}", path.display()))?;
            writeln!(notices, "💾 Saved {}", path.display())?;
            Ok(())
        },
    }
}

/// Write image data to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Spinner shown while a request is outstanding
pub(crate) fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print pending session notifications to stderr
pub(crate) fn present_events(events: &mut SessionEvents) {
    if let Err(e) = write_events(events, &mut io::stderr()) {
        debug!(error = %e, "Could not print session events");
    }
}

fn write_events<W: Write>(events: &mut SessionEvents, out: &mut W) -> io::Result<()> {
    while let Ok(event) = events.try_recv() {
        debug!(?event, "Session event");
        writeln!(out, "{}", shell::describe_event(&event))?;
    }
    Ok(())
}
