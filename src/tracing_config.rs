//! Log output for the CLI
//!
//! The library only emits `tracing` events (and `log` records, bridged by the
//! subscriber). The binary picks the filter, line format and destination here.

use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const DEFAULT_LOG_FILE_NAME: &str = "bgremove-client.log";

/// Line format of emitted log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TracingFormat {
    /// Full human-readable lines, colored on a terminal
    #[default]
    Console,
    /// Single-line records without colors (CI logs)
    Compact,
    /// One JSON object per record, with the current span
    Json,
}

/// Where log records go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard error, keeping stdout free for piped results
    #[default]
    Stderr,
    /// Append to a file; its directory is created on init
    File(PathBuf),
}

/// Subscriber settings resolved from CLI flags
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    pub verbosity: u8,
    pub format: TracingFormat,
    pub output: TracingOutput,
    /// Explicit filter directives; beats `RUST_LOG` and verbosity
    pub env_filter: Option<String>,
    /// Logged once after init so runs can be told apart
    pub session_id: Option<String>,
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Log to `path` instead of stderr
    #[must_use]
    pub fn with_log_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = TracingOutput::File(path.into());
        self
    }

    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    #[must_use]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Level implied by `-v` count alone
    #[must_use]
    pub fn verbosity_level(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Colors only make sense for the console format on a terminal stream
    #[must_use]
    pub fn uses_ansi(&self) -> bool {
        self.format == TracingFormat::Console && self.output == TracingOutput::Stderr
    }

    fn filter(&self) -> anyhow::Result<EnvFilter> {
        if let Some(directives) = &self.env_filter {
            return Ok(EnvFilter::try_new(directives)?);
        }
        match EnvFilter::try_from_default_env() {
            Ok(from_env) => Ok(from_env),
            Err(_) => Ok(EnvFilter::try_new(self.verbosity_level())?),
        }
    }

    fn make_writer(&self) -> anyhow::Result<BoxMakeWriter> {
        match &self.output {
            TracingOutput::Stderr => Ok(BoxMakeWriter::new(std::io::stderr)),
            TracingOutput::File(path) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                std::fs::create_dir_all(dir)?;
                let file_name = path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new(DEFAULT_LOG_FILE_NAME));
                Ok(BoxMakeWriter::new(tracing_appender::rolling::never(
                    dir, file_name,
                )))
            },
        }
    }

    fn fmt_layer<S>(&self, writer: BoxMakeWriter) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let layer = fmt::layer().with_writer(writer).with_target(false);
        match self.format {
            TracingFormat::Console => layer.with_ansi(self.uses_ansi()).boxed(),
            TracingFormat::Compact => layer.with_ansi(false).compact().boxed(),
            TracingFormat::Json => layer
                .with_ansi(false)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .boxed(),
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Filter directives do not parse
    /// - Log file directory cannot be created
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<()> {
        let filter = self.filter()?;
        let writer = self.make_writer()?;

        tracing_subscriber::registry()
            .with(self.fmt_layer(writer).with_filter(filter))
            .try_init()?;

        if let Some(session_id) = &self.session_id {
            tracing::info!(session_id = %session_id, "Background removal session started");
        }
        Ok(())
    }
}

/// Install CLI logging with a fresh session id
pub fn init_cli_tracing(config: TracingConfig) -> anyhow::Result<()> {
    config
        .with_session_id(uuid::Uuid::new_v4().to_string())
        .init()
}
