//! Configuration resolution for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{ApiKey, RemovalConfig};
use anyhow::{Context, Result};

/// Layers config file, environment and flags into a `RemovalConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Resolve the configuration without validating it
    ///
    /// Precedence: defaults < config file < environment < flags. Clap already
    /// folds `REMOVE_BG_API_KEY` and `REMOVE_BG_ENDPOINT` into the flags.
    pub(crate) fn resolve(cli: &Cli) -> Result<RemovalConfig> {
        let mut config = match &cli.config {
            Some(path) => RemovalConfig::from_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => match RemovalConfig::default_config_path().filter(|p| p.is_file()) {
                Some(path) => RemovalConfig::from_file(&path).with_context(|| {
                    format!("Failed to load default config file {}", path.display())
                })?,
                None => RemovalConfig::default(),
            },
        };

        if let Some(endpoint) = &cli.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(api_key) = &cli.api_key {
            config.api_key = ApiKey::new(api_key.clone());
        }

        Ok(config)
    }

    /// Resolve and validate the configuration
    pub(crate) fn from_cli(cli: &Cli) -> Result<RemovalConfig> {
        let config = Self::resolve(cli)?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn write_config(dir: &std::path::Path, json: &str) -> std::path::PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"endpoint": "http://file.example/removebg", "image_field": "upload"}"#,
        );

        let cli = Cli::try_parse_from([
            "bgremove-client",
            "--config",
            path.to_str().unwrap(),
            "--endpoint",
            "http://flag.example/removebg",
            "--api-key",
            "from-flag",
        ])
        .unwrap();

        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.endpoint, "http://flag.example/removebg");
        assert_eq!(config.image_field, "upload");
        assert_eq!(config.api_key.expose(), "from-flag");
    }

    #[test]
    fn test_file_values_kept_without_flags() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{"download_file_name": "cutout.png"}"#,
        );

        let cli = Cli::try_parse_from([
            "bgremove-client",
            "--config",
            path.to_str().unwrap(),
            "--api-key",
            "k",
        ])
        .unwrap();

        let config = CliConfigBuilder::resolve(&cli).unwrap();
        assert_eq!(config.download_file_name, "cutout.png");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let cli = Cli::try_parse_from([
            "bgremove-client",
            "--config",
            missing.to_str().unwrap(),
            "--api-key",
            "k",
        ])
        .unwrap();

        let err = CliConfigBuilder::resolve(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.json"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "{}");
        let cli = Cli::try_parse_from([
            "bgremove-client",
            "--config",
            path.to_str().unwrap(),
            "--endpoint",
            "not-a-url",
            "--api-key",
            "k",
        ])
        .unwrap();

        assert!(CliConfigBuilder::from_cli(&cli).is_err());
    }
}
