//! Configuration types for remote background removal

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default remote endpoint (remove.bg v1.0)
pub const DEFAULT_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

/// Header carrying the API credential
pub const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

/// Multipart field carrying the image bytes
pub const DEFAULT_IMAGE_FIELD: &str = "image_file";

/// File name offered when downloading a result
pub const DEFAULT_DOWNLOAD_FILE_NAME: &str = "removed_background.png";

/// Environment variable holding the API credential
pub const API_KEY_ENV: &str = "REMOVE_BG_API_KEY";

/// Environment variable overriding the endpoint
pub const ENDPOINT_ENV: &str = "REMOVE_BG_ENDPOINT";

/// Static API credential.
///
/// Never serialized and redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a credential
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// Raw credential, for the request header only
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether no credential has been supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "ApiKey(<unset>)")
        } else {
            write!(f, "ApiKey(***)")
        }
    }
}

/// Configuration for remote background removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Absolute URL the image is posted to
    pub endpoint: String,

    /// Credential sent with every request (environment or CLI only)
    #[serde(skip)]
    pub api_key: ApiKey,

    /// Header name for the credential
    pub api_key_header: String,

    /// Multipart field name for the image
    pub image_field: String,

    /// File name used when downloading the result
    pub download_file_name: String,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: ApiKey::default(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            image_field: DEFAULT_IMAGE_FIELD.to_string(),
            download_file_name: DEFAULT_DOWNLOAD_FILE_NAME.to_string(),
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    ///
    /// ```rust
    /// use bgremove_client::RemovalConfig;
    ///
    /// let config = RemovalConfig::builder()
    ///     .api_key("my-secret")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.image_field, "image_file");
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Build a configuration from defaults and the process environment
    ///
    /// # Errors
    /// - `REMOVE_BG_API_KEY` is unset or empty
    /// - `REMOVE_BG_ENDPOINT` is not an http(s) URL
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides().build_validated()
    }

    /// Load non-secret settings from a JSON file
    ///
    /// Any `api_key` field in the file is ignored.
    ///
    /// # Errors
    /// - File cannot be read
    /// - File is not valid JSON for this structure
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BgRemovalError::file_io_error("read config file", path, &e))?;
        serde_json::from_str(&content).map_err(|e| {
            BgRemovalError::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Location of the per-user config file, if the platform has one
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bgremove-client").join("config.json"))
    }

    /// Apply `REMOVE_BG_ENDPOINT` and `REMOVE_BG_API_KEY` when set
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.endpoint = endpoint;
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = ApiKey::new(key);
            }
        }
        self
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Endpoint is not an absolute http(s) URL
    /// - API key is missing
    /// - Header or field name is empty
    /// - Download file name is empty or contains a path separator
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.endpoint).map_err(|_| {
            BgRemovalError::config_value_error("endpoint", &self.endpoint, "an absolute URL")
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(BgRemovalError::config_value_error(
                "endpoint",
                &self.endpoint,
                "an http or https URL",
            ));
        }

        if self.api_key.is_empty() {
            return Err(BgRemovalError::invalid_config(format!(
                "API key is missing. Set {} or pass --api-key",
                API_KEY_ENV
            )));
        }

        if self.api_key_header.trim().is_empty() {
            return Err(BgRemovalError::invalid_config("API key header name is empty"));
        }

        if self.image_field.trim().is_empty() {
            return Err(BgRemovalError::invalid_config("image field name is empty"));
        }

        if self.download_file_name.trim().is_empty()
            || self.download_file_name.contains('/')
            || self.download_file_name.contains('\\')
        {
            return Err(BgRemovalError::config_value_error(
                "download file name",
                &self.download_file_name,
                "a bare file name",
            ));
        }

        Ok(())
    }

    fn build_validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: RemovalConfig) -> Self {
        Self { config }
    }

    /// Set the remote endpoint
    #[must_use]
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the API credential
    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.api_key = ApiKey::new(key);
        self
    }

    /// Set the credential header name
    #[must_use]
    pub fn api_key_header<S: Into<String>>(mut self, header: S) -> Self {
        self.config.api_key_header = header.into();
        self
    }

    /// Set the multipart field name
    #[must_use]
    pub fn image_field<S: Into<String>>(mut self, field: S) -> Self {
        self.config.image_field = field.into();
        self
    }

    /// Set the download file name
    #[must_use]
    pub fn download_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.download_file_name = name.into();
        self
    }

    /// Build the configuration with validation
    ///
    /// # Errors
    /// See [`RemovalConfig::validate`].
    pub fn build(self) -> Result<RemovalConfig> {
        self.config.build_validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RemovalConfig::default();
        assert_eq!(config.endpoint, "https://api.remove.bg/v1.0/removebg");
        assert_eq!(config.api_key_header, "X-Api-Key");
        assert_eq!(config.image_field, "image_file");
        assert_eq!(config.download_file_name, "removed_background.png");
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_default_requires_api_key() {
        let err = RemovalConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("API key is missing"));
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn test_config_builder() {
        let config = RemovalConfig::builder()
            .endpoint("http://127.0.0.1:9000/removebg")
            .api_key("secret")
            .image_field("file")
            .build()
            .unwrap();

        assert_eq!(config.endpoint, "http://127.0.0.1:9000/removebg");
        assert_eq!(config.api_key.expose(), "secret");
        assert_eq!(config.image_field, "file");
    }

    #[test]
    fn test_endpoint_validation() {
        let result = RemovalConfig::builder()
            .api_key("secret")
            .endpoint("not a url")
            .build();
        assert!(matches!(result, Err(BgRemovalError::InvalidConfig(_))));

        let result = RemovalConfig::builder()
            .api_key("secret")
            .endpoint("ftp://example.com/removebg")
            .build();
        assert!(result.unwrap_err().to_string().contains("http or https"));
    }

    #[test]
    fn test_download_file_name_validation() {
        let result = RemovalConfig::builder()
            .api_key("secret")
            .download_file_name("../escape.png")
            .build();
        assert!(result.is_err());

        let result = RemovalConfig::builder()
            .api_key("secret")
            .download_file_name("   ")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_api_key_is_redacted() {
        let config = RemovalConfig::builder().api_key("super-secret").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("ApiKey(***)"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("api_key\""));
    }

    #[test]
    fn test_from_file_ignores_api_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"endpoint": "http://localhost:8080/removebg", "api_key": "leaked"}"#,
        )
        .unwrap();

        let config = RemovalConfig::from_file(&path).unwrap();
        assert_eq!(config.endpoint, "http://localhost:8080/removebg");
        assert!(config.api_key.is_empty());
        // Missing fields fall back to defaults
        assert_eq!(config.image_field, "image_file");
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            RemovalConfig::from_file(&missing),
            Err(BgRemovalError::Io(_))
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            RemovalConfig::from_file(&broken),
            Err(BgRemovalError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_from_config_keeps_fields() {
        let base = RemovalConfig {
            endpoint: "http://localhost:1234/api".to_string(),
            ..RemovalConfig::default()
        };
        let config = RemovalConfigBuilder::from_config(base)
            .api_key("k")
            .build()
            .unwrap();
        assert_eq!(config.endpoint, "http://localhost:1234/api");
        assert_eq!(config.api_key.expose(), "k");
    }
}
