//! Startup configuration.
//!
//! Configuration is resolved exactly once when the process starts (defaults,
//! then an optional file, then `BUNDLE_VALIDATOR__*` environment variables,
//! then command line overrides) and is immutable afterwards. Components receive
//! the sections they need by reference when they are constructed.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::types::{RequiredTypeSet, SNOMED_SYSTEM};
use crate::error::{Result, ValidatorError};

const ENV_PREFIX: &str = "BUNDLE_VALIDATOR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub terminology: TerminologyConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Which terminology endpoint shape answers code lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// FHIR `CodeSystem/$validate-code` operation
    #[default]
    ValidateCode,
    /// Native browser concept lookup on a branch, requiring an active concept
    ConceptLookup,
}

impl std::fmt::Display for LookupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupMode::ValidateCode => write!(f, "validate_code"),
            LookupMode::ConceptLookup => write!(f, "concept_lookup"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminologyConfig {
    /// Root URL of the terminology server (without `/fhir`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Branch used by [`LookupMode::ConceptLookup`], e.g. `MAIN/SNOMEDCT-US`
    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub mode: LookupMode,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Lookups in flight per document; 1 keeps them strictly sequential
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Coding system whose codes are checked against the terminology server
    #[serde(default = "default_target_system")]
    pub target_system: String,

    #[serde(default)]
    pub required_types: RequiredTypeSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Command line options shared by every subcommand that needs configuration.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file path (TOML, YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Terminology server root URL
    #[arg(long, env = "SNOWSTORM_BASE")]
    pub terminology_url: Option<String>,

    /// Terminology branch for concept lookups
    #[arg(long, env = "SNOWSTORM_BRANCH")]
    pub branch: Option<String>,

    /// Terminology lookup mode
    #[arg(long, value_enum)]
    pub mode: Option<LookupMode>,

    /// Server host
    #[arg(long)]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ValidatorConfig {
    /// Load configuration from defaults, file, environment and arguments.
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.clone()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("validation.required_types"),
        );

        let mut config: ValidatorConfig = builder.build()?.try_deserialize()?;
        args.apply(&mut config);
        config.validate()?;

        tracing::debug!(
            terminology = %config.terminology.base_url,
            mode = %config.terminology.mode,
            required = %config.validation.required_types,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.terminology.base_url()?;

        if self.terminology.branch.trim().is_empty() {
            return Err(ValidatorError::config("Terminology branch must not be empty"));
        }
        if self.terminology.request_timeout_ms == 0 || self.terminology.connect_timeout_ms == 0 {
            return Err(ValidatorError::config(
                "Terminology timeouts must be greater than 0",
            ));
        }
        if self.terminology.max_concurrent_lookups == 0 {
            return Err(ValidatorError::config(
                "max_concurrent_lookups must be greater than 0",
            ));
        }
        if self.validation.target_system.trim().is_empty() {
            return Err(ValidatorError::config("Target coding system must not be empty"));
        }
        if self.validation.required_types.is_empty() {
            return Err(ValidatorError::config(
                "At least one required resource type must be configured",
            ));
        }
        if self
            .validation
            .required_types
            .iter()
            .any(|t| t.trim().is_empty())
        {
            return Err(ValidatorError::config(
                "Required resource types must not be blank",
            ));
        }
        if self.server.port == 0 {
            return Err(ValidatorError::config("Server port must be greater than 0"));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ValidatorError::config(
                "Server request timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl ConfigArgs {
    fn apply(&self, config: &mut ValidatorConfig) {
        if let Some(url) = &self.terminology_url {
            config.terminology.base_url = url.clone();
        }
        if let Some(branch) = &self.branch {
            config.terminology.branch = branch.clone();
        }
        if let Some(mode) = self.mode {
            config.terminology.mode = mode;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

impl TerminologyConfig {
    /// Parsed base URL; only `http` and `https` roots are accepted.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ValidatorError::config(format!(
                "Terminology base URL must be an http(s) URL: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TerminologyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            branch: default_branch(),
            mode: LookupMode::default(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            target_system: default_target_system(),
            required_types: RequiredTypeSet::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// Default value functions
fn default_base_url() -> String { "http://snowstorm:8080".to_string() }
fn default_branch() -> String { "MAIN".to_string() }
fn default_request_timeout_ms() -> u64 { 5_000 }
fn default_connect_timeout_ms() -> u64 { 2_000 }
fn default_max_concurrent_lookups() -> usize { 1 }
fn default_target_system() -> String { SNOMED_SYSTEM.to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_body_size() -> usize { 16 * 1024 * 1024 } // 16MB
fn default_request_timeout_secs() -> u64 { 60 }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ValidatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.terminology.mode, LookupMode::ValidateCode);
        assert_eq!(config.validation.target_system, SNOMED_SYSTEM);
        assert_eq!(config.terminology.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = ValidatorConfig::default();
        config.terminology.base_url = "ftp://snowstorm".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidatorError::Config { .. })
        ));

        config.terminology.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ValidatorError::UrlParse(_))));
    }

    #[test]
    fn test_rejects_empty_required_types() {
        let mut config = ValidatorConfig::default();
        config.validation.required_types = RequiredTypeSet::new(Vec::<String>::new());
        assert!(config.validate().is_err());

        config.validation.required_types = RequiredTypeSet::new(["Patient", " "]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = ValidatorConfig::default();
        config.terminology.max_concurrent_lookups = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_with_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[terminology]
base_url = "http://terminology.local:9000"
mode = "concept_lookup"
branch = "MAIN/SNOMEDCT-US"

[validation]
required_types = ["Patient", "Observation"]
"#
        )
        .unwrap();

        let args = ConfigArgs {
            config: Some(file.path().to_path_buf()),
            port: Some(9090),
            ..Default::default()
        };
        let config = ValidatorConfig::load(&args).unwrap();

        assert_eq!(config.terminology.base_url, "http://terminology.local:9000");
        assert_eq!(config.terminology.mode, LookupMode::ConceptLookup);
        assert_eq!(config.terminology.branch, "MAIN/SNOMEDCT-US");
        assert_eq!(
            config.validation.required_types,
            RequiredTypeSet::new(["Patient", "Observation"])
        );
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_argument_overrides_win() {
        let args = ConfigArgs {
            terminology_url: Some("https://tx.example.org".to_string()),
            mode: Some(LookupMode::ConceptLookup),
            ..Default::default()
        };
        let mut config = ValidatorConfig::default();
        args.apply(&mut config);
        assert_eq!(config.terminology.base_url, "https://tx.example.org");
        assert_eq!(config.terminology.mode, LookupMode::ConceptLookup);
    }
}
