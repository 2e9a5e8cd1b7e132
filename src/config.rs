//! Settings for the `vss` command line tool
//!
//! Layered lowest to highest: built-in defaults, a TOML file, then
//! environment variables prefixed with `VSS_` (e.g. `VSS_OUTPUT_DIR=out`).

use crate::VCConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file read from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "vss.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory under which session directories are created
    pub output_dir: PathBuf,
    /// Label used in session and share file names
    pub label: String,
    /// Default threshold (k) for `split`
    pub threshold: usize,
    /// Default number of shares (n) for `split`
    pub num_shares: usize,
    /// `tracing_subscriber::EnvFilter` directive, overridden by RUST_LOG
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("shares"),
            label: "secret".to_string(),
            threshold: 2,
            num_shares: 3,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load settings. An explicit path must exist; the default file is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .set_default("output_dir", defaults.output_dir.to_string_lossy().into_owned())?
            .set_default("label", defaults.label)?
            .set_default("threshold", defaults.threshold as i64)?
            .set_default("num_shares", defaults.num_shares as i64)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(file)
            .add_source(Environment::with_prefix("VSS").try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        debug!("loaded config: {:?}", config);
        Ok(config)
    }

    /// Scheme parameters for the library, with command line values taking
    /// precedence over configured ones
    pub fn vc_config(&self, threshold: Option<usize>, num_shares: Option<usize>) -> VCConfig {
        VCConfig {
            num_shares: num_shares.unwrap_or(self.num_shares),
            threshold: threshold.unwrap_or(self.threshold),
        }
    }

    /// Render as TOML, e.g. to write a starter config file
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Foreign(Box::new(err)))
    }
}
