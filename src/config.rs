//! # Filter Configuration
//!
//! Every knob the filters read lives in one immutable [`FilterConfig`] that is
//! built once when the process starts and then handed to each component.
//!
//! ## Sources
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults (annotation gate on, `.age/age.key`, `sops` on `PATH`)
//! 2. The `[filter]` table of `.sops-filter.toml` in the repository root
//! 3. `SOPS_FILTER_*` environment variables
//!
//! ```toml
//! [filter]
//! require_annotation = true
//! annotation_key = "def.ms/sops-encrypt"
//! annotation_value = "true"
//! default_key_path = ".age/age.key"
//! sops_binary = "/usr/local/bin/sops"
//! ```

use crate::error::{FilterError, Result};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".sops-filter.toml";
pub const ENV_PREFIX: &str = "SOPS_FILTER_";

/// Kind of a plain Kubernetes Secret
pub const SECRET_KIND: &str = "Secret";
/// Kind of the wrapped, repository-safe document
pub const SOPS_SECRET_KIND: &str = "SopsSecret";
/// `apiVersion` written on Secrets produced by the smudge direction
pub const SECRET_API_VERSION: &str = "v1";
/// Suffix appended to the name of a wrapped document
pub const NAME_SUFFIX: &str = "-sops";

pub const DEFAULT_API_VERSION: &str = "isindir.github.com/v1alpha3";
pub const DEFAULT_ANNOTATION_KEY: &str = "def.ms/sops-encrypt";
pub const DEFAULT_ANNOTATION_VALUE: &str = "true";
pub const DEFAULT_KEY_PATH: &str = ".age/age.key";
pub const DEFAULT_KEY_ENV_VAR: &str = "SOPS_AGE_KEY_FILE";
pub const DEFAULT_SOPS_BINARY: &str = "sops";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub require_annotation: bool,
    pub annotation_key: String,
    pub annotation_value: String,
    pub default_key_path: PathBuf,
    pub key_env_var: String,
    pub sops_binary: PathBuf,
    pub api_version: String,
    pub temp_dir: Option<PathBuf>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            require_annotation: true,
            annotation_key: DEFAULT_ANNOTATION_KEY.into(),
            annotation_value: DEFAULT_ANNOTATION_VALUE.into(),
            default_key_path: PathBuf::from(DEFAULT_KEY_PATH),
            key_env_var: DEFAULT_KEY_ENV_VAR.into(),
            sops_binary: PathBuf::from(DEFAULT_SOPS_BINARY),
            api_version: DEFAULT_API_VERSION.into(),
            temp_dir: None,
            root: PathBuf::from("."),
        }
    }
}

impl FilterConfig {
    /// Defaults rooted at `root`, without reading any file or variable
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load the configuration for the repository at `root`
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let mut cfg = Self::from_file(root.as_ref())?;
        cfg.apply_overrides(|name| env::var(name).ok());
        Ok(cfg)
    }

    /// Defaults plus environment overrides, used when the file is unusable
    pub fn from_env(root: impl AsRef<Path>) -> Self {
        let mut cfg = Self::rooted_at(root);
        cfg.apply_overrides(|name| env::var(name).ok());
        cfg
    }

    fn from_file(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::rooted_at(root));
        }

        let file_cfg = Config::builder()
            .add_source(File::new(
                config_path
                    .to_str()
                    .ok_or_else(|| FilterError::Config("Invalid config path".into()))?,
                FileFormat::Toml,
            ))
            .build()
            .map_err(|err| FilterError::Config(format!("Failed to load {CONFIG_FILE}: {err}")))?;

        let mut cfg = match file_cfg.get::<FilterConfig>("filter") {
            Ok(cfg) => cfg,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(err) => {
                return Err(FilterError::Config(format!(
                    "Invalid [filter] table in {CONFIG_FILE}: {err}"
                )))
            }
        };
        cfg.root = root.to_path_buf();
        Ok(cfg)
    }

    /// Apply `SOPS_FILTER_*` overrides read through `lookup`
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(require) = var("REQUIRE_ANNOTATION").and_then(|v| v.parse().ok()) {
            self.require_annotation = require;
        }
        if let Some(key) = var("ANNOTATION_KEY") {
            self.annotation_key = key;
        }
        if let Some(value) = var("ANNOTATION_VALUE") {
            self.annotation_value = value;
        }
        if let Some(path) = var("DEFAULT_KEY_PATH") {
            self.default_key_path = PathBuf::from(path);
        }
        if let Some(name) = var("KEY_ENV_VAR") {
            self.key_env_var = name;
        }
        if let Some(binary) = var("SOPS_BINARY") {
            self.sops_binary = PathBuf::from(binary);
        }
        if let Some(api_version) = var("API_VERSION") {
            self.api_version = api_version;
        }
        if let Some(dir) = var("TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(dir));
        }
    }

    /// Location of the repository default key file
    pub fn default_key_location(&self) -> PathBuf {
        if self.default_key_path.is_absolute() {
            self.default_key_path.clone()
        } else {
            self.root.join(&self.default_key_path)
        }
    }
}
