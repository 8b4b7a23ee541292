//! # Key Resolution
//!
//! Finds the age key file handed to `sops`.
//!
//! ## Precedence
//!
//! 1. The file named by `SOPS_AGE_KEY_FILE` (or the configured variable),
//!    if that file exists
//! 2. The repository default, `.age/age.key` relative to the repository root,
//!    if it exists
//! 3. Nothing
//!
//! Resolution runs again on every call. Nothing is cached, so a key that
//! appears (or disappears) between two invocations is picked up.
//!
//! The key file itself is never read or written here; it is only located.

use crate::config::FilterConfig;
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Locates the key file for the external tool
#[derive(Debug, Clone)]
pub struct KeyResolver {
    env_var: String,
    default_path: PathBuf,
}

impl KeyResolver {
    pub fn new(env_var: impl Into<String>, default_path: impl Into<PathBuf>) -> Self {
        Self {
            env_var: env_var.into(),
            default_path: default_path.into(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(&config.key_env_var, config.default_key_location())
    }

    /// Name of the environment variable the key path is read from and
    /// injected into
    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Get the path to the repository default key file
    pub fn default_path(&self) -> &PathBuf {
        &self.default_path
    }

    /// Resolve the key file to use right now
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = env::var_os(&self.env_var)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
        {
            if path.is_file() {
                debug!(path = %path.display(), "using key file from {}", self.env_var);
                return Some(path);
            }
            debug!(path = %path.display(), "{} points to a missing file", self.env_var);
        }

        if self.default_path.is_file() {
            debug!(path = %self.default_path.display(), "using repository key file");
            return Some(self.default_path.clone());
        }

        debug!("no key file available");
        None
    }
}
