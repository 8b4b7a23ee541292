//! # SOPS Invocation
//!
//! Wraps the external `sops` binary. Every call goes through a temporary
//! `.yaml` file so the tool picks the YAML store, and that file is removed when
//! the call returns, on success and failure alike.
//!
//! ## Failure Policy
//!
//! - **Encrypt**: a failing tool yields [`Sealed::Fallback`] holding the
//!   canonical plaintext serialization of the document. This is fail-open:
//!   the repository receives the *unencrypted* wrapper and a warning is logged.
//! - **Decrypt**: without a key the tool is not run at all; a failing tool
//!   yields `None` and the caller keeps the ciphertext as it is.

use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::key::KeyResolver;
use serde_yaml::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

const TEMP_PREFIX: &str = "sops-filter-";
const TEMP_SUFFIX: &str = ".yaml";

/// Result of an encryption attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sealed {
    /// Tool output
    Encrypted(String),
    /// Plaintext serialization, produced when the tool failed
    Fallback(String),
}

impl Sealed {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Sealed::Encrypted(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Sealed::Encrypted(text) | Sealed::Fallback(text) => text,
        }
    }
}

/// Encrypts and decrypts whole documents
pub trait Crypter {
    /// Encrypt `document`.
    ///
    /// Only fails if the document cannot be serialized at all.
    fn encrypt(&self, document: &Value) -> Result<Sealed>;

    /// Decrypt `ciphertext` into a parsed document, or `None` if that is not
    /// possible right now.
    fn decrypt(&self, ciphertext: &str) -> Option<Value>;
}

/// Canonical textual form of a document
pub fn to_yaml(document: &Value) -> Result<String> {
    Ok(serde_yaml::to_string(document)?)
}

/// [`Crypter`] backed by the `sops` command line tool
#[derive(Debug, Clone)]
pub struct SopsCli {
    binary: PathBuf,
    keys: KeyResolver,
    temp_dir: Option<PathBuf>,
}

impl SopsCli {
    pub fn new(binary: impl Into<PathBuf>, keys: KeyResolver) -> Self {
        Self {
            binary: binary.into(),
            keys,
            temp_dir: None,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            binary: config.sops_binary.clone(),
            keys: KeyResolver::from_config(config),
            temp_dir: config.temp_dir.clone(),
        }
    }

    /// Create temporary files under `dir` instead of the system default
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn try_encrypt(&self, plaintext: &str) -> Result<String> {
        let file = self.write_temp(plaintext)?;
        let key = self.keys.resolve();
        if key.is_none() {
            debug!("encrypting without a key file; sops uses its ambient configuration");
        }
        self.run("--encrypt", file.path(), key.as_deref())
        // `file` is dropped, and removed, here
    }

    fn try_decrypt(&self, ciphertext: &str, key: &Path) -> Result<Value> {
        let file = self.write_temp(ciphertext)?;
        let plaintext = self.run("--decrypt", file.path(), Some(key))?;
        Ok(serde_yaml::from_str(&plaintext)?)
    }

    fn write_temp(&self, contents: &str) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        trace!(path = %file.path().display(), len = contents.len(), "wrote temp file");
        Ok(file)
    }

    fn run(&self, mode: &str, path: &Path, key: Option<&Path>) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(mode)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(key) = key {
            cmd.env(self.keys.env_var(), key);
        }

        debug!(binary = %self.binary.display(), mode, "running sops");
        let output = cmd.output().map_err(|e| {
            FilterError::Other(format!("failed to run {}: {e}", self.binary.display()))
        })?;
        self.check(output)
    }

    fn check(&self, output: Output) -> Result<String> {
        if !output.status.success() {
            return Err(FilterError::Tool {
                tool: self.binary.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout)
            .map_err(|e| FilterError::Other(format!("sops output is not UTF-8: {e}")))
    }
}

impl Crypter for SopsCli {
    fn encrypt(&self, document: &Value) -> Result<Sealed> {
        let plaintext = to_yaml(document)?;
        match self.try_encrypt(&plaintext) {
            Ok(ciphertext) => Ok(Sealed::Encrypted(ciphertext)),
            Err(err) => {
                warn!("encryption failed, storing the document UNENCRYPTED: {err}");
                Ok(Sealed::Fallback(plaintext))
            }
        }
    }

    fn decrypt(&self, ciphertext: &str) -> Option<Value> {
        let Some(key) = self.keys.resolve() else {
            warn!("no key file found; leaving encrypted content as is");
            return None;
        };
        match self.try_decrypt(ciphertext, &key) {
            Ok(document) => Some(document),
            Err(err) => {
                warn!("decryption failed: {err}");
                None
            }
        }
    }
}
