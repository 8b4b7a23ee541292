use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::pipeline::{CleanPipeline, SmudgePipeline};
use crate::sops::SopsCli;
use git2::Repository;
use std::borrow::Cow;
use std::env;
use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Name of the filter driver in git config and `.gitattributes`
pub const FILTER_NAME: &str = "sops";

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open repository at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| FilterError::NotInGitRepo)?;
        Ok(Self { repo })
    }

    /// Get the git directory path
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Get repository root path
    pub fn workdir(&self) -> Result<&Path> {
        self.repo.workdir().ok_or(FilterError::Other(
            "Repository has no working directory".into(),
        ))
    }

    /// Register the clean/smudge filter driver, invoking `program`
    pub fn configure_filters(&self, program: &str) -> Result<()> {
        let mut config = self.repo.config()?;

        config.set_str(
            &format!("filter.{FILTER_NAME}.clean"),
            &format!("{program} clean"),
        )?;
        config.set_str(
            &format!("filter.{FILTER_NAME}.smudge"),
            &format!("{program} smudge"),
        )?;

        Ok(())
    }

    /// Remove the filter driver
    pub fn remove_filters(&self) -> Result<()> {
        let mut config = self.repo.config()?;

        let _ = config.remove(&format!("filter.{FILTER_NAME}.clean"));
        let _ = config.remove(&format!("filter.{FILTER_NAME}.smudge"));

        Ok(())
    }

    /// Read back a configured filter command
    pub fn filter_command(&self, direction: &str) -> Result<Option<String>> {
        let config = self.repo.config()?.snapshot()?;
        match config.get_string(&format!("filter.{FILTER_NAME}.{direction}")) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Root directory relative paths are resolved against.
///
/// The repository working directory when inside one, else the current
/// directory.
pub fn repo_root() -> PathBuf {
    GitRepo::open(".")
        .ok()
        .and_then(|repo| repo.workdir().ok().map(Path::to_path_buf))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration for the filters, falling back to defaults on error
pub fn filter_config() -> FilterConfig {
    let root = repo_root();
    debug!(root = %root.display(), "loading configuration");
    FilterConfig::load(&root).unwrap_or_else(|err| {
        warn!("{err}; using default configuration");
        FilterConfig::from_env(&root)
    })
}

/// Clean filter: wrap and encrypt stdin onto stdout
pub fn clean_filter(config: &FilterConfig) -> Result<()> {
    let pipeline = CleanPipeline::new(config, SopsCli::from_config(config));
    run_filter(|input| pipeline.run(input))
}

/// Smudge filter: decrypt and unwrap stdin onto stdout
pub fn smudge_filter(config: &FilterConfig) -> Result<()> {
    let pipeline = SmudgePipeline::new(config, SopsCli::from_config(config));
    run_filter(|input| pipeline.run(input))
}

fn run_filter<F>(transform: F) -> Result<()>
where
    F: for<'a> Fn(&'a [u8]) -> Cow<'a, [u8]>,
{
    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;

    let output = panic::catch_unwind(AssertUnwindSafe(|| transform(&input).into_owned()))
        .unwrap_or_else(|_| {
            error!("filter panicked, passing input through");
            input.clone()
        });

    let mut stdout = io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;

    Ok(())
}
