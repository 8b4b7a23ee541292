use sops_filter::error::Result;
use sops_filter::git::{clean_filter, filter_config, smudge_filter};

/// Clean filter implementation (called by git during add/commit)
pub fn clean() -> Result<()> {
    let config = filter_config();
    clean_filter(&config)
}

/// Smudge filter implementation (called by git during checkout)
pub fn smudge() -> Result<()> {
    let config = filter_config();
    smudge_filter(&config)
}
