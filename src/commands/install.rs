use sops_filter::error::Result;
use sops_filter::config::CONFIG_FILE;
use sops_filter::git::{GitRepo, FILTER_NAME};

/// Register the filter driver in the current repository
pub fn install(program: &str) -> Result<()> {
    println!("Installing {FILTER_NAME} filter...");

    let repo = GitRepo::open(".")?;
    repo.configure_filters(program)?;
    println!("Configured git filters in {}", repo.git_dir().display());

    println!("\nNext steps:");
    println!("1. Route Secret manifests through the filter in .gitattributes");
    println!("   Example: echo '*.secret.yaml filter={FILTER_NAME}' >> .gitattributes");
    println!("2. Annotate each Secret to encrypt with def.ms/sops-encrypt: \"true\"");
    println!("3. Put the age key at .age/age.key or point SOPS_AGE_KEY_FILE at it");
    println!("   (optional settings go in {CONFIG_FILE})");

    Ok(())
}

/// Remove the filter driver from the current repository
pub fn uninstall() -> Result<()> {
    println!("Removing {FILTER_NAME} filter...");

    let repo = GitRepo::open(".")?;
    repo.remove_filters()?;

    println!("Filter removed. Files already checked out keep their current content.");

    Ok(())
}
