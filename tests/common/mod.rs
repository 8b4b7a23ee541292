use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;
use tempfile::TempDir;

/// Annotated Secret from the usage example in the README
#[allow(dead_code)]
pub const DB_CREDS: &str = r#"apiVersion: v1
kind: Secret
metadata:
  name: db-creds
  annotations:
    def.ms/sops-encrypt: "true"
data:
  password: cGFzcw==
"#;

/// Stand-in for sops.
///
/// `--encrypt` prints the file followed by a `sops:` block, `--decrypt`
/// strips that block again and insists on a key file. Every call is appended
/// to `$FAKE_SOPS_LOG` when set; `$FAKE_SOPS_FAIL` makes every call fail.
const FAKE_SOPS: &str = r#"#!/bin/sh
mode="$1"
file="$2"
if [ -n "$FAKE_SOPS_LOG" ]; then
  echo "$mode key=$SOPS_AGE_KEY_FILE" >> "$FAKE_SOPS_LOG"
fi
if [ -n "$FAKE_SOPS_FAIL" ]; then
  echo "sops: simulated failure" >&2
  exit 1
fi
case "$mode" in
  --encrypt)
    cat "$file"
    printf 'sops:\n    age:\n        - recipient: age1fake\n    version: 3.8.1\n'
    ;;
  --decrypt)
    if [ ! -f "$SOPS_AGE_KEY_FILE" ]; then
      echo "no key" >&2
      exit 128
    fi
    sed '/^sops:/,$d' "$file"
    ;;
  *)
    exit 64
    ;;
esac
"#;

/// Create a new temporary git repository with user config set.
#[allow(dead_code)]
pub fn create_git_repo() -> TempDir {
    let temp = TempDir::new().expect("failed to create temp dir");

    StdCommand::new("git")
        .args(["init"])
        .current_dir(temp.path())
        .output()
        .expect("failed to init git repo");

    StdCommand::new("git")
        .args(["config", "user.email", "test@example.com"])
        .current_dir(temp.path())
        .output()
        .expect("failed to set git user.email");

    StdCommand::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(temp.path())
        .output()
        .expect("failed to set git user.name");

    temp
}

/// Write the fake sops script into `dir` and return its path.
#[allow(dead_code)]
#[cfg(unix)]
pub fn install_fake_sops(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-sops");
    fs::write(&path, FAKE_SOPS).expect("failed to write fake sops");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("failed to make fake sops executable");
    path
}

/// Place an age key at the repository default location.
#[allow(dead_code)]
pub fn install_default_key(repo: &Path) -> PathBuf {
    let dir = repo.join(".age");
    fs::create_dir_all(&dir).expect("failed to create .age");
    let key = dir.join("age.key");
    fs::write(&key, "AGE-SECRET-KEY-1FAKEFAKEFAKE\n").expect("failed to write key");
    key
}

/// Repository with the fake sops configured through the environment and a
/// default key in place.
#[allow(dead_code)]
#[cfg(unix)]
pub struct Fixture {
    pub repo: TempDir,
    pub sops: PathBuf,
}

#[allow(dead_code)]
#[cfg(unix)]
impl Fixture {
    pub fn new() -> Self {
        let repo = create_git_repo();
        let sops = install_fake_sops(repo.path());
        install_default_key(repo.path());
        Self { repo, sops }
    }

    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    pub fn log_path(&self) -> PathBuf {
        self.repo.path().join("sops-calls.log")
    }

    /// Recorded sops invocations
    pub fn calls(&self) -> String {
        fs::read_to_string(self.log_path()).unwrap_or_default()
    }

    /// A filter command with a clean environment
    pub fn filter(&self, direction: &str) -> Command {
        let mut cmd = sops_filter_cmd();
        cmd.arg(direction)
            .current_dir(self.path())
            .env_remove("SOPS_AGE_KEY_FILE")
            .env_remove("SOPS_FILTER_LOG")
            .env_remove("SOPS_FILTER_REQUIRE_ANNOTATION")
            .env_remove("FAKE_SOPS_FAIL")
            .env("SOPS_FILTER_SOPS_BINARY", &self.sops)
            .env("FAKE_SOPS_LOG", self.log_path());
        cmd
    }

    /// Run a filter direction and return stdout, asserting success
    pub fn run(&self, direction: &str, input: &[u8]) -> Vec<u8> {
        self.filter(direction)
            .write_stdin(input.to_vec())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    }

    pub fn clean(&self, input: &str) -> String {
        String::from_utf8(self.run("clean", input.as_bytes())).expect("clean output not UTF-8")
    }

    pub fn smudge(&self, input: &str) -> String {
        String::from_utf8(self.run("smudge", input.as_bytes())).expect("smudge output not UTF-8")
    }
}

/// Convenience helper for spawning the sops-filter binary via assert_cmd.
#[allow(dead_code)]
pub fn sops_filter_cmd() -> Command {
    cargo_bin_cmd!("sops-filter")
}

/// Absolute path to the sops-filter test binary.
#[allow(dead_code)]
pub fn sops_filter_bin() -> &'static str {
    env!("CARGO_BIN_EXE_sops-filter")
}
