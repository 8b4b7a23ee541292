//! # sops-filter
//!
//! A git clean/smudge filter that keeps Kubernetes Secrets encrypted in the
//! repository while developers work with plain `Secret` manifests.
//!
//! ## Features
//!
//! - **Transparent Encryption**: annotated Secrets are wrapped and encrypted on `git add`, restored on checkout
//! - **SopsSecret Wrapping**: the stored form is a `SopsSecret` resource that the sops-secrets-operator can apply
//! - **Annotation Gate**: only Secrets annotated `def.ms/sops-encrypt: "true"` are touched
//! - **Fail-Open**: any problem passes the bytes through unchanged instead of failing the git command
//!
//! ## Quick Start
//!
//! ```bash
//! # Register the filter driver in your repository
//! sops-filter install
//!
//! # Route Secret manifests through it
//! echo '*.secret.yaml filter=sops' >> .gitattributes
//!
//! # Provide the age key
//! mkdir -p .age && cp ~/keys/team.age.key .age/age.key
//! ```
//!
//! ## How It Works
//!
//! **Clean (git add):**
//! ```text
//! Secret → classify → parse → annotation gate → wrap as SopsSecret → sops --encrypt → repository
//! ```
//!
//! **Smudge (git checkout):**
//! ```text
//! repository → classify → sops --decrypt → annotation gate → unwrap to Secret → working tree
//! ```
//!
//! Anything that is not a single annotated Secret document (other kinds,
//! plain text, multi-document streams, malformed YAML) is written back
//! byte-for-byte.
//!
//! ## Failure Behaviour
//!
//! The filter always exits successfully once it has written its output.
//!
//! - If `sops --encrypt` fails, the *unencrypted* SopsSecret is stored and a
//!   warning is logged. Watch for it: that content lands in history.
//! - If no key is available or `sops --decrypt` fails, the encrypted form is
//!   left in the working tree.
//!
//! ## Module Overview
//!
//! - [`classify`] - Cheap pre-parse classification of filter input
//! - [`document`] - Secret and SopsSecret shapes and the conversion between them
//! - [`gate`] - Annotation-based eligibility
//! - [`key`] - Age key file resolution
//! - [`sops`] - External `sops` invocation
//! - [`pipeline`] - The clean and smudge pipelines
//! - [`git`] - Filter driver registration and stdin/stdout plumbing
//! - [`config`] - Configuration loading
//! - [`error`] - Error types
//!
//! ## Configuration
//!
//! Optional `.sops-filter.toml` in the repository root, `[filter]` table,
//! overridable with `SOPS_FILTER_*` environment variables. Logging is
//! controlled with `SOPS_FILTER_LOG` (for example `SOPS_FILTER_LOG=debug`)
//! or `--verbose`, and always goes to stderr.
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib
//! cargo test --test filter_test
//! cargo test --test edge_cases_test
//! cargo test --test integration_test
//! ```
//!
//! Integration tests run the binary against a fake `sops` script, so no
//! real keys or sops installation are needed (Unix only).

pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod gate;
pub mod git;
pub mod key;
pub mod pipeline;
pub mod sops;

// Re-export commonly used types
pub use config::FilterConfig;
pub use document::{PlainSecret, WrappedSecret};
pub use error::{FilterError, Result};
pub use git::GitRepo;
pub use key::KeyResolver;
pub use pipeline::{CleanPipeline, SmudgePipeline};
pub use sops::{Crypter, SopsCli};
