//! # Filter Pipelines
//!
//! [`CleanPipeline`] turns a plaintext Secret into an encrypted SopsSecret
//! (`git add`), [`SmudgePipeline`] reverses it (`git checkout`).
//!
//! Each step returns either a value to continue with or an [`Outcome`]. The
//! fail-open rule lives in exactly one place, [`settle`]: anything other than
//! [`Outcome::Emit`] becomes the original input bytes.

mod clean;
mod smudge;

pub use clean::CleanPipeline;
pub use smudge::SmudgePipeline;

use crate::classify::Direction;
use crate::error::Result;
use serde_yaml::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

/// What a pipeline decided to do with its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Write this text instead of the input
    Emit(String),
    /// Write the input back unchanged
    Passthrough(Passthrough),
}

/// Why the input is passed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passthrough {
    NotCandidate,
    MultiDocument,
    Unparsable,
    OtherKind(Option<String>),
    Ineligible,
    AlreadyEncrypted,
    NotConvertible,
    NotDecrypted,
}

/// Map a pipeline result to the bytes written to stdout.
///
/// Errors and passthrough decisions both yield the original input.
pub fn settle(input: &[u8], direction: Direction, result: Result<Outcome>) -> Cow<'_, [u8]> {
    match result {
        Ok(Outcome::Emit(text)) => Cow::Owned(text.into_bytes()),
        Ok(Outcome::Passthrough(reason)) => {
            debug!(?direction, ?reason, "passing input through");
            Cow::Borrowed(input)
        }
        Err(err) => {
            warn!(?direction, "filter failed, passing input through: {err}");
            Cow::Borrowed(input)
        }
    }
}

/// Parse a single YAML document, keeping it only if it is a mapping
fn parse_document(text: &str) -> Option<Value> {
    serde_yaml::from_str::<Value>(text)
        .ok()
        .filter(Value::is_mapping)
}

fn kind_of(document: &Value) -> Option<&str> {
    document.get("kind").and_then(Value::as_str)
}
