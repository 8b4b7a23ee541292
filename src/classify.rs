//! Cheap textual checks run before any YAML parsing.
//!
//! None of these checks decide that a document *is* a secret. They only rule
//! out input that cannot be one, so the common case (every other file routed
//! through the filter) never pays for a parse.

use tracing::debug;

/// Result of the pre-parse scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No marker for either document kind; emit the input untouched
    Skip,
    /// Contains a `---` separator line; never transformed
    MultiDocument,
    /// Worth a full parse
    Candidate,
}

/// Which direction the scan is run for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clean,
    Smudge,
}

/// Classify raw filter input.
///
/// Input that is not UTF-8 is always [`Classification::Skip`].
pub fn classify(input: &[u8], direction: Direction) -> Classification {
    let Ok(text) = std::str::from_utf8(input) else {
        debug!("input is not UTF-8");
        return Classification::Skip;
    };

    let classification = classify_text(text, direction);
    debug!(?direction, ?classification, len = text.len(), "classified input");
    classification
}

pub fn classify_text(text: &str, direction: Direction) -> Classification {
    if !has_marker(text, direction) {
        return Classification::Skip;
    }
    if is_multi_document(text) {
        return Classification::MultiDocument;
    }
    Classification::Candidate
}

/// Whether the text mentions anything either document kind could contain.
///
/// Quoted kinds, flow mappings and odd spacing must still reach the parser.
fn has_marker(text: &str, direction: Direction) -> bool {
    let mentions_kind = text.contains("kind") && text.contains("Secret");
    match direction {
        Direction::Clean => mentions_kind,
        Direction::Smudge => mentions_kind || text.contains("sops"),
    }
}

/// A `---` line at the very start or between two newlines
pub fn is_multi_document(text: &str) -> bool {
    text.starts_with("---\n")
        || text.starts_with("---\r\n")
        || text.contains("\n---\n")
        || text.contains("\n---\r\n")
}

/// Whether the text carries a top-level SOPS metadata block
pub fn is_encrypted(text: &str) -> bool {
    text.lines().any(|line| line.trim_end() == "sops:")
}
