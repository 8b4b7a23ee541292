use super::{kind_of, parse_document, settle, Outcome, Passthrough};
use crate::classify::{classify, is_encrypted, Classification, Direction};
use crate::config::{FilterConfig, SOPS_SECRET_KIND};
use crate::document::{Unwrapped, WrappedSecret};
use crate::error::{FilterError, Result};
use crate::gate::AnnotationGate;
use crate::sops::{to_yaml, Crypter};
use serde_yaml::Value;
use std::borrow::Cow;
use tracing::{info, warn};

/// Repository content to plaintext working tree content
pub struct SmudgePipeline<C> {
    gate: AnnotationGate,
    crypter: C,
}

impl<C: Crypter> SmudgePipeline<C> {
    pub fn new(config: &FilterConfig, crypter: C) -> Self {
        Self {
            gate: AnnotationGate::from_config(config),
            crypter,
        }
    }

    /// Run the filter; never fails, worst case returns `input`
    pub fn run<'a>(&self, input: &'a [u8]) -> Cow<'a, [u8]> {
        settle(input, Direction::Smudge, self.process(input))
    }

    pub fn process(&self, input: &[u8]) -> Result<Outcome> {
        match classify(input, Direction::Smudge) {
            Classification::Skip => return Ok(Outcome::Passthrough(Passthrough::NotCandidate)),
            Classification::MultiDocument => {
                return Ok(Outcome::Passthrough(Passthrough::MultiDocument))
            }
            Classification::Candidate => {}
        }

        let text = std::str::from_utf8(input)
            .map_err(|e| FilterError::Other(format!("input is not UTF-8: {e}")))?;

        if is_encrypted(text) {
            self.smudge_encrypted(text)
        } else {
            self.smudge_plain(text)
        }
    }

    fn smudge_encrypted(&self, text: &str) -> Result<Outcome> {
        let Some(decrypted) = self.crypter.decrypt(text) else {
            return Ok(Outcome::Passthrough(Passthrough::NotDecrypted));
        };

        if kind_of(&decrypted) == Some(SOPS_SECRET_KIND) {
            self.restore(decrypted)
        } else {
            Ok(Outcome::Emit(to_yaml(&decrypted)?))
        }
    }

    fn smudge_plain(&self, text: &str) -> Result<Outcome> {
        let Some(document) = parse_document(text) else {
            return Ok(Outcome::Passthrough(Passthrough::Unparsable));
        };
        match kind_of(&document) {
            Some(SOPS_SECRET_KIND) => self.restore(document),
            other => Ok(Outcome::Passthrough(Passthrough::OtherKind(
                other.map(str::to_string),
            ))),
        }
    }

    fn restore(&self, document: Value) -> Result<Outcome> {
        let wrapped: WrappedSecret = serde_yaml::from_value(document)?;
        if !self.gate.allows_wrapped(&wrapped) {
            return Ok(Outcome::Passthrough(Passthrough::Ineligible));
        }

        match wrapped.to_plain()? {
            Unwrapped::Secret(secret) => {
                info!(
                    name = secret.metadata.name.as_deref().unwrap_or_default(),
                    "unwrapping SopsSecret as Secret"
                );
                Ok(Outcome::Emit(serde_yaml::to_string(&secret)?))
            }
            Unwrapped::Unchanged(wrapped) => {
                if wrapped.template_count() > 1 {
                    warn!(
                        templates = wrapped.template_count(),
                        "SopsSecret holds several secret templates; leaving it as is"
                    );
                }
                Ok(Outcome::Passthrough(Passthrough::NotConvertible))
            }
        }
    }
}
