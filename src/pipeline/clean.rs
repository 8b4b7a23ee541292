use super::{kind_of, parse_document, settle, Outcome, Passthrough};
use crate::classify::{classify, Classification, Direction};
use crate::config::{FilterConfig, SECRET_KIND, SOPS_SECRET_KIND};
use crate::document::PlainSecret;
use crate::error::{FilterError, Result};
use crate::gate::AnnotationGate;
use crate::sops::Crypter;
use serde_yaml::Value;
use std::borrow::Cow;
use tracing::{info, warn};

/// Plaintext working tree content to repository content
pub struct CleanPipeline<C> {
    gate: AnnotationGate,
    api_version: String,
    crypter: C,
}

impl<C: Crypter> CleanPipeline<C> {
    pub fn new(config: &FilterConfig, crypter: C) -> Self {
        Self {
            gate: AnnotationGate::from_config(config),
            api_version: config.api_version.clone(),
            crypter,
        }
    }

    /// Run the filter; never fails, worst case returns `input`
    pub fn run<'a>(&self, input: &'a [u8]) -> Cow<'a, [u8]> {
        settle(input, Direction::Clean, self.process(input))
    }

    pub fn process(&self, input: &[u8]) -> Result<Outcome> {
        match classify(input, Direction::Clean) {
            Classification::Skip => return Ok(Outcome::Passthrough(Passthrough::NotCandidate)),
            Classification::MultiDocument => {
                return Ok(Outcome::Passthrough(Passthrough::MultiDocument))
            }
            Classification::Candidate => {}
        }

        let text = std::str::from_utf8(input)
            .map_err(|e| FilterError::Other(format!("input is not UTF-8: {e}")))?;
        let Some(document) = parse_document(text) else {
            return Ok(Outcome::Passthrough(Passthrough::Unparsable));
        };

        match kind_of(&document) {
            Some(SECRET_KIND) => self.clean_secret(document),
            Some(SOPS_SECRET_KIND) => self.clean_wrapped(document),
            other => Ok(Outcome::Passthrough(Passthrough::OtherKind(
                other.map(str::to_string),
            ))),
        }
    }

    fn clean_secret(&self, document: Value) -> Result<Outcome> {
        let secret: PlainSecret = serde_yaml::from_value(document)?;
        if !self.gate.allows_plain(&secret) {
            return Ok(Outcome::Passthrough(Passthrough::Ineligible));
        }

        let wrapped = secret.to_wrapped(&self.api_version)?;
        info!(
            name = wrapped.metadata.name.as_deref().unwrap_or_default(),
            "wrapping Secret as SopsSecret"
        );
        self.seal(&serde_yaml::to_value(&wrapped)?)
    }

    fn clean_wrapped(&self, document: Value) -> Result<Outcome> {
        if document.get("sops").is_some() {
            return Ok(Outcome::Passthrough(Passthrough::AlreadyEncrypted));
        }
        self.seal(&document)
    }

    fn seal(&self, document: &Value) -> Result<Outcome> {
        let sealed = self.crypter.encrypt(document)?;
        if !sealed.is_encrypted() {
            warn!("writing unencrypted SopsSecret to the repository");
        }
        Ok(Outcome::Emit(sealed.into_text()))
    }
}
