use crate::config::FilterConfig;
use crate::document::{PlainSecret, WrappedSecret};
use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Decides from metadata annotations whether a document may be transformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationGate {
    required: bool,
    key: String,
    value: String,
}

impl AnnotationGate {
    pub fn new(required: bool, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            required,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            config.require_annotation,
            &config.annotation_key,
            &config.annotation_value,
        )
    }

    /// A gate that lets every document through
    pub fn open() -> Self {
        Self::new(false, "", "")
    }

    pub fn allows_plain(&self, secret: &PlainSecret) -> bool {
        let allowed = !self.required || self.matches(secret.metadata.annotations.as_ref());
        debug!(
            name = secret.metadata.name.as_deref().unwrap_or_default(),
            allowed, "annotation gate (Secret)"
        );
        allowed
    }

    /// Outer metadata first, then the first template's own annotations
    pub fn allows_wrapped(&self, wrapped: &WrappedSecret) -> bool {
        let allowed = !self.required
            || self.matches(wrapped.metadata.annotations.as_ref())
            || wrapped
                .first_template()
                .is_some_and(|template| self.matches(template.annotations.as_ref()));
        debug!(
            name = wrapped.metadata.name.as_deref().unwrap_or_default(),
            allowed, "annotation gate (SopsSecret)"
        );
        allowed
    }

    fn matches(&self, annotations: Option<&Mapping>) -> bool {
        annotations
            .and_then(|annotations| annotations.get(self.key.as_str()))
            .is_some_and(|value| matches!(value, Value::String(s) if *s == self.value))
    }
}
