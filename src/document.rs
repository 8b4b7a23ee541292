//! # Document Shapes
//!
//! The two document shapes the filters understand, and the pure conversion
//! between them.
//!
//! A [`PlainSecret`] is an ordinary Kubernetes `Secret`:
//!
//! ```yaml
//! apiVersion: v1
//! kind: Secret
//! metadata:
//!   name: db-creds
//!   annotations:
//!     def.ms/sops-encrypt: "true"
//! type: Opaque
//! data:
//!   password: cGFzcw==
//! ```
//!
//! A [`WrappedSecret`] is the `SopsSecret` custom resource that carries the
//! same payload inside `spec.secretTemplates`:
//!
//! ```yaml
//! apiVersion: isindir.github.com/v1alpha3
//! kind: SopsSecret
//! metadata:
//!   name: db-creds-sops
//!   annotations:
//!     def.ms/sops-encrypt: "true"
//! spec:
//!   secretTemplates:
//!     - name: db-creds
//!       type: Opaque
//!       annotations:
//!         def.ms/sops-encrypt: "true"
//!       data:
//!         password: cGFzcw==
//! ```
//!
//! Labels and annotations are written to both the wrapper metadata and the
//! template so either location satisfies the annotation gate on the way back.

use crate::config::{NAME_SUFFIX, SECRET_API_VERSION, SECRET_KIND, SOPS_SECRET_KIND};
use crate::error::{FilterError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Mapping>,
}

/// A plain Kubernetes `Secret`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainSecret {
    #[serde(default = "secret_api_version")]
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_data: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
}

/// A `SopsSecret` wrapping one or more secret templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedSecret {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<WrappedSecretSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedSecretSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_templates: Option<Vec<SecretTemplate>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_data: Option<Mapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
}

fn secret_api_version() -> String {
    SECRET_API_VERSION.into()
}

/// Outcome of unwrapping a [`WrappedSecret`]
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    Secret(PlainSecret),
    /// No single usable template; the wrapper is handed back untouched
    Unchanged(WrappedSecret),
}

/// Name of the wrapper for a secret called `name`.
///
/// Idempotent: a name that already ends in `-sops` is kept as is.
pub fn wrapped_name(name: &str) -> String {
    if name.ends_with(NAME_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{NAME_SUFFIX}")
    }
}

impl PlainSecret {
    /// Convert to the wrapped shape
    pub fn to_wrapped(&self, api_version: &str) -> Result<WrappedSecret> {
        let name = self
            .metadata
            .name
            .as_deref()
            .ok_or(FilterError::MissingName)?;

        let template = SecretTemplate {
            name: Some(name.to_string()),
            secret_type: Some(
                self.secret_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SECRET_TYPE.into()),
            ),
            labels: self.metadata.labels.clone(),
            annotations: self.metadata.annotations.clone(),
            data: self.data.clone(),
            string_data: self.string_data.clone(),
            immutable: self.immutable,
        };

        Ok(WrappedSecret {
            api_version: api_version.to_string(),
            kind: SOPS_SECRET_KIND.into(),
            metadata: ObjectMeta {
                name: Some(wrapped_name(name)),
                namespace: self.metadata.namespace.clone(),
                labels: self.metadata.labels.clone(),
                annotations: self.metadata.annotations.clone(),
            },
            spec: Some(WrappedSecretSpec {
                secret_templates: Some(vec![template]),
            }),
        })
    }
}

impl WrappedSecret {
    /// The single template this wrapper carries, if it carries exactly one
    pub fn sole_template(&self) -> Option<&SecretTemplate> {
        match self.spec.as_ref()?.secret_templates.as_deref()? {
            [template] => Some(template),
            _ => None,
        }
    }

    /// The first template, regardless of how many follow it
    pub fn first_template(&self) -> Option<&SecretTemplate> {
        self.spec.as_ref()?.secret_templates.as_deref()?.first()
    }

    pub fn template_count(&self) -> usize {
        self.spec
            .as_ref()
            .and_then(|spec| spec.secret_templates.as_ref())
            .map_or(0, Vec::len)
    }

    /// Convert back to a plain Secret.
    ///
    /// A wrapper with no templates, or with more than one, is not
    /// convertible and comes back as [`Unwrapped::Unchanged`].
    pub fn to_plain(self) -> Result<Unwrapped> {
        match self.sole_template().map(|template| self.plain_from(template)) {
            Some(secret) => secret.map(Unwrapped::Secret),
            None => Ok(Unwrapped::Unchanged(self)),
        }
    }

    fn plain_from(&self, template: &SecretTemplate) -> Result<PlainSecret> {
        let name = template
            .name
            .clone()
            .or_else(|| self.metadata.name.clone())
            .ok_or(FilterError::MissingName)?;

        let labels = non_empty(template.labels.as_ref())
            .or_else(|| non_empty(self.metadata.labels.as_ref()))
            .cloned();
        let annotations = non_empty(template.annotations.as_ref())
            .or_else(|| non_empty(self.metadata.annotations.as_ref()))
            .cloned();

        Ok(PlainSecret {
            api_version: SECRET_API_VERSION.into(),
            kind: SECRET_KIND.into(),
            metadata: ObjectMeta {
                name: Some(name),
                namespace: self.metadata.namespace.clone(),
                labels,
                annotations,
            },
            secret_type: Some(
                template
                    .secret_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SECRET_TYPE.into()),
            ),
            data: non_empty(template.data.as_ref()).cloned(),
            string_data: non_empty(template.string_data.as_ref()).cloned(),
            immutable: template.immutable,
        })
    }
}

fn non_empty(mapping: Option<&Mapping>) -> Option<&Mapping> {
    mapping.filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "isindir.github.com/v1alpha3";

    fn parse_plain(yaml: &str) -> PlainSecret {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn parse_wrapped(yaml: &str) -> WrappedSecret {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn wrapped_name_appends_suffix_once() {
        assert_eq!(wrapped_name("db-creds"), "db-creds-sops");
        assert_eq!(wrapped_name("foo-sops"), "foo-sops");
        assert_eq!(wrapped_name(&wrapped_name("x")), "x-sops");
    }

    #[test]
    fn to_wrapped_builds_single_template() {
        let secret = parse_plain(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: db-creds
  namespace: prod
  labels:
    app: db
  annotations:
    def.ms/sops-encrypt: "true"
data:
  password: cGFzcw==
"#,
        );

        let wrapped = secret.to_wrapped(API).unwrap();
        assert_eq!(wrapped.api_version, API);
        assert_eq!(wrapped.kind, "SopsSecret");
        assert_eq!(wrapped.metadata.name.as_deref(), Some("db-creds-sops"));
        assert_eq!(wrapped.metadata.namespace.as_deref(), Some("prod"));
        assert_eq!(wrapped.metadata.labels, Some(mapping("app: db")));

        let template = wrapped.sole_template().unwrap();
        assert_eq!(template.name.as_deref(), Some("db-creds"));
        assert_eq!(template.secret_type.as_deref(), Some("Opaque"));
        assert_eq!(template.data, Some(mapping("password: cGFzcw==")));
        assert_eq!(template.labels, wrapped.metadata.labels);
        assert_eq!(template.annotations, wrapped.metadata.annotations);
        assert!(template.string_data.is_none());
        assert!(template.immutable.is_none());
    }

    #[test]
    fn to_wrapped_keeps_existing_suffix() {
        let secret = parse_plain("kind: Secret\nmetadata:\n  name: foo-sops\n");
        let wrapped = secret.to_wrapped(API).unwrap();
        assert_eq!(wrapped.metadata.name.as_deref(), Some("foo-sops"));
        assert_eq!(
            wrapped.sole_template().unwrap().name.as_deref(),
            Some("foo-sops")
        );
    }

    #[test]
    fn to_wrapped_requires_name() {
        let secret = parse_plain("kind: Secret\nmetadata:\n  namespace: prod\n");
        assert!(matches!(
            secret.to_wrapped(API),
            Err(FilterError::MissingName)
        ));
    }

    #[test]
    fn to_wrapped_never_synthesizes_empty_maps() {
        let secret = parse_plain("kind: Secret\nmetadata:\n  name: bare\n");
        let yaml = serde_yaml::to_string(&secret.to_wrapped(API).unwrap()).unwrap();
        assert!(!yaml.contains("data"));
        assert!(!yaml.contains("labels"));
        assert!(!yaml.contains("annotations"));
        assert!(!yaml.contains("namespace"));
    }

    #[test]
    fn to_plain_prefers_template_metadata() {
        let wrapped = parse_wrapped(
            r#"
apiVersion: isindir.github.com/v1alpha3
kind: SopsSecret
metadata:
  name: db-creds-sops
  namespace: prod
  labels:
    outer: "1"
  annotations:
    outer: "1"
spec:
  secretTemplates:
    - name: db-creds
      type: kubernetes.io/basic-auth
      labels:
        inner: "1"
      stringData:
        username: admin
      immutable: true
"#,
        );

        let Unwrapped::Secret(secret) = wrapped.to_plain().unwrap() else {
            panic!("expected conversion");
        };
        assert_eq!(secret.api_version, "v1");
        assert_eq!(secret.kind, "Secret");
        assert_eq!(secret.metadata.name.as_deref(), Some("db-creds"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("prod"));
        assert_eq!(secret.metadata.labels, Some(mapping("inner: \"1\"")));
        assert_eq!(secret.metadata.annotations, Some(mapping("outer: \"1\"")));
        assert_eq!(secret.secret_type.as_deref(), Some("kubernetes.io/basic-auth"));
        assert_eq!(secret.string_data, Some(mapping("username: admin")));
        assert!(secret.data.is_none());
        assert_eq!(secret.immutable, Some(true));
    }

    #[test]
    fn to_plain_falls_back_to_wrapper_name_and_default_type() {
        let wrapped = parse_wrapped(
            "apiVersion: x/v1\nkind: SopsSecret\nmetadata:\n  name: only-outer\nspec:\n  secretTemplates:\n    - data: {}\n",
        );
        let Unwrapped::Secret(secret) = wrapped.to_plain().unwrap() else {
            panic!("expected conversion");
        };
        assert_eq!(secret.metadata.name.as_deref(), Some("only-outer"));
        assert_eq!(secret.secret_type.as_deref(), Some("Opaque"));
        assert!(secret.data.is_none(), "empty data must not be emitted");
    }

    #[test]
    fn to_plain_without_templates_is_unchanged() {
        let wrapped = parse_wrapped("apiVersion: x/v1\nkind: SopsSecret\nmetadata:\n  name: a\n");
        let original = wrapped.clone();
        assert_eq!(wrapped.to_plain().unwrap(), Unwrapped::Unchanged(original));

        let empty = parse_wrapped(
            "apiVersion: x/v1\nkind: SopsSecret\nmetadata:\n  name: a\nspec:\n  secretTemplates: []\n",
        );
        assert!(matches!(empty.to_plain().unwrap(), Unwrapped::Unchanged(_)));
    }

    #[test]
    fn to_plain_refuses_multiple_templates() {
        let wrapped = parse_wrapped(
            r#"
apiVersion: x/v1
kind: SopsSecret
metadata:
  name: pair
spec:
  secretTemplates:
    - name: first
      stringData: {a: "1"}
    - name: second
      stringData: {b: "2"}
"#,
        );
        assert_eq!(wrapped.template_count(), 2);
        assert_eq!(wrapped.first_template().unwrap().name.as_deref(), Some("first"));
        assert!(matches!(wrapped.to_plain().unwrap(), Unwrapped::Unchanged(_)));
    }

    #[test]
    fn to_plain_without_any_name_is_an_error() {
        let wrapped = parse_wrapped(
            "apiVersion: x/v1\nkind: SopsSecret\nspec:\n  secretTemplates:\n    - type: Opaque\n",
        );
        assert!(matches!(wrapped.to_plain(), Err(FilterError::MissingName)));
    }

    #[test]
    fn conversions_are_inverse() {
        let secret = parse_plain(
            r#"
apiVersion: v1
kind: Secret
metadata:
  name: app
  namespace: web
  labels: {tier: backend}
  annotations: {def.ms/sops-encrypt: "true"}
type: Opaque
data: {token: dG9rZW4=}
stringData: {user: app}
immutable: false
"#,
        );

        let wrapped = secret.to_wrapped(API).unwrap();
        let Unwrapped::Secret(back) = wrapped.to_plain().unwrap() else {
            panic!("expected conversion");
        };
        assert_eq!(back, secret);
    }
}
