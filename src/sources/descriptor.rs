//! Source descriptors: the input specification of a source.

use crate::core::fetch::is_http;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a descriptor is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Local file plus modifier overlays
    File,
    /// `https://` URL plus modifier overlays
    Http,
    /// Named module returning a configuration object
    Module,
    /// Environment variables under a prefix (`location` is the prefix)
    EnvPrefix,
    /// JSON object held in an environment variable (`location` is its name)
    JsonLiteral,
    /// The baseline default configuration
    Baseline,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::File => "file",
            Self::Http => "http",
            Self::Module => "module",
            Self::EnvPrefix => "env-prefix",
            Self::JsonLiteral => "json-literal",
            Self::Baseline => "baseline",
        };
        f.write_str(tag)
    }
}

/// Input specification for a source.
///
/// Deserializes from either a bare location string or an object:
///
/// ```rust
/// use configr::sources::SourceDescriptor;
///
/// let list: Vec<SourceDescriptor> = serde_json::from_str(r#"[
///     "config/base.yaml",
///     {"location": "config/app.yaml", "modifiers": ["dev"], "mustExist": false}
/// ]"#).unwrap();
/// assert_eq!(list[0].location, "config/base.yaml");
/// assert_eq!(list[1].modifiers, vec!["dev"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    /// File path, `https://` URL, module reference, env prefix or variable name
    pub location: String,

    /// Overlay tags, applied in order on top of the base location
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,

    /// Headers sent with HTTP requests
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Explicit existence requirement; inferred per location when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_exist: Option<bool>,

    /// Resolve `location` through the module loader
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_module: bool,

    /// Identity key; defaults to `location`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Explicit resolution strategy; inferred when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SourceKind>,
}

impl SourceDescriptor {
    /// Descriptor for a location with no modifiers or flags.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            modifiers: Vec::new(),
            headers: BTreeMap::new(),
            must_exist: None,
            is_module: false,
            name: None,
            kind: None,
        }
    }

    /// Descriptor for a registered module.
    pub fn module(reference: impl Into<String>) -> Self {
        Self {
            is_module: true,
            ..Self::new(reference)
        }
    }

    /// Descriptor of an explicit kind.
    pub fn of_kind(kind: SourceKind, location: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            ..Self::new(location)
        }
    }

    /// Set the overlay modifiers.
    pub fn with_modifiers<I, S>(mut self, modifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modifiers = modifiers.into_iter().map(Into::into).collect();
        self
    }

    /// Add an HTTP header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set an explicit existence requirement.
    pub fn with_must_exist(mut self, must_exist: bool) -> Self {
        self.must_exist = Some(must_exist);
        self
    }

    /// Set the identity key.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The resolution strategy for this descriptor.
    pub fn kind(&self) -> SourceKind {
        match self.kind {
            Some(kind) => kind,
            None if self.is_module => SourceKind::Module,
            None if is_http(&self.location) => SourceKind::Http,
            None => SourceKind::File,
        }
    }

    /// Identity key used for lookup, conflict detection and refresh.
    pub fn identity(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.location)
    }

    /// Check the descriptor is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDescriptor`] if `location` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(ConfigError::InvalidDescriptor(
                "location must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&str> for SourceDescriptor {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl From<String> for SourceDescriptor {
    fn from(location: String) -> Self {
        Self::new(location)
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(pretty) => f.write_str(&pretty),
            Err(_) => write!(f, "{{\"location\": {:?}}}", self.location),
        }
    }
}

/// Wire shape of a descriptor object.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    location: String,
    #[serde(default)]
    modifiers: Vec<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    must_exist: Option<bool>,
    #[serde(default)]
    is_module: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    kind: Option<SourceKind>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorInput {
    Location(String),
    Full(RawDescriptor),
}

impl<'de> Deserialize<'de> for SourceDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match DescriptorInput::deserialize(deserializer)? {
            DescriptorInput::Location(location) => Self::new(location),
            DescriptorInput::Full(raw) => Self {
                location: raw.location,
                modifiers: raw.modifiers,
                headers: raw.headers,
                must_exist: raw.must_exist,
                is_module: raw.is_module,
                name: raw.name,
                kind: raw.kind,
            },
        })
    }
}

/// Accepts `true`/`false` as booleans or strings.
fn flexible_bool<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<bool>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        None => None,
        Some(Flag::Bool(flag)) => Some(flag),
        Some(Flag::Text(text)) => Some(crate::sources::env::parse_bool(&text)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_descriptor() {
        let desc: SourceDescriptor = serde_json::from_value(json!("config/base.yaml")).unwrap();
        assert_eq!(desc, SourceDescriptor::new("config/base.yaml"));
        assert_eq!(desc.kind(), SourceKind::File);
    }

    #[test]
    fn test_object_descriptor() {
        let desc: SourceDescriptor = serde_json::from_value(json!({
            "location": "https://example.com/app.yaml",
            "modifiers": ["dev", "us"],
            "headers": {"Authorization": "Bearer s3cret"},
            "mustExist": "false",
            "name": "remote"
        }))
        .unwrap();

        assert_eq!(desc.kind(), SourceKind::Http);
        assert_eq!(desc.modifiers, vec!["dev", "us"]);
        assert_eq!(desc.must_exist, Some(false));
        assert_eq!(desc.identity(), "remote");
    }

    #[test]
    fn test_kind_inference() {
        assert_eq!(SourceDescriptor::module("get-config").kind(), SourceKind::Module);
        assert_eq!(
            SourceDescriptor::of_kind(SourceKind::EnvPrefix, "configr_").kind(),
            SourceKind::EnvPrefix
        );
        let explicit: SourceDescriptor =
            serde_json::from_value(json!({"location": "CONFIGR_CONFIG_JSON", "kind": "json-literal"}))
                .unwrap();
        assert_eq!(explicit.kind(), SourceKind::JsonLiteral);
    }

    #[test]
    fn test_identity_falls_back_to_location() {
        let desc = SourceDescriptor::new("a.yaml");
        assert_eq!(desc.identity(), "a.yaml");
        assert_eq!(desc.with_name("alpha").identity(), "alpha");
    }

    #[test]
    fn test_validate_rejects_empty_location() {
        assert!(SourceDescriptor::new("").validate().is_err());
        assert!(SourceDescriptor::new("  ").validate().is_err());
        assert!(SourceDescriptor::new("a.yaml").validate().is_ok());
    }

    #[test]
    fn test_display_renders_descriptor() {
        let desc = SourceDescriptor::new("a.yaml").with_modifiers(["dev"]);
        let shown = desc.to_string();
        assert!(shown.contains("\"location\": \"a.yaml\""));
        assert!(shown.contains("\"dev\""));
        assert!(!shown.contains("mustExist"));
    }

    #[test]
    fn test_serialize_round_trip_preserves_fields() {
        let desc = SourceDescriptor::new("https://example.com/a.json")
            .with_header("X-Token", "t")
            .with_must_exist(true);
        let back: SourceDescriptor =
            serde_json::from_value(serde_json::to_value(&desc).unwrap()).unwrap();
        assert_eq!(back, desc);
    }
}
