//! Text-to-object decoding for YAML and JSON content.

use crate::core::location;
use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Supported content formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml`
    Yaml,
    /// `.yml`, decoded exactly like [`Format::Yaml`]
    Yml,
    /// `.json`
    Json,
}

impl Format {
    /// Detect the format from a location's trailing extension.
    pub fn from_location(location: &str) -> Result<Self> {
        location::extension(location).parse()
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "yaml" => Ok(Self::Yaml),
            "yml" => Ok(Self::Yml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                format: tag.to_string(),
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Yml => write!(f, "yml"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Decode `text` in the given format.
///
/// # Errors
///
/// Returns [`ConfigError::Decode`] if the text is malformed.
pub fn decode(text: &str, format: Format) -> Result<Value> {
    let decoded = match format {
        Format::Yaml | Format::Yml => {
            serde_yaml::from_str::<Value>(text).map_err(|e| e.to_string())
        }
        Format::Json => serde_json::from_str::<Value>(text).map_err(|e| e.to_string()),
    };

    decoded.map_err(|message| ConfigError::Decode {
        location: format.to_string(),
        message,
    })
}

/// Decode the content fetched from `location` into a configuration mapping.
///
/// The format comes from the location's extension. Blank or `null` documents
/// yield an empty mapping; any other non-mapping root is rejected.
pub(crate) fn decode_document(text: &str, location: &str) -> Result<Value> {
    let format = Format::from_location(location)?;
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value = decode(text, format).map_err(|e| match e {
        ConfigError::Decode { message, .. } => ConfigError::Decode {
            location: location.to_string(),
            message,
        },
        other => other,
    })?;

    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        other => Err(ConfigError::Decode {
            location: location.to_string(),
            message: format!("expected a mapping at document root, found {}", kind_of(&other)),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
