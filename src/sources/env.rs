//! Environment variable access.
//!
//! [`Env`] is an immutable snapshot of variables. Aggregators read from the
//! snapshot they were built with, so tests can inject variables without
//! touching the process environment.

use crate::core::merge::set_path;
use crate::error::{ConfigError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Default prefix for environment overrides (`configr_a_b=v` -> `a.b = "v"`).
pub const DEFAULT_ENV_PREFIX: &str = "configr_";

/// Default separator between path segments of an override.
pub const DEFAULT_ENV_SEPARATOR: &str = "_";

/// Snapshot of environment variables.
///
/// # Examples
///
/// ```rust
/// use configr::sources::Env;
///
/// let env: Env = [("configr_server_port", "8080")].into_iter().collect();
/// let overrides = env.prefix_overrides("configr_", "_");
/// assert_eq!(overrides["server"]["port"], "8080");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: Arc<BTreeMap<String, String>>,
}

impl Env {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Raw value of a variable, if set.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Value of a non-empty variable, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if the variable is unset or empty and no
    /// default is given.
    pub fn get(&self, name: &str, default: Option<&str>) -> Result<String> {
        if let Some(value) = self.var(name).filter(|v| !v.is_empty()) {
            debug!(name, value, "get-env: obtained value");
            return Ok(value.to_string());
        }

        match default {
            Some(default) => {
                debug!(name, default, "get-env: not set, using default");
                Ok(default.to_string())
            }
            None => Err(ConfigError::env(name, "required")),
        }
    }

    /// Variable parsed as a boolean (see [`parse_bool`]).
    pub fn get_bool(&self, name: &str, default: Option<bool>) -> Result<bool> {
        match self.var(name).filter(|v| !v.is_empty()) {
            Some(value) => Ok(parse_bool(value)),
            None => default.ok_or_else(|| ConfigError::env(name, "required")),
        }
    }

    /// Variable split on commas, each item trimmed.
    pub fn get_list(&self, name: &str, default: Option<&str>) -> Result<Vec<String>> {
        let value = self.get(name, default)?;
        Ok(value.split(',').map(|item| item.trim().to_string()).collect())
    }

    /// Variable parsed as a number.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if the value is not numeric.
    pub fn get_number(&self, name: &str, default: Option<f64>) -> Result<f64> {
        match self.var(name).filter(|v| !v.is_empty()) {
            Some(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| !n.is_nan())
                .ok_or_else(|| ConfigError::env(name, format!("value={} is NaN", value))),
            None => default.ok_or_else(|| ConfigError::env(name, "required")),
        }
    }

    /// Collect `prefix`-named variables into a nested mapping.
    ///
    /// The prefix match is case-sensitive. The remainder of the name is split
    /// on `separator` into path segments; values stay strings.
    pub fn prefix_overrides(&self, prefix: &str, separator: &str) -> Value {
        let mut overrides = Value::Object(Map::new());
        for (key, value) in self.vars.iter() {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let path: Vec<&str> = if separator.is_empty() {
                vec![rest]
            } else {
                rest.split(separator).collect()
            };
            debug!(env = %key, path = %path.join("."), "get-env: found override");
            set_path(&mut overrides, &path, Value::String(value.clone()));
        }
        overrides
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Env {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: Arc::new(
                iter.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

/// Lenient boolean parsing: `true`, `yes`, `on` and `1` (any case) are true,
/// everything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(vars: &[(&str, &str)]) -> Env {
        vars.iter().copied().collect()
    }

    #[test]
    fn test_get_and_default() {
        let env = env(&[("HOME", "/home/me"), ("EMPTY", "")]);
        assert_eq!(env.get("HOME", None).unwrap(), "/home/me");
        assert_eq!(env.get("NOPE", Some("yup")).unwrap(), "yup");
        assert_eq!(env.get("EMPTY", Some("dflt")).unwrap(), "dflt");

        let err = env.get("NOPE", None).unwrap_err();
        assert!(err.to_string().contains("environment-variable=NOPE"));
    }

    #[test]
    fn test_get_bool() {
        let env = env(&[("T", "true"), ("W", "whut"), ("Y", "YES")]);
        assert!(env.get_bool("T", None).unwrap());
        assert!(!env.get_bool("W", None).unwrap());
        assert!(env.get_bool("Y", None).unwrap());
        assert!(env.get_bool("NOPE", Some(true)).unwrap());
        assert!(env.get_bool("NOPE", None).is_err());
    }

    #[test]
    fn test_get_list() {
        let env = env(&[("ARRAY", "one, two, three")]);
        assert_eq!(env.get_list("ARRAY", None).unwrap(), vec!["one", "two", "three"]);
        assert_eq!(
            env.get_list("NOPE", Some("one,two,three")).unwrap(),
            vec!["one", "two", "three"]
        );
    }

    #[test]
    fn test_get_number() {
        let env = env(&[("NUM", "42"), ("HOME", "/home/me")]);
        assert_eq!(env.get_number("NUM", None).unwrap(), 42.0);
        assert!(env.get_number("HOME", None).is_err());
        assert_eq!(env.get_number("NOPE", Some(7.5)).unwrap(), 7.5);
    }

    #[test]
    fn test_prefix_overrides() {
        let env = env(&[
            ("configr_a_b_c_d", "ack"),
            ("configr_foo", "bar"),
            ("CONFIGR_CONFIG_JSON", "{}"),
            ("unrelated", "x"),
        ]);
        assert_eq!(
            env.prefix_overrides(DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR),
            json!({"a": {"b": {"c": {"d": "ack"}}}, "foo": "bar"})
        );
    }

    #[test]
    fn test_prefix_overrides_custom_separator() {
        let env = env(&[("APP_SERVER__PORT", "9090"), ("APP_LOG_LEVEL", "debug")]);
        assert_eq!(
            env.prefix_overrides("APP_", "__"),
            json!({"SERVER": {"PORT": "9090"}, "LOG_LEVEL": "debug"})
        );
    }

    #[test]
    fn test_from_process_sees_path() {
        let env = Env::from_process();
        if std::env::var("PATH").is_ok() {
            assert!(env.var("PATH").is_some());
        }
    }
}
