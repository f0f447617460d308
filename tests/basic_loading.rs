//! Integration tests for basic configuration loading.

use configr::core::{Format, decode};
use configr::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct ServerConfig {
    port: u16,
    host: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct DatabaseConfig {
    url: String,
    max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct AppConfig {
    server: ServerConfig,
    database: DatabaseConfig,
}

fn write(dir: &Path, file: &str, text: &str) -> String {
    let path = dir.join(file);
    fs::write(&path, text).unwrap();
    path.to_str().unwrap().to_string()
}

/// Builder isolated from the process environment and any `config/` directory.
fn isolated() -> AggregatorBuilder {
    Aggregator::builder()
        .with_env(Env::default())
        .with_baseline(Baseline::Empty)
}

#[tokio::test]
async fn test_load_single_yaml_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write(
        temp_dir.path(),
        "config.yaml",
        r#"
server:
  port: 8080
  host: localhost
database:
  url: postgres://localhost/db
  max_connections: 10
"#,
    );

    let aggregator = isolated().with_source(config_path).build().await.unwrap();

    let cfg: AppConfig = aggregator.try_deserialize().unwrap();
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.server.host, "localhost");
    assert_eq!(cfg.database.url, "postgres://localhost/db");
    assert_eq!(cfg.database.max_connections, 10);
}

#[tokio::test]
async fn test_two_file_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let base = write(temp_dir.path(), "base.yaml", "a:\n  b: 1\n");
    let over = write(temp_dir.path(), "override.yaml", "a:\n  c: 2\n");

    let aggregator = isolated()
        .with_sources([base, over])
        .build()
        .await
        .unwrap();
    assert_eq!(*aggregator.config(), json!({"a": {"b": 1, "c": 2}}));
}

#[tokio::test]
async fn test_file_precedence() {
    let temp_dir = TempDir::new().unwrap();
    let default_path = write(
        temp_dir.path(),
        "default.yaml",
        r#"
server:
  port: 8080
  host: localhost
database:
  url: postgres://localhost/db
  max_connections: 10
"#,
    );
    let override_path = write(
        temp_dir.path(),
        "override.json",
        r#"{"server": {"port": 9090}, "database": {"max_connections": 50}}"#,
    );

    let aggregator = isolated()
        .with_source(default_path)
        .with_source(override_path)
        .build()
        .await
        .unwrap();

    let cfg: AppConfig = aggregator.try_deserialize().unwrap();
    assert_eq!(cfg.server.port, 9090);
    assert_eq!(cfg.server.host, "localhost");
    assert_eq!(cfg.database.max_connections, 50);
    assert_eq!(cfg.database.url, "postgres://localhost/db");
}

#[tokio::test]
async fn test_layer_precedence() {
    let temp_dir = TempDir::new().unwrap();
    let s1 = write(
        temp_dir.path(),
        "s1.yaml",
        "k1: s1\nk2: s1\nk3: s1\nk4: s1\nk5: s1\n",
    );
    let s2 = write(temp_dir.path(), "s2.yaml", "k2: s2\nk3: s2\nk4: s2\nk5: s2\n");

    let env: Env = [
        ("CONFIGR_CONFIG_JSON", r#"{"k4": "json", "k5": "json"}"#),
        ("configr_k5", "env"),
    ]
    .into_iter()
    .collect();

    let aggregator = Aggregator::builder()
        .with_env(env)
        .with_baseline(Baseline::Value(json!({"k3": "baseline", "k4": "baseline", "k5": "baseline"})))
        .with_sources([s1, s2])
        .build()
        .await
        .unwrap();

    assert_eq!(
        *aggregator.config(),
        json!({"k1": "s1", "k2": "s2", "k3": "baseline", "k4": "json", "k5": "env"})
    );
}

#[tokio::test]
async fn test_baseline_directory() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "default.yaml", "a:\n  b:\n    c: 123\nistrue: true\n");
    write(temp_dir.path(), "test.yaml", "mode: test\n");
    let source = write(temp_dir.path(), "app.yaml", "mode: source\nistrue: false\n");

    let env: Env = [("CONFIGR_ENV", "test")].into_iter().collect();
    let aggregator = Aggregator::builder()
        .with_env(env)
        .with_baseline(Baseline::files(temp_dir.path()))
        .with_source(source)
        .build()
        .await
        .unwrap();

    assert_eq!(aggregator.get("a.b.c"), Some(json!(123)));
    assert_eq!(aggregator.get("mode"), Some(json!("test")));
    assert_eq!(aggregator.get("istrue"), Some(json!(true)));
}

#[tokio::test]
async fn test_env_overrides_custom_prefix() {
    let env: Env = [("APP_SERVER__PORT", "9000"), ("app_server__host", "ignored")]
        .into_iter()
        .collect();

    let aggregator = isolated()
        .with_env(env)
        .with_env_overrides("APP_", "__")
        .build()
        .await
        .unwrap();
    assert_eq!(*aggregator.config(), json!({"SERVER": {"PORT": "9000"}}));
}

#[tokio::test]
async fn test_modifier_overlays() {
    let temp_dir = TempDir::new().unwrap();
    let base = write(temp_dir.path(), "a.yaml", "x: 1\ny: 1\n");
    write(temp_dir.path(), "a.dev.yaml", "y: 2\n");

    let aggregator = isolated()
        .with_source(SourceDescriptor::new(base).with_modifiers(["dev", "missing"]))
        .build()
        .await
        .unwrap();
    assert_eq!(*aggregator.config(), json!({"x": 1, "y": 2}));
}

#[tokio::test]
async fn test_missing_file_required_unless_optional() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.yaml");
    let missing = missing.to_str().unwrap();

    let err = isolated().with_source(missing).build().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let aggregator = isolated()
        .with_source(SourceDescriptor::new(missing).with_must_exist(false))
        .build()
        .await
        .unwrap();
    assert_eq!(*aggregator.config(), json!({}));
}

#[tokio::test]
async fn test_unsupported_extension() {
    let temp_dir = TempDir::new().unwrap();
    let path = write(temp_dir.path(), "app.properties", "a=b\n");

    let err = isolated().with_source(path).build().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(err.to_string().contains("unhandled type=properties"));
}

#[test]
fn test_format_dispatch() {
    assert_eq!(decode("foo: bar", Format::Yaml).unwrap(), json!({"foo": "bar"}));
    assert_eq!(decode(r#"{"foo":"bar"}"#, Format::Json).unwrap(), json!({"foo": "bar"}));

    let err = "properties".parse::<Format>().unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}
