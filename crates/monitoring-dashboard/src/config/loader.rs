//! Configuration file loader with position-aware error reporting.
//!
//! Loads TOML configuration from a specific path or the default XDG location.
//! When the default location has no file, returns `Config::default()`.
//! Also loads the dashboard inputs the configuration points at: the widget
//! definition file and the optional explicit baseline.

use std::fs;
use std::path::Path;

use portlet_grid::{codec, ConfigurationDocument, WidgetRegistry};

use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::config::xdg;

/// Stateless configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a specific path.
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist, or
    /// `ConfigError::ReadError` for other I/O failures.
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let content = read_file(path, "Configuration file not found")?;
        Self::parse_toml(&content, path)
    }

    /// Load configuration from the default XDG location.
    ///
    /// If no file exists at the default path, returns `Config::default()`
    /// instead of an error.
    pub fn load_default() -> Result<Config, ConfigError> {
        let path = xdg::config_path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Load from `explicit` when given (it must exist), otherwise from the
    /// default location.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => Self::load_default(),
        }
    }

    /// Parse a TOML string into `Config` with position-aware error reporting.
    fn parse_toml(content: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map(|span| {
                    let line = content[..span.start].matches('\n').count() + 1;
                    let last_newline = content[..span.start]
                        .rfind('\n')
                        .map(|p| p + 1)
                        .unwrap_or(0);
                    let column = span.start - last_newline + 1;
                    (line, column)
                })
                .unwrap_or((0, 0));
            ConfigError::ParseError {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }

    /// Load the widget definition file.
    pub fn load_registry(path: &Path) -> Result<WidgetRegistry, ConfigError> {
        let content = read_file(path, "Widget definition file not found")?;
        let registry = WidgetRegistry::from_json(&content).map_err(|source| {
            ConfigError::Dashboard {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::debug!(count = registry.len(), "loaded widget definitions from {:?}", path);
        Ok(registry)
    }

    /// Resolve the baseline document.
    ///
    /// Without an explicit path the baseline is derived from the definitions
    /// flagged `"default": true`. An explicit baseline has duplicate ids
    /// removed with a warning; ids the registry doesn't know are kept so they
    /// can be reported as unavailable.
    pub fn load_baseline(
        path: Option<&Path>,
        registry: &WidgetRegistry,
    ) -> Result<ConfigurationDocument, ConfigError> {
        let Some(path) = path else {
            return Ok(registry.default_document());
        };
        let content = read_file(path, "Baseline configuration not found")?;
        let document = codec::parse_document(&content).map_err(|source| ConfigError::Dashboard {
            path: path.to_path_buf(),
            source,
        })?;
        let (document, duplicates) = codec::dedup_document(document);
        for id in &duplicates {
            tracing::warn!("baseline {:?} lists widget '{}' more than once, keeping the first", path, id);
        }
        for id in codec::unavailable_ids(&document, registry) {
            tracing::warn!("baseline {:?} names unavailable widget '{}'", path, id);
        }
        Ok(document)
    }
}

fn read_file(path: &Path, missing: &str) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
                message: missing.to_string(),
            }
        } else {
            ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;
    use crate::store::StorageVariant;
    use serial_test::serial;
    use std::path::PathBuf;

    /// Run a closure with `XDG_CONFIG_HOME` temporarily set, then restore.
    fn with_xdg_config<F: FnOnce()>(value: Option<&str>, f: F) {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        match value {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
        f();
        match original {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    const PORTLETS: &str = r#"[
        // the first two make up the derived baseline
        {"id": "pull-request", "width": 2, "color": "blue", "default": true},
        {"id": "checks", "default": true},
        {"id": "coverage", "height": 2}
    ]"#;

    // -----------------------------------------------------------------------
    // parse_toml
    // -----------------------------------------------------------------------

    #[test]
    fn parse_empty_string_returns_defaults() {
        let config = ConfigLoader::parse_toml("", &PathBuf::from("empty.toml"))
            .expect("empty string should parse to defaults");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_partial_config_fills_defaults() {
        let toml_str = r#"
[dashboard]
storage = "remote"
"#;
        let config = ConfigLoader::parse_toml(toml_str, &PathBuf::from("partial.toml"))
            .expect("partial config should parse");
        assert_eq!(config.dashboard.storage, StorageVariant::Remote);
        assert_eq!(config.remote.timeout, "5s");
        assert_eq!(config.daemon.log_level, LogLevel::Info);
    }

    #[test]
    fn parse_invalid_toml_returns_parse_error_with_position() {
        let toml_str = "[dashboard]\nstorage = \ninvalid";
        let path = PathBuf::from("bad.toml");
        let err = ConfigLoader::parse_toml(toml_str, &path).expect_err("should fail");
        match err {
            ConfigError::ParseError {
                path: p,
                line,
                column,
                message,
            } => {
                assert_eq!(p, path);
                assert!(line >= 2, "error should point at or after the storage line");
                assert!(column > 0, "column should be > 0 for known span");
                assert!(!message.is_empty(), "message should not be empty");
            }
            other => panic!("expected ParseError, got: {other:?}"),
        }
    }

    #[test]
    fn parse_wrong_type_reports_position() {
        let toml_str = "[remote]\nautostart = \"yes\"\n";
        let err = ConfigLoader::parse_toml(toml_str, &PathBuf::from("typed.toml"))
            .expect_err("string is not a bool");
        assert!(matches!(err, ConfigError::ParseError { line, .. } if line > 0), "{err:?}");
    }

    // -----------------------------------------------------------------------
    // load_from_path / load_default
    // -----------------------------------------------------------------------

    #[test]
    fn load_from_path_valid_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let file = dir.path().join("config.toml");
        fs::write(&file, "[daemon]\nlog_level = \"trace\"\n").expect("failed to write temp file");
        let config = ConfigLoader::load_from_path(&file).expect("should load");
        assert_eq!(config.daemon.log_level, LogLevel::Trace);
    }

    #[test]
    fn load_from_path_missing_file_returns_not_found() {
        let path = PathBuf::from("/tmp/nonexistent_pmd_test_config.toml");
        let err = ConfigLoader::load_from_path(&path).expect_err("should fail");
        match err {
            ConfigError::NotFound { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn load_default_without_file_returns_defaults() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        with_xdg_config(dir.path().to_str(), || {
            let config = ConfigLoader::load_default().expect("missing default file is fine");
            assert_eq!(config, Config::default());
        });
    }

    #[test]
    #[serial]
    fn load_default_reads_xdg_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config_dir = dir.path().join("portlet-dashboard");
        fs::create_dir_all(&config_dir).expect("create config dir");
        fs::write(
            config_dir.join("config.toml"),
            "[dashboard]\nproject = \"Monitoring\"\n",
        )
        .expect("write config");
        with_xdg_config(dir.path().to_str(), || {
            let config = ConfigLoader::load(None).expect("should load");
            assert_eq!(config.dashboard.project, "Monitoring");
        });
    }

    // -----------------------------------------------------------------------
    // dashboard files
    // -----------------------------------------------------------------------

    #[test]
    fn load_registry_accepts_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("portlets.json");
        fs::write(&file, PORTLETS).expect("write portlets");

        let registry = ConfigLoader::load_registry(&file).expect("definitions load");
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["pull-request", "checks", "coverage"]);
        assert_eq!(registry.get("coverage").map(|d| d.default_height), Some(2));
    }

    #[test]
    fn load_registry_missing_file() {
        let err = ConfigLoader::load_registry(Path::new("/tmp/no_such_pmd_portlets.json"))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn load_registry_rejects_malformed_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("portlets.json");
        fs::write(&file, "{\"id\": \"not a list\"}").expect("write portlets");
        let err = ConfigLoader::load_registry(&file).expect_err("object is not a definition list");
        assert!(matches!(err, ConfigError::Dashboard { .. }), "{err:?}");
    }

    #[test]
    fn baseline_is_derived_without_explicit_file() {
        let registry = WidgetRegistry::from_json(PORTLETS).expect("definitions");
        let baseline = ConfigLoader::load_baseline(None, &registry).expect("derived");
        assert_eq!(baseline.to_json(), r#"[{"id":"pull-request"},{"id":"checks"}]"#);
    }

    #[test]
    fn explicit_baseline_is_deduplicated_and_keeps_unknown_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("baseline.json");
        fs::write(
            &file,
            r#"[{"id":"coverage"},{"id":"retired"},{"id":"coverage","width":3}]"#,
        )
        .expect("write baseline");
        let registry = WidgetRegistry::from_json(PORTLETS).expect("definitions");

        let baseline = ConfigLoader::load_baseline(Some(&file), &registry).expect("baseline");
        assert_eq!(baseline.to_json(), r#"[{"id":"coverage"},{"id":"retired"}]"#);
    }
}
