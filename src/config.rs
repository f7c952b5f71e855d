// Configuration cascade for flightcheck
//
// A frozen snapshot merging, in increasing precedence: program-derived defaults,
// a YAML configuration file, and HOUSTON_* environment overrides. Built once at
// process start; the rest of the worker only reads from it.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::{ConfigError, Result};

/// Environment variable prefix recognized for configuration overrides
pub const ENV_PREFIX: &str = "HOUSTON_";

/// Special-cased outside the prefix convention: sets `environment.name`
pub const ENV_NAME_VAR: &str = "FLIGHTCHECK_ENV";

/// Special-cased outside the prefix convention: raises console log verbosity
pub const ENV_DEBUG_VAR: &str = "FLIGHTCHECK_DEBUG";

/// Well-known file locations probed when no explicit path is given
const SEARCH_PATHS: &[&str] = &[
    "flightcheck.yaml",
    "config/flightcheck.yaml",
    "/etc/flightcheck/config.yaml",
];

/// Immutable configuration snapshot keyed by dot-delimited paths
#[derive(Debug, Clone)]
pub struct Config {
    values: BTreeMap<String, Value>,
    source_file: Option<PathBuf>,
}

impl Config {
    /// Build the snapshot. `explicit_path` must exist when given; without it the
    /// fixed search order is probed and a missing file is not an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let env: Vec<(String, String)> = std::env::vars().collect();
        Self::load_with_env(explicit_path, &env)
    }

    /// Cascade assembly with an injected environment, for tests
    pub fn load_with_env(explicit_path: Option<&Path>, env: &[(String, String)]) -> Result<Self> {
        let mut values = program_defaults();

        let source_file = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                        suggestion: Some(
                            "pass --config with an existing file or drop the flag to use defaults"
                                .to_string(),
                        ),
                    }
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => SEARCH_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file()),
        };

        if let Some(path) = &source_file {
            merge_file(&mut values, path)?;
        }

        merge_env(&mut values, env);

        Ok(Self {
            values,
            source_file,
        })
    }

    /// The configuration file the cascade read, if any
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(|v| v.as_u64())
    }

    /// Bus endpoint address the orchestrator connects to
    pub fn bus_endpoint(&self) -> String {
        self.get_str("server.url")
            .unwrap_or("127.0.0.1:3000")
            .to_string()
    }

    /// Logical name of the downstream service reports are addressed to
    pub fn downstream(&self) -> String {
        self.get_str("server.destination")
            .unwrap_or("telemetry")
            .to_string()
    }

    /// Root of the hook-module tree
    pub fn hook_root(&self) -> PathBuf {
        PathBuf::from(self.get_str("hooks.root").unwrap_or("hooks"))
    }

    /// Per-hook execution timeout
    pub fn hook_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.get_u64("hooks.timeout_secs")
                .unwrap_or(crate::runner::DEFAULT_HOOK_TIMEOUT.as_secs()),
        )
    }

    pub fn log_level(&self) -> Option<&str> {
        self.get_str("log.level")
    }

    /// Console log format name (pretty, json, compact)
    pub fn log_format(&self) -> Option<&str> {
        self.get_str("log.format")
    }

    /// Active environment name
    pub fn environment(&self) -> &str {
        self.get_str("environment.name").unwrap_or("development")
    }
}

/// Program-derived defaults: semantic version triple and build provenance
fn program_defaults() -> BTreeMap<String, Value> {
    let mut values = BTreeMap::new();

    if let Ok(version) = semver::Version::parse(crate::VERSION) {
        values.insert("version.major".to_string(), json!(version.major));
        values.insert("version.minor".to_string(), json!(version.minor));
        values.insert("version.patch".to_string(), json!(version.patch));
    }
    values.insert("build.commit".to_string(), json!(crate::GIT_COMMIT));
    values.insert("build.changelog".to_string(), json!(crate::GIT_CHANGELOG));
    values.insert("build.date".to_string(), json!(crate::BUILD_DATE));

    values
}

/// Merge a YAML file's nested mappings into dot-delimited keys
fn merge_file(values: &mut BTreeMap<String, Value>, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IOError {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    })?;

    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidYaml {
            message: e.to_string(),
            file_path: Some(path.to_path_buf()),
        })?;

    flatten_yaml(values, "", &parsed);
    Ok(())
}

fn flatten_yaml(values: &mut BTreeMap<String, Value>, prefix: &str, node: &serde_yaml::Value) {
    match node {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key) = key.as_str() else { continue };
                let path = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_yaml(values, &path, value);
            }
        }
        serde_yaml::Value::Null => {}
        other => {
            if !prefix.is_empty() {
                if let Ok(v) = serde_json::to_value(other) {
                    values.insert(prefix.to_string(), v);
                }
            }
        }
    }
}

/// Apply environment overrides on top of file values
fn merge_env(values: &mut BTreeMap<String, Value>, env: &[(String, String)]) {
    for (name, value) in env {
        if let Some(rest) = name.strip_prefix(ENV_PREFIX) {
            if rest.is_empty() {
                continue;
            }
            let key = env_var_to_key(rest);
            values.insert(key, coerce_env_value(value));
        }
    }

    // Special-cased variables outside the prefix convention
    for (name, value) in env {
        if name == ENV_NAME_VAR && !value.is_empty() {
            values.insert("environment.name".to_string(), json!(value));
        }
        if name == ENV_DEBUG_VAR && !value.is_empty() {
            values.insert("log.level".to_string(), json!("debug"));
        }
    }
}

/// Transform the suffix of a prefixed variable into a dot-delimited key.
///
/// Segments are lowercased and joined with `.`; the literal segment `env` is
/// renamed to `environment`. `LOG_LEVEL` becomes `log.level`, `ENV_NAME`
/// becomes `environment.name`.
fn env_var_to_key(suffix: &str) -> String {
    suffix
        .split('_')
        .map(|segment| {
            let segment = segment.to_lowercase();
            if segment == "env" {
                "environment".to_string()
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Values that parse fully as numbers are stored as numbers, otherwise strings
fn coerce_env_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return json!(n);
    }
    if let Ok(n) = raw.parse::<f64>() {
        if n.is_finite() {
            return json!(n);
        }
    }
    json!(raw)
}
