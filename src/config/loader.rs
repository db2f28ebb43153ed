//! Configuration loading from disk and the environment.
//!
//! Resolution order for the document:
//!
//! 1. the file named by `COMMANDCENTER_LOGGING_CONFIG_PATH` (must exist),
//! 2. `logging.toml` in the working directory,
//! 3. the default document bundled with the crate.
//!
//! After parsing, `${VAR}` and `${VAR:-default}` inside string values are
//! replaced from the environment, and any existing key can be overridden
//! with `COMMANDCENTER_LOGGING_<PATH>`, e.g. `COMMANDCENTER_LOGGING_ROOT_LEVEL`.
//!
//! Every entry point has a `*_with` variant taking an environment lookup so
//! callers (and tests) decide where variables come from.

use super::schema::LoggingConfig;
use super::validation::validate_config;
use crate::core::{LoggerError, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "COMMANDCENTER_LOGGING_CONFIG_PATH";

/// Prefix of per-key override variables
pub const OVERRIDE_PREFIX: &str = "COMMANDCENTER_LOGGING_";

pub const DEFAULT_CONFIG_FILE: &str = "logging.toml";

/// The document used when no file is found
pub const BUNDLED_CONFIG: &str = include_str!("../../config/logging.toml");

/// Environment lookup: variable name to value
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(ConfigFormat::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ConfigFormat::Json),
            _ => Err(LoggerError::config(
                "loader",
                format!(
                    "cannot tell the format of '{}' (expected .toml or .json)",
                    path.display()
                ),
            )),
        }
    }
}

/// Where a loaded document came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path taken from `COMMANDCENTER_LOGGING_CONFIG_PATH`
    Env(PathBuf),
    /// `logging.toml` in the working directory
    WorkingDir(PathBuf),
    Bundled,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Env(path) => write!(f, "{} (from {})", path.display(), CONFIG_PATH_ENV),
            ConfigSource::WorkingDir(path) => write!(f, "{}", path.display()),
            ConfigSource::Bundled => write!(f, "bundled default"),
        }
    }
}

/// Decide which document to load
pub fn resolve_source(lookup: EnvLookup<'_>, working_dir: &Path) -> Result<ConfigSource> {
    if let Some(path) = lookup(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        let path = PathBuf::from(path);
        if !path.is_file() {
            return Err(LoggerError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        return Ok(ConfigSource::Env(path));
    }

    let local = working_dir.join(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Ok(ConfigSource::WorkingDir(local));
    }
    Ok(ConfigSource::Bundled)
}

/// Load, substitute, override and validate a document from `path`
pub fn load_config(path: &Path) -> Result<LoggingConfig> {
    load_config_with(path, &process_env)
}

pub fn load_config_with(path: &Path, lookup: EnvLookup<'_>) -> Result<LoggingConfig> {
    let format = ConfigFormat::from_path(path)?;
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoggerError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            LoggerError::io_operation("reading configuration", path.display().to_string(), e)
        }
    })?;
    parse_config(&text, format, lookup)
}

/// Load the document chosen by [`resolve_source`] from the process
/// environment and current directory
pub fn load_default() -> Result<(LoggingConfig, ConfigSource)> {
    let working_dir = std::env::current_dir()?;
    load_default_with(&process_env, &working_dir)
}

pub fn load_default_with(
    lookup: EnvLookup<'_>,
    working_dir: &Path,
) -> Result<(LoggingConfig, ConfigSource)> {
    let source = resolve_source(lookup, working_dir)?;
    let config = match &source {
        ConfigSource::Env(path) | ConfigSource::WorkingDir(path) => load_config_with(path, lookup)?,
        ConfigSource::Bundled => parse_config(BUNDLED_CONFIG, ConfigFormat::Toml, lookup)?,
    };
    Ok((config, source))
}

/// Parse document text: parsing, substitution, overrides, validation
pub fn parse_config(text: &str, format: ConfigFormat, lookup: EnvLookup<'_>) -> Result<LoggingConfig> {
    let mut tree: Value = match format {
        ConfigFormat::Toml => toml::from_str(text)?,
        ConfigFormat::Json => serde_json::from_str(text)?,
    };
    substitute_tree(&mut tree, lookup)?;
    let parsed: LoggingConfig = serde_json::from_value(tree)?;

    // Going through the serialized form fills in defaults, so keys such as
    // `root.level` can be overridden even when the document omits them.
    let mut tree = serde_json::to_value(&parsed)?;
    let applied = apply_env_overrides(&mut tree, lookup)?;
    let config = if applied == 0 {
        parsed
    } else {
        serde_json::from_value(tree)?
    };

    validate_config(&config).map_err(LoggerError::Validation)?;
    Ok(config)
}

/// Substitute inside every string value of a parsed document.
///
/// Keys are left alone. Substituted text is never re-parsed, so values may
/// hold quotes and backslashes.
pub fn substitute_tree(tree: &mut Value, lookup: EnvLookup<'_>) -> Result<()> {
    let mut path = Vec::new();
    substitute_value(tree, &mut path, lookup)
}

fn substitute_value(value: &mut Value, path: &mut Vec<String>, lookup: EnvLookup<'_>) -> Result<()> {
    match value {
        Value::String(text) if text.contains('$') => {
            *text = substitute_env(text, lookup).map_err(|e| match e {
                LoggerError::InvalidConfiguration { message, .. } => {
                    LoggerError::config("loader", format!("{}: {}", path.join("."), message))
                }
                other => other,
            })?;
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                path.push(i.to_string());
                substitute_value(item, path, lookup)?;
                path.pop();
            }
        }
        Value::Object(object) => {
            for (key, item) in object.iter_mut() {
                path.push(key.clone());
                substitute_value(item, path, lookup)?;
                path.pop();
            }
        }
        _ => {}
    }
    Ok(())
}

/// Replace `${VAR}` and `${VAR:-default}` in one value; `$${` escapes a
/// literal `${`.
pub fn substitute_env(text: &str, lookup: EnvLookup<'_>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(escaped) = tail.strip_prefix("$${") {
            out.push_str("${");
            rest = escaped;
            continue;
        }
        let Some(body) = tail.strip_prefix("${") else {
            out.push('$');
            rest = &tail[1..];
            continue;
        };
        let end = body
            .find('}')
            .ok_or_else(|| LoggerError::config("loader", "unterminated '${'"))?;
        let expr = &body[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name.trim(), Some(default)),
            None => (expr.trim(), None),
        };
        if name.is_empty() {
            return Err(LoggerError::config("loader", "empty variable name in '${}'"));
        }
        match (lookup(name), default) {
            (Some(value), _) => out.push_str(&value),
            (None, Some(default)) => out.push_str(default),
            (None, None) => return Err(LoggerError::MissingEnvVar(name.to_string())),
        }
        rest = &body[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Environment variable overriding the key at `path`
pub fn override_var(path: &[&str]) -> String {
    let mut var = String::from(OVERRIDE_PREFIX);
    for (i, segment) in path.iter().enumerate() {
        if i > 0 {
            var.push('_');
        }
        var.extend(segment.chars().map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        }));
    }
    var
}

/// Apply `COMMANDCENTER_LOGGING_<PATH>` overrides to a serialized document.
///
/// Only keys present in the tree are considered, plus `level` on loggers,
/// handlers and root. Values are coerced to the type of the value they
/// replace. Returns the number of keys overridden.
pub fn apply_env_overrides(tree: &mut Value, lookup: EnvLookup<'_>) -> Result<usize> {
    let Value::Object(root) = tree else {
        return Ok(0);
    };
    let mut path = Vec::new();
    override_object(root, &mut path, lookup)
}

fn override_object(
    object: &mut Map<String, Value>,
    path: &mut Vec<String>,
    lookup: EnvLookup<'_>,
) -> Result<usize> {
    let mut applied = 0;

    if accepts_level(path) && !object.contains_key("level") {
        path.push("level".to_string());
        if let Some(raw) = lookup(&override_var(&segments(path))) {
            object.insert("level".to_string(), Value::String(raw));
            applied += 1;
        }
        path.pop();
    }

    for (key, value) in object.iter_mut() {
        path.push(key.clone());
        if let Value::Object(child) = value {
            applied += override_object(child, path, lookup)?;
        } else {
            let var = override_var(&segments(path));
            if let Some(raw) = lookup(&var) {
                *value = coerce(&var, &raw, value)?;
                applied += 1;
            }
        }
        path.pop();
    }
    Ok(applied)
}

fn segments(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

fn accepts_level(path: &[String]) -> bool {
    match path {
        [root] => root == "root",
        [section, _] => section == "loggers" || section == "handlers",
        _ => false,
    }
}

fn coerce(var: &str, raw: &str, current: &Value) -> Result<Value> {
    let invalid = |expected: &str| {
        LoggerError::config(
            "environment override",
            format!("{}='{}' is not {}", var, raw, expected),
        )
    };
    let trimmed = raw.trim();
    match current {
        Value::Bool(_) => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
        Value::Number(n) if n.is_f64() => trimmed
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| invalid("a number")),
        Value::Number(_) => trimmed
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| trimmed.parse::<f64>().map(Value::from))
            .map_err(|_| invalid("a number")),
        Value::Array(_) => Ok(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        _ => Ok(Value::String(raw.to_string())),
    }
}
