//! Config file loading.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::env::resolve_env_vars;
use crate::schema::Options;

/// Load options from a YAML or JSON file (chosen by extension; anything other
/// than `.json` is read as YAML, which also accepts JSON).
///
/// `${VAR}` references are substituted before deserialization. A missing file
/// yields `Options::default()`.
pub fn load_options(path: &Path) -> Result<Options> {
    if !path.exists() {
        debug!(target: "logtee", path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Options::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let options = parse_options(&raw, is_json)
        .with_context(|| format!("Failed to parse config at: {}", path.display()))?;

    info!(target: "logtee", path = %path.display(), "Loaded logging config");
    Ok(options)
}

/// Parse options from text, substituting `${VAR}` references from the process environment.
pub fn parse_options(raw: &str, json: bool) -> Result<Options> {
    let value: Value = if json {
        serde_json::from_str(raw).context("invalid JSON")?
    } else {
        serde_yaml::from_str(raw).context("invalid YAML")?
    };
    // An empty YAML document parses as null.
    if value.is_null() {
        return Ok(Options::default());
    }
    let value = resolve_env_vars(&value)?;
    serde_json::from_value(value).context("config does not match the options schema")
}
