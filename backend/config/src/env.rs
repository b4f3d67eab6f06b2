//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values of a config file, resolved
//!   at load time (uppercase `[A-Z_][A-Z0-9_]*` names only; `$${VAR}` escapes
//!   to a literal `${VAR}`).
//! - `LOGTEE_LEVEL`, `LOGTEE_FILE` and `LOGTEE_STDOUT` overriding the loaded
//!   options.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::Options;

pub const ENV_LEVEL: &str = "LOGTEE_LEVEL";
pub const ENV_FILE: &str = "LOGTEE_FILE";
pub const ENV_STDOUT: &str = "LOGTEE_STDOUT";

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Substitute `${VAR}` references in every string leaf of `value`.
///
/// Fails if a referenced variable is unset or empty.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    resolve_at(value, env, "")
}

pub(crate) fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

fn resolve_at(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    Ok(match value {
        Value::String(s) => Value::String(substitute(s, env, path)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| resolve_at(v, env, &format!("{path}[{i}]")))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), resolve_at(v, env, &child)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

fn substitute(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in ENV_VAR_PATTERN.captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&s[last..whole.start()]);
        last = whole.end();

        let name = &caps[2];
        if !caps[1].is_empty() {
            out.push_str("${");
            out.push_str(name);
            out.push('}');
            continue;
        }
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(v) => out.push_str(v),
            None => bail!("missing env var \"{name}\" referenced at config path: {path}"),
        }
    }
    out.push_str(&s[last..]);
    Ok(out)
}

/// Apply `LOGTEE_*` overrides from the process environment.
pub fn apply_env_overrides(options: Options) -> Result<Options> {
    apply_env_overrides_with(options, |key| std::env::var(key).ok())
}

/// Apply `LOGTEE_*` overrides using `lookup` (useful for testing).
pub fn apply_env_overrides_with(
    mut options: Options,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Options> {
    if let Some(level) = lookup(ENV_LEVEL) {
        options.level = level
            .parse()
            .with_context(|| format!("invalid {ENV_LEVEL}"))?;
    }
    if let Some(file) = lookup(ENV_FILE) {
        options.filename = file;
    }
    if let Some(stdout) = lookup(ENV_STDOUT) {
        options.stdout = match stdout.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => bail!("invalid {ENV_STDOUT}: {other:?}"),
        };
    }
    Ok(options)
}
