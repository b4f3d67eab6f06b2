//! `logtee-config`: configuration for logtee pipelines.
//!
//! Provides:
//! - The typed [`Options`] schema (serde YAML/JSON, camelCase keys)
//! - Documented default constants and [`default_options`]
//! - `${ENV_VAR}` substitution in config files and `LOGTEE_*` overrides
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::{
    default_options, DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_BACKUPS, DEFAULT_MAX_SIZE_MB,
};
pub use env::{apply_env_overrides, apply_env_overrides_with, resolve_env_vars_with};
pub use io::{load_options, parse_options};
pub use schema::{Options, OutputFormat};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load a config file, apply `LOGTEE_*` overrides and validate it.
///
/// Validation warnings are logged; errors fail the load.
pub fn load_and_prepare(path: &Path) -> Result<Options> {
    let options = apply_env_overrides(load_options(path)?)?;

    let report = validate(&options);
    for warning in &report.warnings {
        tracing::warn!(target: "logtee", path = %warning.path, message = %warning.message, "Config warning");
    }
    if let Some(first) = report.errors.into_iter().next() {
        return Err(first.into());
    }

    Ok(options)
}
