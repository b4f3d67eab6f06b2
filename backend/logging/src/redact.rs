//! Redaction layer.
//!
//! Scrubs API keys, bearer tokens, and phone numbers from messages and string
//! fields before another formatter encodes them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use logtee_core::LogEntry;

use crate::encoder::Formatter;

static TELEPHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});
static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = TELEPHONE_RE.replace_all(input, "[REDACTED_PHONE]");
    API_KEY_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Wraps a formatter and hands it a scrubbed copy of each entry. Hooks still
/// see the original.
#[derive(Debug, Default, Clone)]
pub struct RedactingFormatter<F> {
    inner: F,
}

impl<F: Formatter> RedactingFormatter<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: Formatter> Formatter for RedactingFormatter<F> {
    fn format(&self, entry: &LogEntry, buf: &mut Vec<u8>) {
        let mut scrubbed = entry.clone();
        scrubbed.message = redact_sensitive_data(&entry.message);
        for field in &mut scrubbed.fields {
            field.value = redact_value(&field.value);
        }
        self.inner.format(&scrubbed, buf);
    }
}
