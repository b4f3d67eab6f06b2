//! Entry encoders.
//!
//! A formatter turns one [`LogEntry`] into the bytes of one record, newline
//! included. The same entry always encodes to the same bytes.

use chrono::SecondsFormat;
use logtee_core::LogEntry;
use serde_json::{Map, Value};

use logtee_config::OutputFormat;

pub trait Formatter: Send + Sync {
    fn format(&self, entry: &LogEntry, buf: &mut Vec<u8>);
}

impl<F: Formatter + ?Sized> Formatter for Box<F> {
    fn format(&self, entry: &LogEntry, buf: &mut Vec<u8>) {
        (**self).format(entry, buf)
    }
}

pub fn formatter_for(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn timestamp(entry: &LogEntry) -> String {
    entry.time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Last two components of the call-site path, plus the line.
pub fn short_caller(entry: &LogEntry) -> String {
    let file = entry.file.replace('\\', "/");
    let short = match file.rmatch_indices('/').nth(1) {
        Some((idx, _)) => &file[idx + 1..],
        None => file.as_str(),
    };
    format!("{short}:{}", entry.line)
}

/// Tab-separated human-readable lines:
///
/// ```text
/// 2024-05-01T09:30:00.123Z	INFO	[name	]src/main.rs:12	message[	{"k":"v"}]
/// ```
///
/// followed by the stack, if any, on its own lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleFormatter;

impl Formatter for ConsoleFormatter {
    fn format(&self, entry: &LogEntry, buf: &mut Vec<u8>) {
        let mut line = format!("{}\t{}\t", timestamp(entry), entry.level.capital());
        if !entry.logger_name.is_empty() {
            line.push_str(&entry.logger_name);
            line.push('\t');
        }
        line.push_str(&short_caller(entry));
        line.push('\t');
        line.push_str(&entry.message);

        if !entry.fields.is_empty() {
            let fields: Map<String, Value> = entry
                .fields
                .iter()
                .map(|f| (f.key.clone(), f.value.clone()))
                .collect();
            line.push('\t');
            line.push_str(&Value::Object(fields).to_string());
        }
        line.push('\n');

        if let Some(stack) = &entry.stack {
            line.push_str(stack.trim_end());
            line.push('\n');
        }
        buf.extend_from_slice(line.as_bytes());
    }
}

/// One JSON object per line. Entry metadata keys win over fields of the same name.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, entry: &LogEntry, buf: &mut Vec<u8>) {
        let mut obj = Map::new();
        obj.insert("ts".into(), Value::String(timestamp(entry)));
        obj.insert("level".into(), Value::String(entry.level.as_str().into()));
        if !entry.logger_name.is_empty() {
            obj.insert("logger".into(), Value::String(entry.logger_name.clone()));
        }
        obj.insert("caller".into(), Value::String(short_caller(entry)));
        obj.insert("msg".into(), Value::String(entry.message.clone()));
        if let Some(stack) = &entry.stack {
            obj.insert("stacktrace".into(), Value::String(stack.clone()));
        }
        for field in &entry.fields {
            obj.entry(field.key.clone()).or_insert_with(|| field.value.clone());
        }

        let _ = serde_json::to_writer(&mut *buf, &Value::Object(obj));
        buf.push(b'\n');
    }
}
