//! Bridge from `tracing` into logtee.
//!
//! Third-party crates that log through `tracing` reach the same sinks and
//! hooks as direct calls. Events under the `logtee` target are this crate's own
//! diagnostics and are never forwarded.

use std::fmt::Write as _;

use logtee_core::{Field, Level, Origin};
use tracing::field::{Field as TracingField, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::logger::Logger;
use crate::pipeline::current;

const INTERNAL_TARGET: &str = "logtee";

fn is_internal(target: &str) -> bool {
    target == INTERNAL_TARGET
        || target
            .strip_prefix(INTERNAL_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

/// A tracing layer that forwards events to a logtee logger.
pub struct TracingBridge {
    logger: Option<Logger>,
}

impl TracingBridge {
    /// Forward to whichever pipeline is active when the event fires.
    pub fn global() -> Self {
        Self { logger: None }
    }

    /// Forward to a fixed logger.
    pub fn new(logger: Logger) -> Self {
        Self {
            logger: Some(logger),
        }
    }
}

impl<S> Layer<S> for TracingBridge
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_internal(meta.target()) {
            return;
        }

        let level = match *meta.level() {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            tracing::Level::DEBUG | tracing::Level::TRACE => Level::Debug,
        };

        let logger = match &self.logger {
            Some(logger) => logger.clone(),
            None => current().logger(),
        };
        if !logger.enabled(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut spans = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                spans.push(span.name());
            }
        }
        let message = if spans.is_empty() {
            visitor.message
        } else {
            format!("{}: {}", spans.join("::"), visitor.message)
        };

        let origin = Origin::new(
            meta.file().unwrap_or(meta.target()),
            meta.line().unwrap_or(0),
        );
        let result = logger
            .named(meta.target())
            .log_at(origin, level, message, visitor.fields);
        if let Err(e) = result {
            logger.core().diagnostics().report(&e);
        }
    }
}

/// Collects the `message` field and everything else as entry fields.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<Field>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(Field::new(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.fields.push(Field::new(field.name(), value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.fields.push(Field::new(field.name(), value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.fields.push(Field::new(field.name(), value));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.fields.push(Field::new(field.name(), value));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message.clear();
            let _ = write!(self.message, "{value:?}");
        } else {
            self.fields.push(Field::new(field.name(), format!("{value:?}")));
        }
    }
}

/// Install a global `tracing` subscriber that forwards into the active
/// pipeline. `RUST_LOG` wins over `level` when set.
pub fn init_tracing_bridge(level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(TracingBridge::global())
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::pipeline::Pipeline;
    use logtee_config::Options;
    use logtee_core::LogEntry;
    use logtee_hooks::ChannelHook;
    use std::sync::Arc;
    use std::sync::mpsc::Receiver;

    fn bridged(min: Level) -> (impl Subscriber + Send + Sync, Receiver<LogEntry>) {
        let (hook, rx) = ChannelHook::new(16);
        let pipeline = Pipeline::builder(Options {
            stdout: false,
            level: min,
            ..Options::default()
        })
        .diagnostics(Diagnostics::to_writer(std::io::sink()))
        .hook(Arc::new(hook))
        .build()
        .unwrap();
        let subscriber = tracing_subscriber::registry().with(TracingBridge::new(pipeline.logger()));
        (subscriber, rx)
    }

    #[test]
    fn internal_targets_are_recognised() {
        assert!(is_internal("logtee"));
        assert!(is_internal("logtee::mirror"));
        assert!(!is_internal("logtee_app"));
        assert!(!is_internal("my_app::db"));
    }

    #[test]
    fn forwards_message_fields_and_location() {
        let (subscriber, rx) = bridged(Level::Debug);
        let line = tracing::subscriber::with_default(subscriber, || {
            let line = line!() + 1;
            tracing::warn!(target: "my_app::db", attempts = 3, table = "users", "retrying query");
            line
        });

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, Level::Warn);
        assert_eq!(entry.message, "retrying query");
        assert_eq!(entry.logger_name, "my_app::db");
        assert_eq!(entry.line, line);
        assert_eq!(entry.field("attempts"), Some(&serde_json::json!(3)));
        assert_eq!(entry.field("table"), Some(&serde_json::json!("users")));
    }

    #[test]
    fn drops_internal_and_filtered_events() {
        let (subscriber, rx) = bridged(Level::Info);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "logtee", "diagnostic");
            tracing::debug!(target: "my_app", "too quiet");
            tracing::trace!(target: "my_app", "quieter still");
        });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn span_names_prefix_the_message() {
        let (subscriber, rx) = bridged(Level::Debug);
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("request");
            let _guard = span.enter();
            tracing::info!(target: "my_app", "handled");
        });
        assert_eq!(rx.try_recv().unwrap().message, "request: handled");
    }
}
