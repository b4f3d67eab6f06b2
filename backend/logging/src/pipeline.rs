//! Pipeline assembly and the process-wide active pipeline.
//!
//! A [`Pipeline`] is built once from [`Options`] and never changes. The
//! process-wide handle is swapped wholesale by [`init_pipeline`]; swapping is
//! atomic but callers must not race a rebuild against in-flight emission.

use std::fmt::{self, Display};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use tracing::{info, warn};

use logtee_config::{Options, load_and_prepare, validate};
use logtee_core::{Field, Level, LogError};
use logtee_hooks::{Hook, HookPipeline};

use crate::filter::{Core, ExitFn, process_exit};
use crate::diagnostics::Diagnostics;
use crate::encoder::{Formatter, formatter_for};
use crate::logger::Logger;
use crate::redact::RedactingFormatter;
use crate::rotation::{RotatingFile, RotationPolicy};
use crate::sink::{Sink, SinkKind, SinkSet, SinkWriter, StdoutSink};

static ACTIVE: ArcSwapOption<Pipeline> = ArcSwapOption::const_empty();

/// Stdout-only Debug pipeline used until [`init_pipeline`] runs. Never
/// installed, so [`get_writer`] still fails before init.
static FALLBACK: Lazy<Arc<Pipeline>> =
    Lazy::new(|| Arc::new(PipelineBuilder::new(Options::default()).assemble()));

/// Filter, encoder, sinks and hooks built from one set of [`Options`].
pub struct Pipeline {
    options: Options,
    core: Arc<Core>,
    root: Logger,
    file: Option<Arc<RotatingFile>>,
}

impl Pipeline {
    pub fn builder(options: Options) -> PipelineBuilder {
        PipelineBuilder::new(options)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// The root logger, named after `Options::name`.
    pub fn logger(&self) -> Logger {
        self.root.clone()
    }

    pub fn sink_kind(&self) -> SinkKind {
        self.core.sinks().kind()
    }

    pub fn writer(&self) -> SinkWriter {
        SinkWriter::new(self.core.sinks().clone())
    }

    /// The rotating file sink, when `Options::filename` is set.
    pub fn file(&self) -> Option<&Arc<RotatingFile>> {
        self.file.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.core.diagnostics()
    }

    #[track_caller]
    pub fn log(&self, level: Level, msg: impl Display) -> Result<(), LogError> {
        self.root.try_log(level, msg, [])
    }

    #[track_caller]
    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) -> Result<(), LogError> {
        self.root.try_logf(level, args)
    }

    #[track_caller]
    pub fn logw(
        &self,
        level: Level,
        msg: impl Display,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<(), LogError> {
        self.root.try_log(level, msg, fields)
    }

    /// Flush every sink.
    pub fn sync(&self) -> Result<(), LogError> {
        self.core.sync()
    }

    /// Flush, release the log file and wait for pending compression.
    pub fn close(&self) -> Result<(), LogError> {
        let synced = self.sync();
        if let Some(file) = &self.file {
            file.close()
                .map_err(|e| LogError::rotation(file.path(), "closing", e))?;
        }
        synced
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

pub struct PipelineBuilder {
    options: Options,
    hooks: HookPipeline,
    stdout: Option<Arc<dyn Sink>>,
    diagnostics: Option<Diagnostics>,
    formatter: Option<Box<dyn Formatter>>,
    exit: Option<ExitFn>,
}

impl PipelineBuilder {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            hooks: HookPipeline::new(),
            stdout: None,
            diagnostics: None,
            formatter: None,
            exit: None,
        }
    }

    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn hooks(mut self, hooks: impl IntoIterator<Item = Arc<dyn Hook>>) -> Self {
        for hook in hooks {
            self.hooks.register(hook);
        }
        self
    }

    /// Endpoint used in place of process stdout when `Options::stdout` is set.
    pub fn stdout_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.stdout = Some(sink);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Replaces the formatter chosen by `Options::format`.
    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    pub fn exit_with(mut self, exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit = Some(Arc::new(exit));
        self
    }

    /// Validate the options and assemble the pipeline.
    pub fn build(self) -> Result<Pipeline, LogError> {
        let report = validate(&self.options);
        for warning in &report.warnings {
            warn!(target: "logtee", path = %warning.path, "{}", warning.message);
        }
        if let Some(first) = report.errors.into_iter().next() {
            return Err(first.into());
        }
        Ok(self.assemble())
    }

    /// Build and make the result the process-wide pipeline.
    pub fn install(self) -> Result<Arc<Pipeline>, LogError> {
        Ok(install(self.build()?))
    }

    fn assemble(self) -> Pipeline {
        let options = self.options;
        let diagnostics = self.diagnostics.unwrap_or_default();

        let stdout = options.stdout.then(|| {
            self.stdout
                .unwrap_or_else(|| Arc::new(StdoutSink) as Arc<dyn Sink>)
        });
        let file = options.file_path().map(|path| {
            Arc::new(RotatingFile::new(
                path,
                RotationPolicy::from_options(&options),
                diagnostics.clone(),
            ))
        });
        let sinks = Arc::new(SinkSet::select(
            stdout,
            file.clone().map(|f| f as Arc<dyn Sink>),
            diagnostics.clone(),
        ));

        let mut formatter = self
            .formatter
            .unwrap_or_else(|| formatter_for(options.format));
        if options.redact {
            formatter = Box::new(RedactingFormatter::new(formatter));
        }

        let core = Core::new(options.level, formatter, sinks, self.hooks, diagnostics)
            .with_development(options.development)
            .with_stacktrace_level(options.stacktrace_level)
            .with_exit(self.exit.unwrap_or_else(process_exit));
        let core = Arc::new(core);
        let root = Logger::new(core.clone()).named(&options.name);

        Pipeline {
            options,
            core,
            root,
            file,
        }
    }
}

fn install(pipeline: Pipeline) -> Arc<Pipeline> {
    let pipeline = Arc::new(pipeline);
    info!(
        target: "logtee",
        sinks = ?pipeline.sink_kind(),
        level = %pipeline.options.level,
        hooks = pipeline.core.hooks().len(),
        "Installed logging pipeline"
    );
    if let Some(previous) = ACTIVE.swap(Some(pipeline.clone())) {
        if let Err(e) = previous.sync() {
            previous.diagnostics().report(&e);
        }
    }
    pipeline
}

/// Build a pipeline from `options` and `hooks` and make it the process-wide
/// one. The previous pipeline, if any, is synced first.
pub fn init_pipeline(
    options: Options,
    hooks: impl IntoIterator<Item = Arc<dyn Hook>>,
) -> Result<Arc<Pipeline>, LogError> {
    PipelineBuilder::new(options).hooks(hooks).install()
}

/// Load options from a YAML or JSON file (with `LOGTEE_*` overrides) and
/// install a pipeline built from them.
pub fn init_from_file(
    path: &Path,
    hooks: impl IntoIterator<Item = Arc<dyn Hook>>,
) -> anyhow::Result<Arc<Pipeline>> {
    let options = load_and_prepare(path)
        .with_context(|| format!("Failed to load logging config from {}", path.display()))?;
    let pipeline = init_pipeline(options, hooks).context("Failed to build logging pipeline")?;
    Ok(pipeline)
}

/// The installed pipeline, or the stdout fallback before init.
pub fn current() -> Arc<Pipeline> {
    ACTIVE.load_full().unwrap_or_else(|| FALLBACK.clone())
}

pub fn is_initialized() -> bool {
    ACTIVE.load().is_some()
}

/// Root logger of [`current`].
pub fn logger() -> Logger {
    current().logger()
}

/// Write handle onto the installed pipeline's sinks.
pub fn get_writer() -> Result<SinkWriter, LogError> {
    ACTIVE
        .load_full()
        .map(|p| p.writer())
        .ok_or(LogError::NotInitialized)
}

pub fn sync() -> Result<(), LogError> {
    current().sync()
}

/// Uninstall the active pipeline and close it.
pub fn shutdown() -> Result<(), LogError> {
    match ACTIVE.swap(None) {
        Some(pipeline) => pipeline.close(),
        None => Ok(()),
    }
}

#[track_caller]
pub fn log(level: Level, msg: impl Display) {
    current().root.log(level, msg)
}

#[track_caller]
pub fn logf(level: Level, args: fmt::Arguments<'_>) {
    current().root.logf(level, args)
}

#[track_caller]
pub fn logw(level: Level, msg: impl Display, fields: impl IntoIterator<Item = Field>) {
    current().root.logw(level, msg, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use logtee_hooks::LevelCounterHook;

    fn memory_options() -> Options {
        Options {
            level: Level::Info,
            ..Options::default()
        }
    }

    #[test]
    fn builds_stdout_only_by_default() {
        let out = MemorySink::new();
        let pipeline = Pipeline::builder(memory_options())
            .stdout_sink(Arc::new(out.clone()))
            .build()
            .unwrap();
        assert_eq!(pipeline.sink_kind(), SinkKind::Stdout);
        assert!(pipeline.file().is_none());

        pipeline.log(Level::Info, "hello").unwrap();
        pipeline.log(Level::Debug, "filtered").unwrap();
        let lines = out.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\tINFO\t"));
        assert!(lines[0].ends_with("\thello"));
    }

    #[test]
    fn tee_when_stdout_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let out = MemorySink::new();
        let options = Options {
            filename: path.to_string_lossy().into_owned(),
            ..memory_options()
        };
        let pipeline = Pipeline::builder(options)
            .stdout_sink(Arc::new(out.clone()))
            .build()
            .unwrap();
        assert_eq!(pipeline.sink_kind(), SinkKind::Tee);

        pipeline.logf(Level::Warn, format_args!("{} of {}", 3, 4)).unwrap();
        pipeline.sync().unwrap();
        assert_eq!(out.contents(), std::fs::read_to_string(&path).unwrap());
        assert!(out.contents().contains("3 of 4"));
    }

    #[test]
    fn file_only_and_none() {
        let dir = tempfile::tempdir().unwrap();
        let file_only = Options {
            stdout: false,
            filename: dir.path().join("a.log").to_string_lossy().into_owned(),
            ..Options::default()
        };
        assert_eq!(Pipeline::builder(file_only).build().unwrap().sink_kind(), SinkKind::File);

        let none = Options {
            stdout: false,
            ..Options::default()
        };
        let pipeline = Pipeline::builder(none).build().unwrap();
        assert_eq!(pipeline.sink_kind(), SinkKind::None);
        assert!(pipeline.log(Level::Error, "discarded").is_ok());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            filename: dir.path().to_string_lossy().into_owned(),
            ..Options::default()
        };
        let err = Pipeline::builder(options).build().unwrap_err();
        assert!(matches!(err, LogError::Config(_)));
    }

    #[test]
    fn root_logger_takes_configured_name() {
        let out = MemorySink::new();
        let options = Options {
            name: "api".into(),
            ..memory_options()
        };
        let pipeline = Pipeline::builder(options)
            .stdout_sink(Arc::new(out.clone()))
            .build()
            .unwrap();
        pipeline.logger().named("auth").info("login");
        assert!(out.contents().contains("\tapi.auth\t"));
    }

    #[test]
    fn redaction_follows_options() {
        let out = MemorySink::new();
        let options = Options {
            redact: true,
            ..memory_options()
        };
        let pipeline = Pipeline::builder(options)
            .stdout_sink(Arc::new(out.clone()))
            .build()
            .unwrap();
        pipeline.log(Level::Info, "token Bearer abc123").unwrap();
        assert!(out.contents().contains("[REDACTED_TOKEN]"));
        assert!(!out.contents().contains("abc123"));
    }

    #[test]
    fn builder_registers_hooks_in_order() {
        let counter = Arc::new(LevelCounterHook::new());
        let pipeline = Pipeline::builder(memory_options())
            .stdout_sink(Arc::new(MemorySink::new()))
            .hook(counter.clone())
            .hooks([logtee_hooks::hook_fn("noop", |_| Ok(()))])
            .build()
            .unwrap();
        assert_eq!(pipeline.core().hooks().names(), ["level_counter_hook", "noop"]);

        pipeline.log(Level::Warn, "x").unwrap();
        assert_eq!(counter.count(Level::Warn), 1);
    }
}
