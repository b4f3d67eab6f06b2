/// Ordered hook pipeline.
///
/// Hooks are registered while a logging pipeline is being built and run in
/// registration order for every accepted entry. A failing or panicking hook is
/// isolated: it is returned to the caller and the remaining hooks still run.
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use logtee_core::LogEntry;

use crate::registry::{Hook, HookError};

#[derive(Default, Clone)]
pub struct HookPipeline {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. Not meant to be called while entries are being emitted.
    pub fn register(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Run every hook against `entry`, in order. Returns the failures.
    pub fn notify(&self, entry: &LogEntry) -> Vec<HookError> {
        let mut failures = Vec::new();
        for hook in &self.hooks {
            let outcome = catch_unwind(AssertUnwindSafe(|| hook.observe(entry)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => HookError {
                    hook: hook.name().to_string(),
                    reason: format!("{e:#}"),
                    panicked: false,
                },
                Err(payload) => HookError {
                    hook: hook.name().to_string(),
                    reason: panic_message(payload.as_ref()),
                    panicked: true,
                },
            };
            failures.push(failure);
        }
        failures
    }
}

impl FromIterator<Arc<dyn Hook>> for HookPipeline {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Hook>>>(iter: I) -> Self {
        Self {
            hooks: iter.into_iter().collect(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
