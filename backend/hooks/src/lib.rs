pub mod builtin;
pub mod pipeline;
pub mod registry;

pub use builtin::{ChannelHook, FnHook, LevelCounterHook, TracingHook, hook_fn};
pub use pipeline::HookPipeline;
pub use registry::{Hook, HookError};
