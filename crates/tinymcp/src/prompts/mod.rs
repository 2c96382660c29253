//! Prompt registry and handler output conversion.

pub mod output;
pub mod registry;

pub use output::PromptOutput;
pub use registry::{arguments_from_schema, PromptHandler, PromptInfo, PromptRegistry};
