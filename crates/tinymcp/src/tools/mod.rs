//! Tool registry and handler output conversion.

pub mod output;
pub mod registry;

pub use output::ToolOutput;
pub use registry::{parse_arguments, Arguments, ToolHandler, ToolInfo, ToolRegistry};
