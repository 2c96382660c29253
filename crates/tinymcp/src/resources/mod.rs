//! Resource registry, URI templates, and handler output conversion.

pub mod output;
pub mod registry;
pub mod template;

pub use output::ResourceOutput;
pub use registry::{ResourceHandler, ResourceInfo, ResourceRegistry, DEFAULT_MIME_TYPE};
pub use template::{TemplateError, UriTemplate};
