//! MCP prompts: guided sensor workflows.

pub mod inspect;
pub mod registry;
pub mod survey;

pub use registry::PromptRegistry;
