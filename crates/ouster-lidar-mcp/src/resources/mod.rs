//! MCP resources: read-only views of connected sensors.

pub mod registry;
pub mod sensors;

pub use registry::ResourceRegistry;
