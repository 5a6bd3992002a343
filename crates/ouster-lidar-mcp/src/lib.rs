//! Ouster Lidar MCP Server: sensor control for LLM agents over the Model Context Protocol.

pub mod config;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::ProtocolHandler;
pub use session::LidarSession;
pub use transport::StdioTransport;
