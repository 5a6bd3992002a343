//! MCP protocol handling: JSON-RPC dispatch.

pub mod handler;
pub mod negotiation;
pub mod progress;
pub mod validator;

pub use handler::ProtocolHandler;
pub use progress::{NotificationSink, Progress};
