//! Sensor session orchestration over the connection registry.

pub mod manager;

pub use manager::{ConnectOutcome, ConnectStatus, DisconnectOutcome, LidarSession, StreamFrame, StreamOutcome};
