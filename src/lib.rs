//! Mesh control plane library.
//!
//! Holds the versioned route table, tracks connected proxies, and pushes
//! every new snapshot to each proxy's open subscribe stream.

pub mod admin;
pub mod client;
pub mod config;
pub mod control;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ControlConfig;
pub use control::{ConfigSnapshot, ControlService, ProxyIdentity, Route};
pub use http::ControlServer;
pub use lifecycle::Shutdown;
