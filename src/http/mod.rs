//! HTTP and WebSocket transport for the control plane.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, timeout + trace layers)
//!     → handlers.rs (register, read config, health)
//!     → websocket.rs (subscribe: upgrade, push loop, cleanup)
//!     → admin (route mutations, broadcast, introspection)
//! ```
//!
//! # Design Decisions
//! - One listener serves proxies and operators
//! - Every pushed snapshot is a single JSON text frame
//! - This is the only layer that knows about the transport

pub mod handlers;
pub mod server;
pub mod websocket;

pub use server::{AppState, ControlServer};
