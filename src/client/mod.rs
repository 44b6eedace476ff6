//! Client side of the control plane.
//!
//! # Data Flow
//! ```text
//! proxy / operator
//!     → api.rs (unary HTTP calls, admin operations)
//!     → stream.rs (one WebSocket subscription, decoded snapshots)
//!     → subscriber.rs (register + subscribe + reconnect, latest snapshot cache)
//! ```
//!
//! # Design Decisions
//! - The data plane reads the latest snapshot lock-free via `ArcSwapOption`
//! - Reconnects back off exponentially with jitter, reset on success

pub mod api;
pub mod backoff;
pub mod error;
pub mod stream;
pub mod subscriber;

pub use api::ControlClient;
pub use backoff::Backoff;
pub use error::{ClientError, ClientResult};
pub use stream::ConfigStream;
pub use subscriber::{ConfigHandle, ConfigSubscriber};
