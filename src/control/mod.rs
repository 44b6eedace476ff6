//! Control-plane core.
//!
//! # Data Flow
//! ```text
//! proxy ── RegisterProxy ──▶ service.rs ──▶ registry.rs (entry, no sink)
//! proxy ── SubscribeConfig ─▶ service.rs ──▶ registry.rs (entry + weak sink)
//!                                   │
//!                                   └──▶ store.rs (initial snapshot)
//!
//! admin ── mutate routes ───▶ store.rs (version + 1, new snapshot)
//! admin ── BroadcastConfig ─▶ service.rs
//!                                   → registry snapshot (short read section)
//!                                   → try_send to every sink, outside the lock
//! ```
//!
//! # Design Decisions
//! - Snapshots are `Arc<ConfigSnapshot>`: published once, never mutated
//! - Store and registry each own their own lock; nothing holds both
//! - The registry never owns a connection, it only keeps a weak sender
//! - Per-connection queues are bounded; broadcast never waits on a peer

pub mod error;
pub mod registry;
pub mod service;
pub mod store;
pub mod types;

pub use error::{PushError, StreamError};
pub use registry::{ConfigSink, Eviction, ProxyEntry, ProxyRegistry, SessionId};
pub use service::{BroadcastReport, ControlService, DeliveryFailure, Subscription};
pub use store::ConfigStore;
pub use types::{ConfigSnapshot, ProxyIdentity, RegistrationResult, Route};
