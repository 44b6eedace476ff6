//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! control core / http layer produce:
//!     → tracing events (logging.rs sets up the subscriber)
//!     → counters and gauges (metrics.rs)
//!
//! Consumers:
//!     → stdout (pretty in development, JSON in production)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Core code only emits; installing sinks is the binary's job
//! - Without an installed recorder, metric calls are no-ops (tests)

pub mod logging;
pub mod metrics;
