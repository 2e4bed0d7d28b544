//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config store, reload coordinator, plugin lifecycle
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (reload and save counters)
//! ```
//!
//! # Design Decisions
//! - The plugin never installs a metrics recorder; the host may
//! - Log filter comes from RUST_LOG, falling back to the configured level

pub mod logging;
pub mod metrics;
