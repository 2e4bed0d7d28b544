//! Host lifecycle plumbing for the standalone harness.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → notification loop exits → PluginContext::on_destroy
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the stop request out to every loop
//! - Triggering more than once is harmless

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
