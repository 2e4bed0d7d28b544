//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the filter from the environment or the given level
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the level passed in
//! - A second initialization is a no-op so embedding hosts can own the subscriber

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor a level is given.
pub const DEFAULT_FILTER: &str = "piece_manager_mod=info";

/// Build the filter directive for an optional level override.
pub fn filter_directive(level: Option<&str>) -> String {
    match level {
        Some(level) => format!("piece_manager_mod={level},piece_mod_host={level}"),
        None => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init_logging(level: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
