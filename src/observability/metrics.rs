//! Metrics collection.
//!
//! # Metrics
//! - `config_reload_total` (counter): handler calls by `outcome`
//!   (`reloaded`, `failed`, `file_missing`)
//! - `config_save_total` (counter): file writes by `reason`
//!   (`set`, `reload`, `shutdown`)

pub const CONFIG_RELOAD_TOTAL: &str = "config_reload_total";
pub const CONFIG_SAVE_TOTAL: &str = "config_save_total";

pub fn record_reload(outcome: &'static str) {
    metrics::counter!(CONFIG_RELOAD_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_save(reason: &'static str) {
    metrics::counter!(CONFIG_SAVE_TOTAL, "reason" => reason).increment(1);
}
