//! Deployment settings baked in by `build.rs`

use log::warn;

use envmon_core::config::MonitorConfig;

/// Monitor configuration with the `.env` overrides applied.
///
/// Values are range-checked later by [`MonitorConfig::validate`] during
/// bring-up.
pub fn monitor_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();

    match env!("ENVMON_PRESSURE_OFFSET_HPA").parse() {
        Ok(offset) => config = config.with_pressure_offset_hpa(offset),
        Err(_) => warn!("ENVMON_PRESSURE_OFFSET_HPA out of range, using default"),
    }
    match env!("ENVMON_WAKE_INTERVAL_SECS").parse() {
        Ok(secs) => config = config.with_wake_interval_secs(secs),
        Err(_) => warn!("ENVMON_WAKE_INTERVAL_SECS out of range, using default"),
    }

    config
}
