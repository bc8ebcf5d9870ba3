//! Environment overrides for vidlock
//!
//! Environment variables can override selected values from the settings file
//! (see the settings module). Command-line flags take precedence over both.
//!
//! Environment variables (all optional):
//! - VIDLOCK_TIMER: Countdown length in seconds (0 disables the countdown)
//! - VIDLOCK_MODE: Session mode, `fullscreen` or `popup`

use crate::constants::{ENV_MODE, ENV_TIMER, TIMER_MAX_SECONDS};
use crate::settings::Mode;
use log::{debug, info, warn};
use std::env;

/// Parse the VIDLOCK_TIMER environment variable
///
/// Returns Some(seconds) for a valid value (0-86400, 0 disables the countdown)
/// Returns None if not set or invalid
pub fn parse_timer_override() -> Option<u64> {
    match env::var(ENV_TIMER) {
        Ok(val) => parse_timer_value(&val),
        Err(_) => {
            debug!("{} not set.", ENV_TIMER);
            None
        }
    }
}

fn parse_timer_value(val: &str) -> Option<u64> {
    match val.trim().parse::<u64>() {
        Ok(0) => {
            info!("Countdown disabled via {} (value: 0)", ENV_TIMER);
            Some(0)
        }
        Ok(seconds) if seconds <= TIMER_MAX_SECONDS => {
            info!("Countdown set via environment variable: {} seconds", seconds);
            Some(seconds)
        }
        Ok(seconds) => {
            warn!(
                "Invalid countdown: {} (must be 0-{} seconds). Using settings file.",
                seconds, TIMER_MAX_SECONDS
            );
            None
        }
        Err(e) => {
            warn!("Failed to parse {}: {}. Using settings file.", ENV_TIMER, e);
            None
        }
    }
}

/// Parse the VIDLOCK_MODE environment variable
///
/// Returns None if not set or not a known mode
pub fn parse_mode_override() -> Option<Mode> {
    match env::var(ENV_MODE) {
        Ok(val) => parse_mode_value(&val),
        Err(_) => {
            debug!("{} not set.", ENV_MODE);
            None
        }
    }
}

fn parse_mode_value(val: &str) -> Option<Mode> {
    match val.parse::<Mode>() {
        Ok(mode) => {
            info!("Mode set via environment variable: {}", mode);
            Some(mode)
        }
        Err(e) => {
            warn!("Invalid {}: {}. Using settings file.", ENV_MODE, e);
            None
        }
    }
}
