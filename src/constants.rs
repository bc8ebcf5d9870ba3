//! Centralized constants for vidlock
//!
//! This module contains all fixed delays, ranges and defaults used throughout
//! the lock session. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// COUNTDOWN TIMER
// ============================================================================

/// Interval between countdown ticks.
/// Unit: milliseconds
/// Range: Fixed, the countdown decrements by exactly one second per tick
pub const TIMER_TICK_MS: u64 = 1000;

/// Maximum countdown accepted from the VIDLOCK_TIMER environment variable.
/// Unit: seconds
/// Range: Fixed maximum (24 hours)
pub const TIMER_MAX_SECONDS: u64 = 86_400;

// ============================================================================
// CONTINUOUS PLAYBACK
// ============================================================================

/// Poll interval for the fullscreen continuous-playback loop.
/// Unit: milliseconds
/// Recommended range: 250-1000 (lower = shorter black gap between videos)
pub const PLAYBACK_POLL_MS: u64 = 1000;

/// Playback rate bounds offered by the speed control.
/// Unit: multiplier of normal speed
pub const PLAYBACK_RATE_MIN: f32 = 0.5;
pub const PLAYBACK_RATE_MAX: f32 = 2.0;

/// Maximum volume accepted by the volume control.
/// Unit: percent
pub const VOLUME_MAX_PERCENT: u8 = 100;

/// File extensions recognised as videos (matched case-insensitively).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv"];

// ============================================================================
// CONTROLS VISIBILITY
// ============================================================================

/// Delay before the controls auto-hide after session start.
/// Unit: milliseconds
/// Recommended range: 100-1000
pub const CONTROLS_INITIAL_HIDE_MS: u64 = 100;

/// Delay before the controls hide once the pointer leaves the navigation bar.
/// Unit: milliseconds
pub const CONTROLS_LEAVE_HIDE_MS: u64 = 2000;

/// How long the reveal key keeps the controls forced visible.
/// Unit: milliseconds
pub const CONTROLS_REVEAL_MS: u64 = 5000;

// ============================================================================
// POP-UP OVERLAYS
// ============================================================================

/// Lifetime of a text pop-up.
/// Unit: milliseconds
pub const TEXT_POPUP_DISPLAY_MS: u64 = 200;

/// Bounds of the random delay between text pop-ups (inclusive).
/// Unit: milliseconds
pub const TEXT_POPUP_REARM_MIN_MS: u64 = 100;
pub const TEXT_POPUP_REARM_MAX_MS: u64 = 500;

/// Bounds of the random text pop-up font size (inclusive).
/// Unit: points
pub const TEXT_POPUP_FONT_MIN: u32 = 30;
pub const TEXT_POPUP_FONT_MAX: u32 = 60;

/// Bounds of each random colour channel for text pop-ups (inclusive).
/// Range: kept away from 0 and 255 so the colours stay muted
pub const TEXT_POPUP_CHANNEL_MIN: u8 = 50;
pub const TEXT_POPUP_CHANNEL_MAX: u8 = 200;

/// Divisor turning the configured pop-up video size (1-10) into a screen fraction.
pub const POPUP_VIDEO_SIZE_DIVISOR: f64 = 20.0;

/// Accepted range of the configured pop-up video size.
pub const POPUP_VIDEO_SIZE_MIN: u32 = 1;
pub const POPUP_VIDEO_SIZE_MAX: u32 = 10;

// ============================================================================
// SETTINGS DEFAULTS
// ============================================================================

/// Password used when none is configured.
pub const DEFAULT_PASSWORD: &str = "password";

/// Default background colour for chrome and pop-ups.
pub const DEFAULT_BG_COLOR: &str = "#000000";

/// Default seconds between video pop-ups.
pub const DEFAULT_POPUP_INTERVAL_SECS: f64 = 0.5;

/// Default seconds a video pop-up stays on screen.
pub const DEFAULT_POPUP_DURATION_SECS: f64 = 5.0;

/// Default configured pop-up video size (fraction = value / 20).
pub const DEFAULT_POPUP_VIDEO_SIZE: u32 = 5;

/// Name of the settings file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.txt";

/// Name of the log file inside the data directory.
pub const LOG_FILE_NAME: &str = "Log.txt";

/// Folder names for the bundled and user-supplied video libraries.
pub const DEFAULT_VIDEO_DIR_NAME: &str = "videos";
pub const CUSTOM_VIDEO_DIR_NAME: &str = "custom_videos";

/// Application directory name under the platform config/data directories.
pub const APP_DIR_NAME: &str = "vidlock";

// ============================================================================
// HEADLESS HOST
// ============================================================================

/// Screen size assumed by the terminal host.
/// Unit: pixels
pub const HEADLESS_SCREEN_WIDTH: u32 = 1920;
pub const HEADLESS_SCREEN_HEIGHT: u32 = 1080;

/// Clip length reported by the headless media engine.
/// Unit: seconds
pub const HEADLESS_CLIP_SECONDS: u64 = 30;

/// Desktop notification display duration for error dialogs.
/// Unit: milliseconds
pub const NOTIFICATION_ERROR_TIMEOUT_MS: u32 = 5000;

// ============================================================================
// ENVIRONMENT OVERRIDES
// ============================================================================

pub const ENV_TIMER: &str = "VIDLOCK_TIMER";
pub const ENV_MODE: &str = "VIDLOCK_MODE";
