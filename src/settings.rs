//! Settings file management
//!
//! The settings record is a flat `key=value` text file shared with the
//! configurator. The lock session reads it once at startup and never writes
//! it back; only `--setup` saves a new file.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_BG_COLOR, DEFAULT_PASSWORD,
    DEFAULT_POPUP_DURATION_SECS, DEFAULT_POPUP_INTERVAL_SECS, DEFAULT_POPUP_VIDEO_SIZE,
    POPUP_VIDEO_SIZE_DIVISOR, POPUP_VIDEO_SIZE_MAX, POPUP_VIDEO_SIZE_MIN,
};
use crate::host::Rgb;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn, LevelFilter};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Corner of the screen holding the countdown label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl TimerPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPosition::TopLeft => "top_left",
            TimerPosition::TopRight => "top_right",
            TimerPosition::BottomLeft => "bottom_left",
            TimerPosition::BottomRight => "bottom_right",
        }
    }
}

impl FromStr for TimerPosition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "top_left" => Ok(TimerPosition::TopLeft),
            "top_right" => Ok(TimerPosition::TopRight),
            "bottom_left" => Ok(TimerPosition::BottomLeft),
            "bottom_right" => Ok(TimerPosition::BottomRight),
            other => Err(anyhow!("Unknown timer position: '{}'", other)),
        }
    }
}

/// Presentation mode of a lock session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// One video surface covering the whole screen
    #[default]
    Fullscreen,
    /// Floating text and video pop-ups over a backdrop
    Popup,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fullscreen => "fullscreen",
            Mode::Popup => "popup",
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fullscreen" => Ok(Mode::Fullscreen),
            // Older configurator builds wrote "windowed" for pop-up mode
            "popup" | "windowed" => Ok(Mode::Popup),
            other => Err(anyhow!("Unknown mode: '{}'", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of the session parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Clear-text unlock password (not a security control)
    pub password: String,
    /// Play the bundled video folder instead of the custom one
    pub use_default_videos: bool,
    /// Countdown length in seconds (0 = no countdown)
    pub timer_seconds: u64,
    pub timer_position: TimerPosition,
    pub mode: Mode,
    /// Hex colour, `#RGB` or `#RRGGBB`
    pub background_color: String,
    pub screensaver_image: Option<PathBuf>,
    pub popup_text_file: Option<PathBuf>,
    /// Seconds between video pop-ups
    pub popup_interval_secs: f64,
    /// Seconds each video pop-up stays on screen
    pub popup_duration_secs: f64,
    /// Configured pop-up size, 1-10 (see `popup_video_fraction`)
    pub popup_video_size: u32,
    pub show_skip_button: bool,
    pub show_password_entry: bool,
    pub show_popup_background: bool,
    pub log_level: LevelFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            password: DEFAULT_PASSWORD.to_string(),
            use_default_videos: true,
            timer_seconds: 0,
            timer_position: TimerPosition::default(),
            mode: Mode::default(),
            background_color: DEFAULT_BG_COLOR.to_string(),
            screensaver_image: None,
            popup_text_file: None,
            popup_interval_secs: DEFAULT_POPUP_INTERVAL_SECS,
            popup_duration_secs: DEFAULT_POPUP_DURATION_SECS,
            popup_video_size: DEFAULT_POPUP_VIDEO_SIZE,
            show_skip_button: true,
            show_password_entry: true,
            show_popup_background: true,
            log_level: LevelFilter::Info,
        }
    }
}

impl Settings {
    /// Get the standard settings file path
    ///
    /// - macOS: `~/Library/Application Support/vidlock/config.txt`
    /// - Linux: `~/.config/vidlock/config.txt`
    /// - Windows: `%APPDATA%\vidlock\config.txt`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load settings from the standard location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load settings from a specific path
    ///
    /// A missing file is not an error: it yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be read.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "No settings file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings = Self::parse(&contents);
        info!("Settings loaded from: {}", path.display());
        Ok(settings)
    }

    /// Parse `key=value` lines, falling back to defaults for anything malformed
    ///
    /// Lines without `=` are skipped and only the first `=` splits, so values
    /// may themselves contain `=`.
    pub fn parse(contents: &str) -> Self {
        let mut settings = Self::default();

        for line in contents.lines() {
            let line = line.trim();
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            settings.apply(key.trim(), value);
        }

        settings
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "password" => self.password = value.to_string(),
            "use_default_videos" => self.use_default_videos = parse_flag(value),
            "timer" => self.timer_seconds = parse_timer(value),
            "timer_position" => {
                self.timer_position = parse_or_default(key, value, TimerPosition::default())
            }
            "mode" => self.mode = parse_or_default(key, value, Mode::default()),
            "bg_color" => {
                if Rgb::from_hex(value).is_some() {
                    self.background_color = value.to_string();
                } else {
                    warn!(
                        "Invalid bg_color '{}', using {}",
                        value, DEFAULT_BG_COLOR
                    );
                }
            }
            "screensaver_image_path" => self.screensaver_image = optional_path(value),
            "popup_text_file" => self.popup_text_file = optional_path(value),
            "popup_interval" => {
                self.popup_interval_secs =
                    parse_positive(key, value, DEFAULT_POPUP_INTERVAL_SECS)
            }
            "popup_duration" => {
                self.popup_duration_secs =
                    parse_positive(key, value, DEFAULT_POPUP_DURATION_SECS)
            }
            "popup_video_size" => self.popup_video_size = parse_video_size(value),
            "show_skip_button" => self.show_skip_button = parse_flag(value),
            "show_password" => self.show_password_entry = parse_flag(value),
            "show_popup_bg" => self.show_popup_background = parse_flag(value),
            "log_level" => self.log_level = parse_log_level(value),
            other => debug!("Ignoring unknown settings key: {}", other),
        }
    }

    /// Fraction of the screen a video pop-up covers on each axis, in (0, 1]
    pub fn popup_video_fraction(&self) -> f64 {
        let size = self
            .popup_video_size
            .clamp(POPUP_VIDEO_SIZE_MIN, POPUP_VIDEO_SIZE_MAX);
        f64::from(size) / POPUP_VIDEO_SIZE_DIVISOR
    }

    /// Check the rules the configurator enforces before saving
    pub fn validate(&self) -> Result<()> {
        if Rgb::from_hex(&self.background_color).is_none() {
            anyhow::bail!(
                "Invalid background color '{}'. Use #RRGGBB or #RGB.",
                self.background_color
            );
        }
        if !(self.popup_interval_secs.is_finite() && self.popup_interval_secs > 0.0) {
            anyhow::bail!("Pop-up interval must be a positive number of seconds");
        }
        if !(self.popup_duration_secs.is_finite() && self.popup_duration_secs > 0.0) {
            anyhow::bail!("Pop-up duration must be a positive number of seconds");
        }
        if !(POPUP_VIDEO_SIZE_MIN..=POPUP_VIDEO_SIZE_MAX).contains(&self.popup_video_size) {
            anyhow::bail!(
                "Pop-up video size must be between {} and {}",
                POPUP_VIDEO_SIZE_MIN,
                POPUP_VIDEO_SIZE_MAX
            );
        }
        if self.show_password_entry && self.timer_seconds == 0 {
            anyhow::bail!("You must set a timer to enable showing the password");
        }
        Ok(())
    }

    /// Render the settings in the `key=value` file format
    pub fn to_file_string(&self) -> String {
        let path_value = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        let timer = if self.timer_seconds == 0 {
            String::new()
        } else {
            self.timer_seconds.to_string()
        };

        let entries = [
            ("password", self.password.clone()),
            ("log_level", level_name(self.log_level).to_string()),
            ("use_default_videos", flag(self.use_default_videos)),
            ("timer", timer),
            ("timer_position", self.timer_position.as_str().to_string()),
            ("mode", self.mode.as_str().to_string()),
            ("bg_color", self.background_color.clone()),
            ("screensaver_image_path", path_value(&self.screensaver_image)),
            ("popup_text_file", path_value(&self.popup_text_file)),
            ("popup_interval", self.popup_interval_secs.to_string()),
            ("popup_duration", self.popup_duration_secs.to_string()),
            ("popup_video_size", self.popup_video_size.to_string()),
            ("show_skip_button", flag(self.show_skip_button)),
            ("show_password", flag(self.show_password_entry)),
            ("show_popup_bg", flag(self.show_popup_background)),
        ];

        entries
            .iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }

    /// Save settings to the standard location
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    /// Save settings to a specific path, creating the parent directory
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path, self.to_file_string())
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        info!("Settings saved to: {}", path.display());
        Ok(())
    }
}

fn flag(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

fn parse_flag(value: &str) -> bool {
    value.trim() == "True"
}

fn optional_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn parse_timer(value: &str) -> u64 {
    let value = value.trim();
    if value.is_empty() {
        return 0;
    }
    match value.parse::<u64>() {
        Ok(seconds) => seconds,
        Err(e) => {
            warn!("Invalid timer '{}': {}. Countdown disabled.", value, e);
            0
        }
    }
}

fn parse_positive(key: &str, value: &str, default: f64) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        Ok(v) => {
            warn!("{} must be positive (got {}), using {}", key, v, default);
            default
        }
        Err(e) => {
            warn!("Failed to parse {} '{}': {}. Using {}", key, value, e, default);
            default
        }
    }
}

fn parse_video_size(value: &str) -> u32 {
    match value.trim().parse::<u32>() {
        Ok(size) if (POPUP_VIDEO_SIZE_MIN..=POPUP_VIDEO_SIZE_MAX).contains(&size) => size,
        _ => {
            warn!(
                "Invalid popup_video_size '{}' (must be {}-{}), using {}",
                value, POPUP_VIDEO_SIZE_MIN, POPUP_VIDEO_SIZE_MAX, DEFAULT_POPUP_VIDEO_SIZE
            );
            DEFAULT_POPUP_VIDEO_SIZE
        }
    }
}

fn parse_or_default<T: FromStr<Err = anyhow::Error> + fmt::Debug>(
    key: &str,
    value: &str,
    default: T,
) -> T {
    match value.parse::<T>() {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Invalid {}: {}. Using {:?}", key, e, default);
            default
        }
    }
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARNING" | "WARN" => LevelFilter::Warn,
        "ERROR" | "CRITICAL" => LevelFilter::Error,
        other => {
            warn!("Unknown log_level '{}', using INFO", other);
            LevelFilter::Info
        }
    }
}

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off | LevelFilter::Error => "ERROR",
        LevelFilter::Warn => "WARNING",
        LevelFilter::Info => "INFO",
        LevelFilter::Debug | LevelFilter::Trace => "DEBUG",
    }
}
