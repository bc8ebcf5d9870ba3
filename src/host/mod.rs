//! Host contract
//!
//! Everything the lock session asks of the windowing layer goes through the
//! [`Host`] trait: chrome, dialogs, the timer label, controls, the screensaver
//! and pop-up surfaces. The session owns its host and calls it only from the
//! event thread.

pub mod terminal;

use crate::session::EndReason;
use crate::settings::{Mode, TimerPosition};
use anyhow::Result;
use std::fmt;
use std::path::Path;

/// RGB colour parsed from `#RGB` or `#RRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex colour, returning None for anything but `#RGB`/`#RRGGBB`
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|d| d * 17);
                Some(Self::new(digit(0)?, digit(1)?, digit(2)?))
            }
            6 => {
                let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                Some(Self::new(pair(0)?, pair(2)?, pair(4)?))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Screen rectangle in pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// True if the rectangle lies entirely inside a screen of the given size
    pub fn fits_within(&self, screen: Size) -> bool {
        self.x + self.width <= screen.width && self.y + self.height <= screen.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

/// Randomised look of a text pop-up
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub family: String,
    pub size: u32,
    pub weight: FontWeight,
    pub color: Rgb,
    /// Pop-up background, None for transparent
    pub background: Option<Rgb>,
}

/// Host-side identifier of a pop-up surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// Windowing capabilities the lock session drives
pub trait Host {
    /// Switch the main window to fullscreen or borderless pop-up chrome
    fn set_chrome(&mut self, mode: Mode, background: Rgb);

    /// Show an error dialog (non-blocking for the session)
    fn show_error(&mut self, title: &str, message: &str);

    /// Update the countdown label
    fn show_timer(&mut self, text: &str, position: TimerPosition);

    fn set_controls_visible(&mut self, visible: bool);

    /// Empty the password entry after a rejected attempt
    fn clear_password_field(&mut self);

    /// Load and display the screensaver image over the video
    fn show_screensaver(&mut self, image: &Path) -> Result<()>;

    fn hide_screensaver(&mut self);

    /// Show the full-screen backdrop behind pop-ups
    fn show_popup_backdrop(&mut self, color: Rgb) -> Result<()>;

    fn hide_popup_backdrop(&mut self);

    fn screen_size(&self) -> Size;

    fn font_families(&self) -> Vec<String>;

    /// Rendered size of a text in the given style
    fn measure_text(&self, text: &str, style: &TextStyle) -> Size;

    fn open_text_popup(&mut self, text: &str, style: &TextStyle, bounds: Rect) -> Result<SurfaceId>;

    /// Open a floating surface for a pop-up video player
    fn open_video_popup(&mut self, bounds: Rect, background: Option<Rgb>) -> Result<SurfaceId>;

    fn set_popup_visible(&mut self, surface: SurfaceId, visible: bool);

    fn close_popup(&mut self, surface: SurfaceId);

    /// Session is over; the host should terminate the process
    fn session_ended(&mut self, reason: EndReason);
}
