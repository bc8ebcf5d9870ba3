use super::{FontWeight, Host, Rect, Rgb, Size, SurfaceId, TextStyle};
use crate::constants::{HEADLESS_SCREEN_HEIGHT, HEADLESS_SCREEN_WIDTH, NOTIFICATION_ERROR_TIMEOUT_MS};
use crate::session::EndReason;
use crate::settings::{Mode, TimerPosition};
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::path::Path;

const FONT_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "DejaVu Serif",
    "Liberation Mono",
    "Helvetica",
    "Courier",
    "Times",
];

/// Headless host for terminal sessions
///
/// Surfaces are tracked and logged rather than drawn. The screensaver image is
/// decoded for real so a broken file aborts the toggle, and error dialogs are
/// raised as desktop notifications.
pub struct TerminalHost {
    screen: Size,
    next_surface: u64,
    open_surfaces: HashSet<SurfaceId>,
    last_timer_text: Option<String>,
    ended: Option<EndReason>,
}

impl TerminalHost {
    pub fn new(screen: Option<Size>) -> Self {
        Self {
            screen: screen.unwrap_or(Size::new(HEADLESS_SCREEN_WIDTH, HEADLESS_SCREEN_HEIGHT)),
            next_surface: 0,
            open_surfaces: HashSet::new(),
            last_timer_text: None,
            ended: None,
        }
    }

    pub fn open_surface_count(&self) -> usize {
        self.open_surfaces.len()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.ended
    }

    fn allocate(&mut self) -> SurfaceId {
        self.next_surface += 1;
        let id = SurfaceId(self.next_surface);
        self.open_surfaces.insert(id);
        id
    }
}

impl Host for TerminalHost {
    fn set_chrome(&mut self, mode: Mode, background: Rgb) {
        info!("Window chrome: {} on {}", mode, background);
    }

    fn show_error(&mut self, title: &str, message: &str) {
        info!("Error dialog: {}: {}", title, message);
        let _ = notify_rust::Notification::new()
            .summary(&format!("vidlock - {}", title))
            .body(message)
            .timeout(notify_rust::Timeout::Milliseconds(NOTIFICATION_ERROR_TIMEOUT_MS))
            .show();
    }

    fn show_timer(&mut self, text: &str, position: TimerPosition) {
        // Only log minute changes to keep the log readable
        let minute = text.split(':').next().map(str::to_string);
        let previous = self
            .last_timer_text
            .as_deref()
            .and_then(|t| t.split(':').next())
            .map(str::to_string);
        if minute != previous || text.ends_with(":00") {
            info!("Time remaining {} ({})", text, position.as_str());
        }
        self.last_timer_text = Some(text.to_string());
    }

    fn set_controls_visible(&mut self, visible: bool) {
        debug!("Controls {}", if visible { "shown" } else { "hidden" });
    }

    fn clear_password_field(&mut self) {
        debug!("Password field cleared");
    }

    fn show_screensaver(&mut self, image: &Path) -> Result<()> {
        let decoded = image::open(image)
            .with_context(|| format!("Failed to load screensaver image: {}", image.display()))?;
        info!(
            "Screensaver shown: {} ({}x{})",
            image.display(),
            decoded.width(),
            decoded.height()
        );
        Ok(())
    }

    fn hide_screensaver(&mut self) {
        info!("Screensaver hidden");
    }

    fn show_popup_backdrop(&mut self, color: Rgb) -> Result<()> {
        info!("Pop-up backdrop shown in {}", color);
        Ok(())
    }

    fn hide_popup_backdrop(&mut self) {
        info!("Pop-up backdrop hidden");
    }

    fn screen_size(&self) -> Size {
        self.screen
    }

    fn font_families(&self) -> Vec<String> {
        FONT_FAMILIES.iter().map(|f| f.to_string()).collect()
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> Size {
        // Average glyph is roughly 0.6em wide (0.65em bold), line height 1.4em
        let glyph = match style.weight {
            FontWeight::Normal => 0.6,
            FontWeight::Bold => 0.65,
        };
        let chars = text.chars().count().max(1) as f64;
        let width = (chars * f64::from(style.size) * glyph).ceil() as u32;
        let height = (f64::from(style.size) * 1.4).ceil() as u32;
        Size::new(width.min(self.screen.width), height.min(self.screen.height))
    }

    fn open_text_popup(&mut self, text: &str, style: &TextStyle, bounds: Rect) -> Result<SurfaceId> {
        let id = self.allocate();
        debug!(
            "Text pop-up {:?} '{}' in {} {}pt {} at {:?}",
            id, text, style.family, style.size, style.color, bounds
        );
        Ok(id)
    }

    fn open_video_popup(&mut self, bounds: Rect, _background: Option<Rgb>) -> Result<SurfaceId> {
        let id = self.allocate();
        debug!("Video pop-up {:?} at {:?}", id, bounds);
        Ok(id)
    }

    fn set_popup_visible(&mut self, surface: SurfaceId, visible: bool) {
        debug!("Pop-up {:?} visible={}", surface, visible);
    }

    fn close_popup(&mut self, surface: SurfaceId) {
        self.open_surfaces.remove(&surface);
    }

    fn session_ended(&mut self, reason: EndReason) {
        info!("Session ended: {}", reason);
        self.ended = Some(reason);
    }
}
