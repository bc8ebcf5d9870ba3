//! Overlay Scheduler for pop-up sessions
//!
//! Two independent schedules run on the session event queue: short-lived text
//! pop-ups re-armed after a small random delay, and floating video pop-ups
//! re-armed after exactly the configured interval. Each live pop-up is a
//! [`PopupHandle`] with its own retirement entry on the queue.

use crate::constants::{
    TEXT_POPUP_CHANNEL_MAX, TEXT_POPUP_CHANNEL_MIN, TEXT_POPUP_DISPLAY_MS, TEXT_POPUP_FONT_MAX,
    TEXT_POPUP_FONT_MIN, TEXT_POPUP_REARM_MAX_MS, TEXT_POPUP_REARM_MIN_MS,
};
use crate::event_queue::{EventQueue, TaskToken};
use crate::host::{FontWeight, Host, Rect, Rgb, Size, SurfaceId, TextStyle};
use crate::library::VideoLibrary;
use crate::playback::{EndAction, MediaBackend, MediaPlayer};
use crate::session::SessionEvent;
use anyhow::{Context, Result};
use log::{debug, error, info};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::path::Path;
use std::time::Duration;

const FALLBACK_FONT: &str = "Helvetica";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    Text,
    Video,
}

/// One live overlay
pub struct PopupHandle {
    id: PopupId,
    kind: PopupKind,
    surface: SurfaceId,
    created_at: Duration,
    expires_at: Duration,
    player: Option<Box<dyn MediaPlayer>>,
    visible: bool,
    retire_token: Option<TaskToken>,
    /// Time left before retirement while the scheduler is suspended
    held_remaining: Option<Duration>,
}

impl PopupHandle {
    pub fn id(&self) -> PopupId {
        self.id
    }

    pub fn kind(&self) -> PopupKind {
        self.kind
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn created_at(&self) -> Duration {
        self.created_at
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }
}

/// Timing and geometry of the pop-ups, resolved from the settings
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub interval: Duration,
    pub duration: Duration,
    /// Share of each screen axis a video pop-up covers, in (0, 1]
    pub size_fraction: f64,
    pub background: Option<Rgb>,
}

/// Collaborators the scheduler borrows from the session for one callback
pub struct OverlayContext<'a> {
    pub queue: &'a mut EventQueue<SessionEvent>,
    pub host: &'a mut dyn Host,
    pub media: &'a mut dyn MediaBackend,
    pub rng: &'a mut dyn RngCore,
    pub library: &'a VideoLibrary,
}

pub struct OverlayScheduler {
    config: OverlayConfig,
    texts: Vec<String>,
    running: bool,
    suspended: bool,
    text_token: Option<TaskToken>,
    video_token: Option<TaskToken>,
    popups: Vec<PopupHandle>,
    next_id: u64,
}

impl OverlayScheduler {
    pub fn new(config: OverlayConfig, texts: Vec<String>) -> Self {
        Self {
            config,
            texts,
            running: false,
            suspended: false,
            text_token: None,
            video_token: None,
            popups: Vec::new(),
            next_id: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn popups(&self) -> &[PopupHandle] {
        &self.popups
    }

    pub fn live_count(&self) -> usize {
        self.popups.len()
    }

    /// Number of armed schedule ticks (text and video)
    pub fn pending_rearms(&self) -> usize {
        usize::from(self.text_token.is_some()) + usize::from(self.video_token.is_some())
    }

    /// Arm both schedules; each fires its first pop-up immediately
    ///
    /// A schedule without content (no phrases, empty library) is not armed.
    pub fn start(&mut self, ctx: &mut OverlayContext<'_>) {
        self.running = true;
        self.suspended = false;
        self.arm_schedules(ctx.queue, ctx.library);
        info!(
            "Overlay scheduler started (text: {}, video: {})",
            self.text_token.is_some(),
            self.video_token.is_some()
        );
    }

    fn arm_schedules(&mut self, queue: &mut EventQueue<SessionEvent>, library: &VideoLibrary) {
        if self.texts.is_empty() {
            debug!("No pop-up phrases, text schedule idle");
        } else if self.text_token.is_none() {
            self.text_token = Some(queue.schedule(Duration::ZERO, SessionEvent::TextPopup));
        }

        if library.is_empty() {
            debug!("Empty video library, video schedule idle");
        } else if self.video_token.is_none() {
            self.video_token = Some(queue.schedule(Duration::ZERO, SessionEvent::VideoPopup));
        }
    }

    fn active(&self) -> bool {
        self.running && !self.suspended
    }

    /// Text schedule tick: show one phrase and re-arm after a random delay
    pub fn on_text_tick(&mut self, token: TaskToken, ctx: &mut OverlayContext<'_>) {
        if self.text_token != Some(token) {
            return;
        }
        self.text_token = None;
        if !self.active() || self.texts.is_empty() {
            return;
        }

        self.show_text_popup(ctx);

        let delay = ctx.rng.gen_range(TEXT_POPUP_REARM_MIN_MS..=TEXT_POPUP_REARM_MAX_MS);
        self.text_token = Some(
            ctx.queue
                .schedule(Duration::from_millis(delay), SessionEvent::TextPopup),
        );
    }

    /// Video schedule tick: open one video pop-up and re-arm after the interval
    pub fn on_video_tick(&mut self, token: TaskToken, ctx: &mut OverlayContext<'_>) {
        if self.video_token != Some(token) {
            return;
        }
        self.video_token = None;
        if !self.active() || ctx.library.is_empty() {
            return;
        }

        self.show_video_popup(ctx);

        self.video_token = Some(ctx.queue.schedule(self.config.interval, SessionEvent::VideoPopup));
    }

    /// A pop-up reached the end of its display time
    pub fn on_retire(&mut self, id: PopupId, token: TaskToken, ctx: &mut OverlayContext<'_>) {
        let Some(index) = self
            .popups
            .iter()
            .position(|p| p.id == id && p.retire_token == Some(token))
        else {
            debug!("Ignoring stale retirement of {:?}", id);
            return;
        };
        let popup = self.popups.remove(index);
        Self::teardown(popup, ctx.queue, ctx.host);
    }

    /// Stop both schedules and tear down every live pop-up now
    pub fn cancel_all(&mut self, queue: &mut EventQueue<SessionEvent>, host: &mut dyn Host) {
        self.disarm_schedules(queue);
        let count = self.popups.len();
        for popup in self.popups.drain(..) {
            Self::teardown(popup, queue, host);
        }
        self.running = false;
        self.suspended = false;
        if count > 0 {
            info!("Cancelled overlay scheduler, tore down {} pop-ups", count);
        }
    }

    /// Hide live pop-ups and hold all timers without destroying anything
    pub fn suspend(&mut self, queue: &mut EventQueue<SessionEvent>, host: &mut dyn Host) {
        if self.suspended {
            return;
        }
        self.disarm_schedules(queue);
        let now = queue.now();
        for popup in &mut self.popups {
            if let Some(token) = popup.retire_token.take() {
                queue.cancel(token);
            }
            popup.held_remaining = Some(popup.expires_at.saturating_sub(now));
            if let Some(player) = popup.player.as_mut() {
                player.pause();
            }
            popup.visible = false;
            host.set_popup_visible(popup.surface, false);
        }
        self.suspended = true;
        debug!("Overlay scheduler suspended with {} pop-ups", self.popups.len());
    }

    /// Undo [`suspend`](Self::suspend): show pop-ups, restart their clocks, re-arm schedules
    pub fn resume(&mut self, ctx: &mut OverlayContext<'_>) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        let now = ctx.queue.now();
        for popup in &mut self.popups {
            let remaining = popup.held_remaining.take().unwrap_or(Duration::ZERO);
            popup.expires_at = now + remaining;
            popup.retire_token = Some(ctx.queue.schedule(remaining, SessionEvent::RetirePopup(popup.id)));
            if let Some(player) = popup.player.as_mut() {
                if let Err(e) = player.play() {
                    error!("Failed to resume pop-up video: {:#}", e);
                }
            }
            popup.visible = true;
            ctx.host.set_popup_visible(popup.surface, true);
        }
        if self.running {
            self.arm_schedules(ctx.queue, ctx.library);
        }
        debug!("Overlay scheduler resumed");
    }

    fn disarm_schedules(&mut self, queue: &mut EventQueue<SessionEvent>) {
        for token in [self.text_token.take(), self.video_token.take()].into_iter().flatten() {
            queue.cancel(token);
        }
    }

    fn show_text_popup(&mut self, ctx: &mut OverlayContext<'_>) {
        let Some(text) = self.texts.choose(&mut *ctx.rng).cloned() else {
            return;
        };

        let families = ctx.host.font_families();
        let family = families
            .choose(&mut *ctx.rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_FONT.to_string());
        let weight = if ctx.rng.gen_bool(0.5) {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        };
        let mut channel = || ctx.rng.gen_range(TEXT_POPUP_CHANNEL_MIN..=TEXT_POPUP_CHANNEL_MAX);
        let color = Rgb::new(channel(), channel(), channel());
        let style = TextStyle {
            family,
            size: ctx.rng.gen_range(TEXT_POPUP_FONT_MIN..=TEXT_POPUP_FONT_MAX),
            weight,
            color,
            background: self.config.background,
        };

        let screen = ctx.host.screen_size();
        let measured = ctx.host.measure_text(&text, &style);
        let bounds = random_placement(measured, screen, &mut *ctx.rng);

        match ctx.host.open_text_popup(&text, &style, bounds) {
            Ok(surface) => {
                self.track(
                    PopupKind::Text,
                    surface,
                    None,
                    Duration::from_millis(TEXT_POPUP_DISPLAY_MS),
                    ctx.queue,
                );
            }
            Err(e) => error!("Error creating text pop-up: {:#}", e),
        }
    }

    fn show_video_popup(&mut self, ctx: &mut OverlayContext<'_>) {
        let Some(video) = ctx.library.choose(&mut *ctx.rng).map(Path::to_path_buf) else {
            return;
        };

        let screen = ctx.host.screen_size();
        let size = Size::new(
            scaled(screen.width, self.config.size_fraction),
            scaled(screen.height, self.config.size_fraction),
        );
        let bounds = random_placement(size, screen, &mut *ctx.rng);

        let surface = match ctx.host.open_video_popup(bounds, self.config.background) {
            Ok(surface) => surface,
            Err(e) => {
                error!("Error creating pop-up video window: {:#}", e);
                return;
            }
        };

        match self.start_player(ctx.media, &video, &mut *ctx.rng) {
            Ok((player, offset)) => {
                let name = video.file_name().unwrap_or_default().to_string_lossy();
                match offset {
                    Some(ms) => info!("Pop-up video started: {} at {}ms", name, ms),
                    None => info!("Pop-up video started: {}", name),
                }
                self.track(PopupKind::Video, surface, Some(player), self.config.duration, ctx.queue);
            }
            Err(e) => {
                error!("Error creating pop-up video: {:#}", e);
                ctx.host.close_popup(surface);
            }
        }
    }

    /// Create, cue and start a looping player; released again on any failure
    fn start_player(
        &self,
        media: &mut dyn MediaBackend,
        video: &Path,
        rng: &mut dyn RngCore,
    ) -> Result<(Box<dyn MediaPlayer>, Option<u64>)> {
        let mut player = media
            .create_player()
            .context("Failed to create pop-up player")?;

        match self.cue(player.as_mut(), video, rng) {
            Ok(offset) => Ok((player, offset)),
            Err(e) => {
                player.release();
                Err(e)
            }
        }
    }

    fn cue(&self, player: &mut dyn MediaPlayer, video: &Path, rng: &mut dyn RngCore) -> Result<Option<u64>> {
        player
            .load(video)
            .with_context(|| format!("Failed to load {}", video.display()))?;
        player.on_end_reached(EndAction::Loop);
        player.play().context("Failed to start pop-up playback")?;

        let window_ms = self.config.duration.as_millis() as u64;
        match player.duration_millis() {
            Some(duration_ms) if duration_ms > window_ms => {
                let offset = choose_seek_offset(duration_ms, window_ms, rng);
                player.seek(offset);
                Ok(Some(offset))
            }
            _ => Ok(None),
        }
    }

    fn track(
        &mut self,
        kind: PopupKind,
        surface: SurfaceId,
        player: Option<Box<dyn MediaPlayer>>,
        lifetime: Duration,
        queue: &mut EventQueue<SessionEvent>,
    ) {
        self.next_id += 1;
        let id = PopupId(self.next_id);
        let now = queue.now();
        let retire_token = queue.schedule(lifetime, SessionEvent::RetirePopup(id));
        self.popups.push(PopupHandle {
            id,
            kind,
            surface,
            created_at: now,
            expires_at: now + lifetime,
            player,
            visible: true,
            retire_token: Some(retire_token),
            held_remaining: None,
        });
    }

    /// Stop and release the player before the surface goes away
    fn teardown(mut popup: PopupHandle, queue: &mut EventQueue<SessionEvent>, host: &mut dyn Host) {
        if let Some(token) = popup.retire_token.take() {
            queue.cancel(token);
        }
        if let Some(mut player) = popup.player.take() {
            player.stop();
            player.release();
        }
        host.close_popup(popup.surface);
        debug!("Pop-up {:?} ({:?}) torn down", popup.id, popup.kind);
    }
}

/// Random start offset leaving at least `window_ms` of media to play
///
/// Returns 0 when the media is not longer than the window.
pub fn choose_seek_offset<R: Rng + ?Sized>(duration_ms: u64, window_ms: u64, rng: &mut R) -> u64 {
    if duration_ms <= window_ms {
        return 0;
    }
    rng.gen_range(0..=duration_ms - window_ms)
}

/// Uniformly random position keeping `size` fully on screen
pub fn random_placement<R: Rng + ?Sized>(size: Size, screen: Size, rng: &mut R) -> Rect {
    let width = size.width.min(screen.width);
    let height = size.height.min(screen.height);
    Rect {
        x: rng.gen_range(0..=screen.width - width),
        y: rng.gen_range(0..=screen.height - height),
        width,
        height,
    }
}

fn scaled(length: u32, fraction: f64) -> u32 {
    ((f64::from(length) * fraction) as u32).clamp(1, length.max(1))
}
