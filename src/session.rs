//! Lock Session Controller
//!
//! Owns the session state and every collaborator for one run of the lock
//! screen. All work happens inside handlers invoked from a single event
//! thread: host commands arrive through [`LockSession::handle`], deferred
//! callbacks fire from [`LockSession::advance_to`]. A session only ends through
//! [`LockSession::end_session`], reached by a password match, the cancel key or
//! timer expiry.

use crate::capability::Latch;
use crate::constants::{
    DEFAULT_POPUP_DURATION_SECS, DEFAULT_POPUP_INTERVAL_SECS, PLAYBACK_POLL_MS, PLAYBACK_RATE_MAX,
    PLAYBACK_RATE_MIN, TIMER_TICK_MS, VOLUME_MAX_PERCENT,
};
use crate::controls::ControlsVisibility;
use crate::event_queue::{EventQueue, TaskToken};
use crate::host::{Host, Rgb};
use crate::input_lock::{InputLock, InputLockGuard};
use crate::library::{load_popup_texts, VideoDirs, VideoLibrary};
use crate::overlay::{OverlayConfig, OverlayContext, OverlayScheduler, PopupId};
use crate::playback::{MediaBackend, MediaPlayer};
use crate::settings::{Mode, Settings};
use anyhow::Result;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Deferred callbacks on the session queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    TimerTick,
    PlaybackPoll,
    HideControls,
    TextPopup,
    VideoPopup,
    RetirePopup(PopupId),
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    PasswordMatch,
    UserCancel,
    TimerExpired,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::PasswordMatch => "password match",
            EndReason::UserCancel => "user cancel",
            EndReason::TimerExpired => "timer expired",
        };
        f.write_str(text)
    }
}

/// Mutable session state, owned by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Seconds left on the countdown (0 when no timer runs)
    pub time_remaining: u64,
    pub timer_running: bool,
    pub screensaver_active: bool,
    /// Whether the main video was playing when the screensaver came up
    pub playback_was_active_before_screensaver: bool,
    pub input_locked: bool,
    /// Fullscreen mode only
    pub controls_visible: bool,
}

/// Requests from the host into the controller
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    PasswordSubmit(String),
    Cancel,
    Skip,
    Rate(f32),
    Volume(i32),
    ToggleScreensaver,
    RevealControls,
    PointerMotion,
    NavEnter,
    NavLeave,
    TimerHover,
}

/// Collaborators handed to [`LockSession::start`]
pub struct SessionParts {
    pub host: Box<dyn Host>,
    pub media: Box<dyn MediaBackend>,
    pub input_lock: Box<dyn InputLock>,
    pub rng: Box<dyn RngCore>,
    pub video_dirs: VideoDirs,
}

impl SessionParts {
    /// Parts with an entropy-seeded random source
    pub fn new(
        host: Box<dyn Host>,
        media: Box<dyn MediaBackend>,
        input_lock: Box<dyn InputLock>,
        video_dirs: VideoDirs,
    ) -> Self {
        Self {
            host,
            media,
            input_lock,
            rng: Box::new(StdRng::from_entropy()),
            video_dirs,
        }
    }

    /// Replace the random source, e.g. with a seeded one
    pub fn with_rng(mut self, rng: Box<dyn RngCore>) -> Self {
        self.rng = rng;
        self
    }
}

/// Collaborators the overlay scheduler borrows alongside the controller
struct Runtime {
    queue: EventQueue<SessionEvent>,
    host: Box<dyn Host>,
    media: Box<dyn MediaBackend>,
    rng: Box<dyn RngCore>,
    library: VideoLibrary,
}

impl Runtime {
    fn overlay_ctx(&mut self) -> OverlayContext<'_> {
        OverlayContext {
            queue: &mut self.queue,
            host: self.host.as_mut(),
            media: self.media.as_mut(),
            rng: self.rng.as_mut(),
            library: &self.library,
        }
    }
}

pub struct LockSession {
    settings: Settings,
    state: SessionState,
    rt: Runtime,
    input_lock: InputLockGuard,
    screensaver: Latch,
    backdrop: Latch,
    player: Option<Box<dyn MediaPlayer>>,
    current_video: Option<PathBuf>,
    /// Set after a failed start until the next video plays
    playback_failing: bool,
    controls: ControlsVisibility,
    overlay: OverlayScheduler,
    timer_token: Option<TaskToken>,
    poll_token: Option<TaskToken>,
    rate: f32,
    volume: u8,
    ended: Option<EndReason>,
}

impl LockSession {
    /// Begin a session
    ///
    /// Every failure here is reported and degrades the session rather than
    /// aborting it: the user can always leave through the password, the
    /// cancel key or the timer.
    pub fn start(settings: Settings, parts: SessionParts) -> Self {
        let SessionParts {
            host,
            media,
            input_lock,
            rng,
            video_dirs,
        } = parts;

        let background = Rgb::from_hex(&settings.background_color).unwrap_or_else(|| {
            warn!(
                "Invalid background colour '{}', using black",
                settings.background_color
            );
            Rgb::new(0, 0, 0)
        });

        let overlay = OverlayScheduler::new(overlay_config(&settings, background), Vec::new());

        let mut session = Self {
            settings,
            state: SessionState::default(),
            rt: Runtime {
                queue: EventQueue::new(),
                host,
                media,
                rng,
                library: VideoLibrary::empty(),
            },
            input_lock: InputLockGuard::new(input_lock),
            screensaver: Latch::new("screensaver"),
            backdrop: Latch::new("pop-up backdrop"),
            player: None,
            current_video: None,
            playback_failing: false,
            controls: ControlsVisibility::new(),
            overlay,
            timer_token: None,
            poll_token: None,
            rate: 1.0,
            volume: VOLUME_MAX_PERCENT,
            ended: None,
        };

        let mode = session.settings.mode;
        info!("Starting lock session in {} mode", mode);
        session.rt.host.set_chrome(mode, background);

        session.lock_input();
        session.load_library(&video_dirs);
        session.play_random_video();

        match mode {
            Mode::Fullscreen => {
                if !session.rt.library.is_empty() {
                    session.schedule_poll();
                }
                let change = session.controls.start(&mut session.rt.queue);
                session.apply_controls(change);
            }
            Mode::Popup => session.start_popups(background),
        }

        if session.settings.timer_seconds > 0 {
            session.start_timer(session.settings.timer_seconds);
        }

        session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn library(&self) -> &VideoLibrary {
        &self.rt.library
    }

    pub fn overlay(&self) -> &OverlayScheduler {
        &self.overlay
    }

    pub fn current_video(&self) -> Option<&Path> {
        self.current_video.as_deref()
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_some()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.ended
    }

    /// Logical time since the session started
    pub fn now(&self) -> Duration {
        self.rt.queue.now()
    }

    /// When the next deferred callback is due
    pub fn next_deadline(&self) -> Option<Duration> {
        self.rt.queue.next_deadline()
    }

    /// Dispatch one host request
    pub fn handle(&mut self, command: HostCommand) {
        match command {
            HostCommand::PasswordSubmit(candidate) => {
                self.on_password_submit(&candidate);
            }
            HostCommand::Cancel => self.on_cancel_key(),
            HostCommand::Skip => self.on_skip_requested(),
            HostCommand::Rate(factor) => self.on_rate_changed(factor),
            HostCommand::Volume(percent) => self.on_volume_changed(percent),
            HostCommand::ToggleScreensaver => self.toggle_screensaver(),
            HostCommand::RevealControls => self.on_controls_reveal_requested(),
            HostCommand::PointerMotion => self.on_pointer_motion(),
            HostCommand::NavEnter => self.on_nav_enter(),
            HostCommand::NavLeave => self.on_nav_leave(),
            HostCommand::TimerHover => self.on_timer_hover(),
        }
    }

    /// Move logical time forward by `delta`, firing everything that falls due
    pub fn advance(&mut self, delta: Duration) {
        let until = self.rt.queue.now() + delta;
        self.advance_to(until);
    }

    /// Fire every callback due at or before `until`, in deadline order
    pub fn advance_to(&mut self, until: Duration) {
        while !self.is_ended() {
            let Some((token, event)) = self.rt.queue.pop_due(until) else {
                break;
            };
            self.dispatch(token, event);
        }
        self.rt.queue.settle(until);
    }

    fn dispatch(&mut self, token: TaskToken, event: SessionEvent) {
        match event {
            SessionEvent::TimerTick => {
                if self.timer_token == Some(token) {
                    self.timer_token = None;
                    self.on_timer_tick();
                }
            }
            SessionEvent::PlaybackPoll => self.on_playback_poll(token),
            SessionEvent::HideControls => {
                let change = self.controls.on_hide_due(token);
                self.apply_controls(change);
            }
            SessionEvent::TextPopup => self.overlay.on_text_tick(token, &mut self.rt.overlay_ctx()),
            SessionEvent::VideoPopup => self.overlay.on_video_tick(token, &mut self.rt.overlay_ctx()),
            SessionEvent::RetirePopup(id) => {
                self.overlay.on_retire(id, token, &mut self.rt.overlay_ctx())
            }
        }
    }

    /// Exact, case-sensitive comparison. Returns true if the session ended.
    pub fn on_password_submit(&mut self, candidate: &str) -> bool {
        if self.is_ended() {
            return false;
        }
        if candidate == self.settings.password {
            info!("Correct password entered");
            self.end_session(EndReason::PasswordMatch);
            return true;
        }

        warn!("Incorrect password attempt");
        self.rt
            .host
            .show_error("Incorrect Password", "The password you entered is incorrect.");
        self.rt.host.clear_password_field();
        false
    }

    /// Always ends the session
    pub fn on_cancel_key(&mut self) {
        info!("Cancel key pressed");
        self.end_session(EndReason::UserCancel);
    }

    /// One countdown second
    ///
    /// Also callable directly; any armed tick is replaced so only one is ever
    /// pending.
    pub fn on_timer_tick(&mut self) {
        if self.is_ended() || !self.state.timer_running {
            return;
        }
        if let Some(token) = self.timer_token.take() {
            self.rt.queue.cancel(token);
        }

        self.state.time_remaining = self.state.time_remaining.saturating_sub(1);
        if self.state.time_remaining == 0 {
            info!("Timer expired");
            self.show_timer();
            self.end_session(EndReason::TimerExpired);
            return;
        }

        self.show_timer();
        self.schedule_tick();
    }

    /// Tear everything down and tell the host. Later calls are no-ops.
    pub fn end_session(&mut self, reason: EndReason) {
        if let Some(previous) = self.ended {
            debug!("Session already ended ({}), ignoring {}", previous, reason);
            return;
        }
        self.ended = Some(reason);
        info!("Ending session: {}", reason);

        for token in [self.timer_token.take(), self.poll_token.take()].into_iter().flatten() {
            self.rt.queue.cancel(token);
        }
        self.state.timer_running = false;
        self.controls.cancel_hide(&mut self.rt.queue);

        self.overlay.cancel_all(&mut self.rt.queue, self.rt.host.as_mut());

        if let Some(mut player) = self.player.take() {
            player.stop();
            player.release();
        }
        self.current_video = None;

        let host = self.rt.host.as_mut();
        self.screensaver.release_with(|| host.hide_screensaver());
        self.state.screensaver_active = false;
        self.backdrop.release_with(|| host.hide_popup_backdrop());

        self.input_lock.release();
        self.state.input_locked = self.input_lock.is_acquired();

        self.rt.queue.clear();
        self.rt.host.session_ended(reason);
    }

    /// Show or hide the screensaver (fullscreen mode with an image only)
    pub fn toggle_screensaver(&mut self) {
        if self.is_ended() {
            return;
        }
        if self.settings.mode == Mode::Popup {
            debug!("Screensaver is not available in pop-up mode");
            return;
        }
        if self.state.screensaver_active {
            self.deactivate_screensaver();
        } else {
            self.activate_screensaver();
        }
    }

    fn activate_screensaver(&mut self) {
        let Some(image) = self.settings.screensaver_image.clone() else {
            info!("No screensaver image configured");
            return;
        };

        let host = self.rt.host.as_mut();
        if let Err(e) = self.screensaver.acquire_with(|| host.show_screensaver(&image)) {
            self.report(
                "Screensaver Error",
                &format!("Could not load screensaver image: {:#}", e),
            );
            return;
        }

        let was_playing = self.player.as_ref().is_some_and(|p| p.is_playing());
        self.state.playback_was_active_before_screensaver = was_playing;
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        self.overlay.suspend(&mut self.rt.queue, self.rt.host.as_mut());
        self.state.screensaver_active = true;
        info!("Screensaver activated");
    }

    fn deactivate_screensaver(&mut self) {
        let host = self.rt.host.as_mut();
        self.screensaver.release_with(|| host.hide_screensaver());
        self.state.screensaver_active = false;

        self.overlay.resume(&mut self.rt.overlay_ctx());

        if self.state.playback_was_active_before_screensaver {
            if let Some(player) = self.player.as_mut() {
                if let Err(e) = player.play() {
                    error!("Failed to resume playback: {:#}", e);
                }
            }
        }
        self.state.playback_was_active_before_screensaver = false;

        if self.settings.mode == Mode::Fullscreen {
            let change = self.controls.on_pointer_activity(&mut self.rt.queue);
            self.apply_controls(change);
        }
        info!("Screensaver deactivated");
    }

    /// Switch to another random video now
    pub fn on_skip_requested(&mut self) {
        if self.is_ended() {
            return;
        }
        if self.state.screensaver_active {
            debug!("Skip ignored while the screensaver is active");
            return;
        }
        self.play_random_video();
    }

    /// Playback speed, clamped to the supported range
    pub fn on_rate_changed(&mut self, factor: f32) {
        if self.is_ended() {
            return;
        }
        let rate = if factor.is_finite() {
            factor.clamp(PLAYBACK_RATE_MIN, PLAYBACK_RATE_MAX)
        } else {
            1.0
        };
        self.rate = rate;
        if let Some(player) = self.player.as_mut() {
            player.set_rate(rate);
        }
        debug!("Playback rate set to {:.2}", rate);
    }

    /// Volume in percent, clamped to 0-100
    pub fn on_volume_changed(&mut self, percent: i32) {
        if self.is_ended() {
            return;
        }
        let volume = percent.clamp(0, i32::from(VOLUME_MAX_PERCENT)) as u8;
        self.volume = volume;
        if let Some(player) = self.player.as_mut() {
            player.set_volume(volume);
        }
        debug!("Volume set to {}%", volume);
    }

    pub fn on_controls_reveal_requested(&mut self) {
        if self.controls_active() {
            let change = self.controls.on_reveal(&mut self.rt.queue);
            self.apply_controls(change);
        }
    }

    pub fn on_pointer_motion(&mut self) {
        self.pointer_activity();
    }

    pub fn on_nav_enter(&mut self) {
        self.pointer_activity();
    }

    pub fn on_timer_hover(&mut self) {
        self.pointer_activity();
    }

    pub fn on_nav_leave(&mut self) {
        if self.controls_active() {
            let change = self.controls.on_leave(&mut self.rt.queue);
            self.apply_controls(change);
        }
    }

    fn pointer_activity(&mut self) {
        if self.controls_active() {
            let change = self.controls.on_pointer_activity(&mut self.rt.queue);
            self.apply_controls(change);
        }
    }

    fn controls_active(&self) -> bool {
        !self.is_ended() && self.settings.mode == Mode::Fullscreen
    }

    fn apply_controls(&mut self, change: Option<bool>) {
        if let Some(visible) = change {
            self.state.controls_visible = visible;
            self.rt.host.set_controls_visible(visible);
        }
    }

    fn lock_input(&mut self) {
        if let Err(e) = self.input_lock.acquire() {
            self.report(
                "Input Lock Error",
                &format!("Could not suppress system shortcuts: {:#}", e),
            );
        }
        self.state.input_locked = self.input_lock.is_acquired();
    }

    fn load_library(&mut self, dirs: &VideoDirs) {
        let dir = dirs.select(&self.settings).to_path_buf();
        match VideoLibrary::scan(&dir) {
            Ok(library) if library.is_empty() => {
                self.report(
                    "Video Error",
                    &format!("No videos found in '{}'.", dir.display()),
                );
            }
            Ok(library) => self.rt.library = library,
            Err(e) => self.report("Video Error", &format!("{:#}", e)),
        }
    }

    fn play_random_video(&mut self) {
        let Some(video) = self.rt.library.choose(self.rt.rng.as_mut()).map(Path::to_path_buf) else {
            debug!("No videos to play");
            return;
        };

        if self.player.is_none() {
            match self.rt.media.create_player() {
                Ok(player) => self.player = Some(player),
                Err(e) => {
                    self.playback_failed(&format!("Could not create player: {:#}", e));
                    return;
                }
            }
        }

        let Some(player) = self.player.as_mut() else {
            return;
        };
        match cue_main(player.as_mut(), &video, self.rate, self.volume) {
            Ok(()) => {
                info!(
                    "Now playing: {}",
                    video.file_name().unwrap_or_default().to_string_lossy()
                );
                self.current_video = Some(video);
                self.playback_failing = false;
            }
            Err(e) => {
                self.current_video = None;
                self.playback_failed(&format!("Could not play {}: {:#}", video.display(), e));
            }
        }
    }

    /// Raise a dialog for the first failure in a row; the poll keeps retrying quietly
    fn playback_failed(&mut self, message: &str) {
        if self.playback_failing {
            warn!("Playback Error: {}", message);
            return;
        }
        self.playback_failing = true;
        self.report("Playback Error", message);
    }

    fn schedule_poll(&mut self) {
        self.poll_token = Some(
            self.rt
                .queue
                .schedule(Duration::from_millis(PLAYBACK_POLL_MS), SessionEvent::PlaybackPoll),
        );
    }

    /// Continuous playback: replace a finished video with another one
    fn on_playback_poll(&mut self, token: TaskToken) {
        if self.poll_token != Some(token) {
            return;
        }
        self.poll_token = None;

        if !self.state.screensaver_active {
            let finished = self.player.as_ref().map_or(true, |p| !p.is_playing());
            if finished {
                debug!("Main video finished, advancing");
                self.play_random_video();
            }
        }
        self.schedule_poll();
    }

    fn start_timer(&mut self, seconds: u64) {
        self.state.time_remaining = seconds;
        self.state.timer_running = true;
        info!("Timer started: {} seconds", seconds);
        self.show_timer();
        self.schedule_tick();
    }

    fn schedule_tick(&mut self) {
        self.timer_token = Some(
            self.rt
                .queue
                .schedule(Duration::from_millis(TIMER_TICK_MS), SessionEvent::TimerTick),
        );
    }

    fn show_timer(&mut self) {
        let text = format_remaining(self.state.time_remaining);
        self.rt.host.show_timer(&text, self.settings.timer_position);
    }

    fn start_popups(&mut self, background: Rgb) {
        let host = self.rt.host.as_mut();
        if let Err(e) = self.backdrop.acquire_with(|| host.show_popup_backdrop(background)) {
            error!("Failed to show pop-up backdrop: {:#}", e);
        }

        let texts = match self.settings.popup_text_file.clone() {
            Some(path) => match load_popup_texts(&path) {
                Ok(texts) => texts,
                Err(e) => {
                    self.report("Pop-up Error", &format!("{:#}", e));
                    Vec::new()
                }
            },
            None => {
                debug!("No pop-up text file configured");
                Vec::new()
            }
        };

        let config = overlay_config(&self.settings, background);
        self.overlay = OverlayScheduler::new(config, texts);
        self.overlay.start(&mut self.rt.overlay_ctx());
    }

    /// Log a resource error and raise it as a dialog
    fn report(&mut self, title: &str, message: &str) {
        error!("{}: {}", title, message);
        self.rt.host.show_error(title, message);
    }
}

fn cue_main(player: &mut dyn MediaPlayer, video: &Path, rate: f32, volume: u8) -> Result<()> {
    player.load(video)?;
    player.set_rate(rate);
    player.set_volume(volume);
    player.play()
}

fn overlay_config(settings: &Settings, background: Rgb) -> OverlayConfig {
    OverlayConfig {
        interval: seconds_or(settings.popup_interval_secs, DEFAULT_POPUP_INTERVAL_SECS),
        duration: seconds_or(settings.popup_duration_secs, DEFAULT_POPUP_DURATION_SECS),
        size_fraction: settings.popup_video_fraction(),
        background: settings.show_popup_background.then_some(background),
    }
}

fn seconds_or(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f64(fallback))
}

/// Countdown text, `MM:SS`
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
