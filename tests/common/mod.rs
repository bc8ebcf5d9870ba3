// Recording fakes shared by the integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use vidlock::host::{Host, Rect, Rgb, Size, SurfaceId, TextStyle};
use vidlock::input_lock::InputLock;
use vidlock::library::VideoDirs;
use vidlock::playback::{EndAction, MediaBackend, MediaPlayer};
use vidlock::{EndReason, LockSession, Mode, SessionParts, Settings, TimerPosition};

pub const SCREEN: Size = Size {
    width: 1280,
    height: 720,
};

#[derive(Default)]
pub struct HostLog {
    pub chrome: Vec<(Mode, Rgb)>,
    pub errors: Vec<(String, String)>,
    pub timer_texts: Vec<(String, TimerPosition)>,
    pub controls: Vec<bool>,
    pub password_clears: usize,
    pub screensaver_shown: usize,
    pub screensaver_hidden: usize,
    pub backdrop_shown: usize,
    pub backdrop_hidden: usize,
    pub text_popups: Vec<(String, TextStyle, Rect)>,
    pub video_popups: Vec<(Rect, Option<Rgb>)>,
    /// Open surfaces and whether they are visible
    pub surfaces: HashMap<SurfaceId, bool>,
    pub ended: Vec<EndReason>,
    pub fail_screensaver: bool,
    pub fail_video_surface: bool,
}

impl HostLog {
    pub fn error_titles(&self) -> Vec<&str> {
        self.errors.iter().map(|(title, _)| title.as_str()).collect()
    }
}

pub struct FakeHost {
    log: Arc<Mutex<HostLog>>,
    next_surface: u64,
}

impl FakeHost {
    pub fn new(log: Arc<Mutex<HostLog>>) -> Self {
        Self {
            log,
            next_surface: 0,
        }
    }

    fn open_surface(&mut self) -> SurfaceId {
        self.next_surface += 1;
        let id = SurfaceId(self.next_surface);
        self.log.lock().surfaces.insert(id, true);
        id
    }
}

impl Host for FakeHost {
    fn set_chrome(&mut self, mode: Mode, background: Rgb) {
        self.log.lock().chrome.push((mode, background));
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.log
            .lock()
            .errors
            .push((title.to_string(), message.to_string()));
    }

    fn show_timer(&mut self, text: &str, position: TimerPosition) {
        self.log.lock().timer_texts.push((text.to_string(), position));
    }

    fn set_controls_visible(&mut self, visible: bool) {
        self.log.lock().controls.push(visible);
    }

    fn clear_password_field(&mut self) {
        self.log.lock().password_clears += 1;
    }

    fn show_screensaver(&mut self, image: &Path) -> Result<()> {
        let mut log = self.log.lock();
        if log.fail_screensaver {
            return Err(anyhow!("cannot decode {}", image.display()));
        }
        log.screensaver_shown += 1;
        Ok(())
    }

    fn hide_screensaver(&mut self) {
        self.log.lock().screensaver_hidden += 1;
    }

    fn show_popup_backdrop(&mut self, _color: Rgb) -> Result<()> {
        self.log.lock().backdrop_shown += 1;
        Ok(())
    }

    fn hide_popup_backdrop(&mut self) {
        self.log.lock().backdrop_hidden += 1;
    }

    fn screen_size(&self) -> Size {
        SCREEN
    }

    fn font_families(&self) -> Vec<String> {
        vec!["Sans".to_string(), "Serif".to_string()]
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> Size {
        Size::new(text.chars().count() as u32 * style.size / 2, style.size)
    }

    fn open_text_popup(&mut self, text: &str, style: &TextStyle, bounds: Rect) -> Result<SurfaceId> {
        self.log
            .lock()
            .text_popups
            .push((text.to_string(), style.clone(), bounds));
        Ok(self.open_surface())
    }

    fn open_video_popup(&mut self, bounds: Rect, background: Option<Rgb>) -> Result<SurfaceId> {
        if self.log.lock().fail_video_surface {
            return Err(anyhow!("no window server"));
        }
        self.log.lock().video_popups.push((bounds, background));
        Ok(self.open_surface())
    }

    fn set_popup_visible(&mut self, surface: SurfaceId, visible: bool) {
        if let Some(state) = self.log.lock().surfaces.get_mut(&surface) {
            *state = visible;
        }
    }

    fn close_popup(&mut self, surface: SurfaceId) {
        self.log.lock().surfaces.remove(&surface);
    }

    fn session_ended(&mut self, reason: EndReason) {
        self.log.lock().ended.push(reason);
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerRecord {
    pub loaded: Vec<PathBuf>,
    pub playing: bool,
    pub plays: usize,
    pub pauses: usize,
    pub stops: usize,
    pub releases: usize,
    pub seeks: Vec<u64>,
    pub rate: Option<f32>,
    pub volume: Option<u8>,
    pub end_action: EndAction,
}

#[derive(Default)]
pub struct MediaLog {
    /// One record per created player, main player first
    pub players: Vec<PlayerRecord>,
    pub fail_create: bool,
    pub fail_load: bool,
    pub duration_ms: Option<u64>,
}

pub struct FakeMedia {
    log: Arc<Mutex<MediaLog>>,
}

impl FakeMedia {
    pub fn new(log: Arc<Mutex<MediaLog>>) -> Self {
        Self { log }
    }
}

impl MediaBackend for FakeMedia {
    fn create_player(&mut self) -> Result<Box<dyn MediaPlayer>> {
        let mut log = self.log.lock();
        if log.fail_create {
            return Err(anyhow!("engine unavailable"));
        }
        log.players.push(PlayerRecord::default());
        Ok(Box::new(FakePlayer {
            index: log.players.len() - 1,
            log: self.log.clone(),
        }))
    }
}

pub struct FakePlayer {
    index: usize,
    log: Arc<Mutex<MediaLog>>,
}

impl FakePlayer {
    fn with<R>(&self, f: impl FnOnce(&mut PlayerRecord) -> R) -> R {
        let mut log = self.log.lock();
        f(&mut log.players[self.index])
    }
}

impl MediaPlayer for FakePlayer {
    fn load(&mut self, path: &Path) -> Result<()> {
        if self.log.lock().fail_load {
            return Err(anyhow!("unsupported codec"));
        }
        self.with(|p| {
            p.loaded.push(path.to_path_buf());
            p.playing = false;
        });
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.with(|p| {
            p.playing = true;
            p.plays += 1;
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.with(|p| {
            p.playing = false;
            p.pauses += 1;
        });
    }

    fn stop(&mut self) {
        self.with(|p| {
            p.playing = false;
            p.stops += 1;
        });
    }

    fn is_playing(&self) -> bool {
        self.with(|p| p.playing)
    }

    fn set_rate(&mut self, factor: f32) {
        self.with(|p| p.rate = Some(factor));
    }

    fn set_volume(&mut self, percent: u8) {
        self.with(|p| p.volume = Some(percent));
    }

    fn duration_millis(&self) -> Option<u64> {
        self.log.lock().duration_ms
    }

    fn seek(&mut self, millis: u64) {
        self.with(|p| p.seeks.push(millis));
    }

    fn on_end_reached(&mut self, action: EndAction) {
        self.with(|p| p.end_action = action);
    }

    fn release(&mut self) {
        self.with(|p| {
            p.playing = false;
            p.releases += 1;
        });
    }
}

#[derive(Default)]
pub struct LockLog {
    pub engaged: usize,
    pub disengaged: usize,
    pub fail: bool,
}

pub struct FakeLock {
    log: Arc<Mutex<LockLog>>,
}

impl InputLock for FakeLock {
    fn engage(&mut self) -> Result<()> {
        let mut log = self.log.lock();
        if log.fail {
            return Err(anyhow!("accessibility permission denied"));
        }
        log.engaged += 1;
        Ok(())
    }

    fn disengage(&mut self) {
        self.log.lock().disengaged += 1;
    }
}

/// Shared logs plus a data directory with a `videos/` folder
pub struct Harness {
    pub host: Arc<Mutex<HostLog>>,
    pub media: Arc<Mutex<MediaLog>>,
    pub lock: Arc<Mutex<LockLog>>,
    pub dir: TempDir,
    pub seed: u64,
}

impl Harness {
    /// Data directory whose default video folder holds `videos`
    pub fn with_videos(videos: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("videos");
        fs::create_dir_all(&folder).unwrap();
        for name in videos {
            fs::write(folder.join(name), b"").unwrap();
        }
        Self {
            host: Arc::default(),
            media: Arc::default(),
            lock: Arc::default(),
            dir,
            seed: 7,
        }
    }

    /// Data directory without any video folder
    pub fn without_videos() -> Self {
        Self {
            host: Arc::default(),
            media: Arc::default(),
            lock: Arc::default(),
            dir: tempfile::tempdir().unwrap(),
            seed: 7,
        }
    }

    pub fn parts(&self) -> SessionParts {
        SessionParts::new(
            Box::new(FakeHost::new(self.host.clone())),
            Box::new(FakeMedia::new(self.media.clone())),
            Box::new(FakeLock {
                log: self.lock.clone(),
            }),
            VideoDirs::under(self.dir.path()),
        )
        .with_rng(Box::new(StdRng::seed_from_u64(self.seed)))
    }

    pub fn start(&self, settings: Settings) -> LockSession {
        LockSession::start(settings, self.parts())
    }

    /// Write a file into the data directory and return its path
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn main_player(&self) -> PlayerRecord {
        self.media.lock().players[0].clone()
    }

    pub fn popup_players(&self) -> Vec<PlayerRecord> {
        self.media.lock().players.iter().skip(1).cloned().collect()
    }
}

pub fn fullscreen() -> Settings {
    Settings::default()
}

pub fn popup() -> Settings {
    Settings {
        mode: Mode::Popup,
        ..Settings::default()
    }
}
