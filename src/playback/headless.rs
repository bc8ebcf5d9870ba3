use super::{EndAction, MediaBackend, MediaPlayer};
use crate::constants::HEADLESS_CLIP_SECONDS;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Media backend without a decoder
///
/// Every clip is assumed to last a fixed length; players advance along a
/// monotonic clock so end-of-stream, looping and seeking behave like a real
/// engine.
pub struct HeadlessMedia {
    clip: Duration,
}

impl HeadlessMedia {
    pub fn new(clip_seconds: Option<u64>) -> Self {
        Self {
            clip: Duration::from_secs(clip_seconds.unwrap_or(HEADLESS_CLIP_SECONDS).max(1)),
        }
    }
}

impl MediaBackend for HeadlessMedia {
    fn create_player(&mut self) -> Result<Box<dyn MediaPlayer>> {
        Ok(Box::new(HeadlessPlayer::new(self.clip)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

pub struct HeadlessPlayer {
    clip: Duration,
    media: Option<PathBuf>,
    state: PlayerState,
    /// Media position when `resumed_at` was taken
    position: Duration,
    resumed_at: Option<Instant>,
    rate: f32,
    volume: u8,
    end_action: EndAction,
    released: bool,
}

impl HeadlessPlayer {
    pub fn new(clip: Duration) -> Self {
        Self {
            clip,
            media: None,
            state: PlayerState::Idle,
            position: Duration::ZERO,
            resumed_at: None,
            rate: 1.0,
            volume: 100,
            end_action: EndAction::Stop,
            released: false,
        }
    }

    /// Unwrapped position along the media since the last seek or resume
    fn raw_position(&self) -> Duration {
        match (self.state, self.resumed_at) {
            (PlayerState::Playing, Some(at)) => self.position + at.elapsed().mul_f32(self.rate),
            _ => self.position,
        }
    }

    pub fn position(&self) -> Duration {
        let raw = self.raw_position();
        match self.end_action {
            EndAction::Loop => Duration::from_nanos((raw.as_nanos() % self.clip.as_nanos()) as u64),
            EndAction::Stop => raw.min(self.clip),
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    fn checkpoint(&mut self) {
        self.position = self.position();
        self.resumed_at = Some(Instant::now());
    }
}

impl MediaPlayer for HeadlessPlayer {
    fn load(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            anyhow::bail!("Media not found: {}", path.display());
        }
        let canonical = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve media path: {}", path.display()))?;
        self.media = Some(canonical);
        self.state = PlayerState::Idle;
        self.position = Duration::ZERO;
        self.resumed_at = None;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.released {
            anyhow::bail!("Player already released");
        }
        let media = self.media.as_ref().context("No media loaded")?;
        let finished = self.raw_position() >= self.clip && self.end_action == EndAction::Stop;
        if self.state == PlayerState::Stopped || finished {
            self.position = Duration::ZERO;
        }
        debug!("Headless playback of {}", media.display());
        self.state = PlayerState::Playing;
        self.resumed_at = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.position = self.position();
            self.resumed_at = None;
            self.state = PlayerState::Paused;
        }
    }

    fn stop(&mut self) {
        self.state = PlayerState::Stopped;
        self.position = Duration::ZERO;
        self.resumed_at = None;
    }

    fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
            && (self.end_action == EndAction::Loop || self.raw_position() < self.clip)
    }

    fn set_rate(&mut self, factor: f32) {
        if self.state == PlayerState::Playing {
            self.checkpoint();
        }
        self.rate = factor;
    }

    fn set_volume(&mut self, percent: u8) {
        self.volume = percent.min(100);
    }

    fn duration_millis(&self) -> Option<u64> {
        self.media.as_ref().map(|_| self.clip.as_millis() as u64)
    }

    fn seek(&mut self, millis: u64) {
        let target = Duration::from_millis(millis);
        if target > self.clip {
            warn!("Seek to {}ms beyond end of media", millis);
        }
        self.position = target.min(self.clip);
        if self.state == PlayerState::Playing {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn on_end_reached(&mut self, action: EndAction) {
        self.end_action = action;
    }

    fn release(&mut self) {
        self.stop();
        self.media = None;
        self.released = true;
    }
}
