//! Playback Driver adapter
//!
//! The media engine is a capability boundary: the session drives one
//! [`MediaPlayer`] for the main surface and creates one more per live video
//! pop-up through a [`MediaBackend`].

pub mod headless;

use anyhow::Result;
use std::path::Path;

/// What a player does when its media reaches end-of-stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndAction {
    /// Stop and report "not playing"
    #[default]
    Stop,
    /// Restart from position 0
    Loop,
}

pub trait MediaPlayer {
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn set_rate(&mut self, factor: f32);
    /// Volume in percent, 0-100
    fn set_volume(&mut self, percent: u8);
    /// Duration of the loaded media, None while unknown
    fn duration_millis(&self) -> Option<u64>;
    fn seek(&mut self, millis: u64);
    /// Register the reaction to end-of-stream
    fn on_end_reached(&mut self, action: EndAction);
    /// Free engine resources; the player must not be used afterwards
    fn release(&mut self);
}

/// Factory for players
pub trait MediaBackend {
    fn create_player(&mut self) -> Result<Box<dyn MediaPlayer>>;
}
