// Library interface for vidlock
// The binary and the integration tests drive lock sessions through these modules

pub mod capability;
pub mod config;
pub mod constants;
pub mod controls;
pub mod event_queue;
pub mod host;
pub mod hotkeys;
pub mod input_lock;
pub mod library;
pub mod logging;
pub mod overlay;
pub mod playback;
pub mod runner;
pub mod session;
pub mod settings;

pub use session::{EndReason, HostCommand, LockSession, SessionParts, SessionState};
pub use settings::{Mode, Settings, TimerPosition};
