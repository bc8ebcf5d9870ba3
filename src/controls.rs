//! Controls-visibility state machine for fullscreen sessions
//!
//! `Visible` and `Hidden`, plus a forced flag set by the reveal key. Every
//! transition method returns `Some(visible)` when the host should be told.

use crate::constants::{CONTROLS_INITIAL_HIDE_MS, CONTROLS_LEAVE_HIDE_MS, CONTROLS_REVEAL_MS};
use crate::event_queue::{EventQueue, TaskToken};
use crate::session::SessionEvent;
use log::debug;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ControlsVisibility {
    visible: bool,
    forced: bool,
    hide_token: Option<TaskToken>,
}

impl ControlsVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn has_pending_hide(&self) -> bool {
        self.hide_token.is_some()
    }

    /// Start visible and hide shortly unless someone interacts
    pub fn start(&mut self, queue: &mut EventQueue<SessionEvent>) -> Option<bool> {
        self.schedule_hide(queue, Duration::from_millis(CONTROLS_INITIAL_HIDE_MS));
        self.set_visible(true)
    }

    /// Pointer motion over the video, entry into the navigation bar or the
    /// timer hover target
    ///
    /// Cancels a pending leave-hide, but never the reveal window.
    pub fn on_pointer_activity(&mut self, queue: &mut EventQueue<SessionEvent>) -> Option<bool> {
        if !self.forced {
            self.cancel_hide(queue);
        }
        self.set_visible(true)
    }

    /// Pointer left the navigation bar
    pub fn on_leave(&mut self, queue: &mut EventQueue<SessionEvent>) -> Option<bool> {
        if self.visible && !self.forced {
            self.schedule_hide(queue, Duration::from_millis(CONTROLS_LEAVE_HIDE_MS));
        }
        None
    }

    /// Reveal key: visible for a fixed window regardless of the pointer
    pub fn on_reveal(&mut self, queue: &mut EventQueue<SessionEvent>) -> Option<bool> {
        self.forced = true;
        self.schedule_hide(queue, Duration::from_millis(CONTROLS_REVEAL_MS));
        self.set_visible(true)
    }

    /// The scheduled hide fired
    pub fn on_hide_due(&mut self, token: TaskToken) -> Option<bool> {
        if self.hide_token != Some(token) {
            debug!("Ignoring stale controls hide");
            return None;
        }
        self.hide_token = None;
        self.forced = false;
        self.set_visible(false)
    }

    /// Drop any pending hide (session teardown)
    pub fn cancel_hide(&mut self, queue: &mut EventQueue<SessionEvent>) {
        if let Some(token) = self.hide_token.take() {
            queue.cancel(token);
        }
    }

    fn schedule_hide(&mut self, queue: &mut EventQueue<SessionEvent>, delay: Duration) {
        self.cancel_hide(queue);
        self.hide_token = Some(queue.schedule(delay, SessionEvent::HideControls));
    }

    fn set_visible(&mut self, visible: bool) -> Option<bool> {
        if self.visible == visible {
            return None;
        }
        self.visible = visible;
        debug!("Controls {}", if visible { "visible" } else { "hidden" });
        Some(visible)
    }
}
