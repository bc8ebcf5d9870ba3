//! Input Lock Guard
//!
//! Suppresses OS-level ways of escaping the session (app switching, quit
//! shortcuts) while a session runs. The platform mechanism sits behind the
//! [`InputLock`] trait; [`InputLockGuard`] makes acquire/release idempotent.

#[cfg(target_os = "macos")]
pub mod event_tap;

use crate::capability::Latch;
use anyhow::Result;
use log::{info, warn};

/// Platform mechanism for suppressing escape input
pub trait InputLock {
    fn engage(&mut self) -> Result<()>;
    fn disengage(&mut self);
}

/// Idempotent wrapper around an [`InputLock`]
pub struct InputLockGuard {
    lock: Box<dyn InputLock>,
    latch: Latch,
}

impl InputLockGuard {
    pub fn new(lock: Box<dyn InputLock>) -> Self {
        Self {
            lock,
            latch: Latch::new("input lock"),
        }
    }

    /// Engage suppression. A no-op when already acquired.
    pub fn acquire(&mut self) -> Result<()> {
        let lock = &mut self.lock;
        if self.latch.acquire_with(|| lock.engage())? {
            info!("Input locked");
        }
        Ok(())
    }

    /// Restore normal input. A no-op when already released.
    pub fn release(&mut self) {
        let lock = &mut self.lock;
        if self.latch.release_with(|| lock.disengage()) {
            info!("Input unlocked");
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.latch.is_held()
    }
}

/// Lock used where the platform offers no suppression mechanism
#[derive(Debug, Default)]
pub struct NoopInputLock;

impl InputLock for NoopInputLock {
    fn engage(&mut self) -> Result<()> {
        warn!("OS input suppression is not available on this platform");
        Ok(())
    }

    fn disengage(&mut self) {}
}

/// Best available lock for the current platform
pub fn platform_lock() -> Box<dyn InputLock> {
    #[cfg(target_os = "macos")]
    {
        Box::new(event_tap::EventTapLock::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(NoopInputLock)
    }
}
