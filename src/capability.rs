//! Boolean capabilities with idempotent acquire/release
//!
//! Input lock, screensaver and the pop-up backdrop are all on/off resources.
//! A [`Latch`] records which side of the switch we are on so the underlying
//! engage/disengage actions run at most once per transition.

use anyhow::Result;
use log::debug;

#[derive(Debug)]
pub struct Latch {
    name: &'static str,
    held: bool,
}

impl Latch {
    pub fn new(name: &'static str) -> Self {
        Self { name, held: false }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Run `engage` unless already held
    ///
    /// Returns Ok(true) on a fresh acquisition, Ok(false) if already held.
    /// If `engage` fails the latch stays released.
    pub fn acquire_with<F>(&mut self, engage: F) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.held {
            debug!("{} already acquired", self.name);
            return Ok(false);
        }
        engage()?;
        self.held = true;
        debug!("{} acquired", self.name);
        Ok(true)
    }

    /// Run `disengage` if held. Returns true if a release happened.
    pub fn release_with<F>(&mut self, disengage: F) -> bool
    where
        F: FnOnce(),
    {
        if !self.held {
            return false;
        }
        disengage();
        self.held = false;
        debug!("{} released", self.name);
        true
    }
}
