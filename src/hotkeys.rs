use crate::session::HostCommand;
use anyhow::{Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};
use log::{debug, info};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Key bindings of a lock session
#[derive(Debug, Clone, Copy)]
pub struct SessionHotkeys {
    cancel: HotKey,
    screensaver: HotKey,
    reveal: HotKey,
}

impl SessionHotkeys {
    /// Escape cancels, F1 toggles the screensaver, Backquote reveals the controls
    pub fn new() -> Self {
        Self {
            cancel: HotKey::new(None, Code::Escape),
            screensaver: HotKey::new(None, Code::F1),
            reveal: HotKey::new(None, Code::Backquote),
        }
    }

    pub fn all(&self) -> [HotKey; 3] {
        [self.cancel, self.screensaver, self.reveal]
    }

    /// Host command bound to a hotkey event id
    pub fn command_for(&self, event_id: u32) -> Option<HostCommand> {
        if event_id == self.cancel.id() {
            Some(HostCommand::Cancel)
        } else if event_id == self.screensaver.id() {
            Some(HostCommand::ToggleScreensaver)
        } else if event_id == self.reveal.id() {
            Some(HostCommand::RevealControls)
        } else {
            None
        }
    }
}

impl Default for SessionHotkeys {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    bindings: SessionHotkeys,
    registered: Vec<HotKey>,
}

impl HotkeyManager {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .context("Failed to create global hotkey manager")?;

        Ok(Self {
            manager,
            bindings: SessionHotkeys::new(),
            registered: Vec::new(),
        })
    }

    /// Register the cancel, screensaver and reveal hotkeys
    pub fn register_all(&mut self) -> Result<()> {
        for hotkey in self.bindings.all() {
            self.manager
                .register(hotkey)
                .with_context(|| format!("Failed to register hotkey {:?}", hotkey))?;
            self.registered.push(hotkey);
        }
        info!("Hotkeys registered: Escape (cancel), F1 (screensaver), ` (reveal controls)");
        Ok(())
    }

    /// Forward hotkey presses to the session as host commands
    pub fn start_listener(&self, sender: Sender<HostCommand>) -> Result<JoinHandle<()>> {
        let bindings = self.bindings;
        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                let receiver = GlobalHotKeyEvent::receiver();
                while let Ok(event) = receiver.recv() {
                    if event.state != HotKeyState::Pressed {
                        continue;
                    }
                    let Some(command) = bindings.command_for(event.id) else {
                        continue;
                    };
                    debug!("Hotkey triggered: {:?}", command);
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                debug!("Hotkey listener stopped");
            })
            .context("Failed to spawn hotkey listener thread")
    }

    pub fn unregister_all(&mut self) -> Result<()> {
        for hotkey in self.registered.drain(..) {
            self.manager.unregister(hotkey)?;
        }
        Ok(())
    }
}
