use super::InputLock;
use anyhow::{anyhow, Context, Result};
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{CGEvent, CGEventFlags, CGEventType};
use core_graphics::sys::{CGEventRef, CGEventTapRef};
use foreign_types::ForeignType;
use log::{debug, info};
use parking_lot::Mutex;
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

type CFRunLoopSourceRef = *mut c_void;
type CFAllocatorRef = *mut c_void;
type CFMachPortRef = *mut c_void;
type CFIndex = i64;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: unsafe extern "C" fn(
            proxy: CGEventTapRef,
            event_type: u32,
            event: CGEventRef,
            user_info: *mut c_void,
        ) -> CGEventRef,
        user_info: *mut c_void,
    ) -> CGEventTapRef;

    fn CGEventTapEnable(tap: CGEventTapRef, enable: bool);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: CFAllocatorRef,
        port: CFMachPortRef,
        order: CFIndex,
    ) -> CFRunLoopSourceRef;
}

#[allow(non_upper_case_globals)]
const kCGSessionEventTap: u32 = 1;
#[allow(non_upper_case_globals)]
const kCGHeadInsertEventTap: u32 = 0;
#[allow(non_upper_case_globals)]
const kCGEventTapOptionDefault: u32 = 0;

/// Shared between the lock and the tap callback
#[derive(Default)]
struct TapState {
    engaged: bool,
    swallowed: u64,
}

/// CoreGraphics event tap swallowing Command shortcuts while engaged
///
/// The tap lives on its own run-loop thread for the life of the process and
/// passes everything through while disengaged. Plain keys and the pointer
/// still reach the session window so the password can be typed.
pub struct EventTapLock {
    state: Arc<Mutex<TapState>>,
    started: bool,
}

impl EventTapLock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TapState::default())),
            started: false,
        }
    }

    fn start_tap_thread(&mut self) -> Result<()> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let state = self.state.clone();

        thread::Builder::new()
            .name("input-lock-tap".to_string())
            .spawn(move || {
                let state_ptr = Box::into_raw(Box::new(state)) as *mut c_void;
                let event_mask: u64 = (1 << CGEventType::KeyDown as u64)
                    | (1 << CGEventType::KeyUp as u64)
                    | (1 << CGEventType::FlagsChanged as u64);

                unsafe {
                    let tap = CGEventTapCreate(
                        kCGSessionEventTap,
                        kCGHeadInsertEventTap,
                        kCGEventTapOptionDefault,
                        event_mask,
                        tap_callback,
                        state_ptr,
                    );

                    if tap.is_null() {
                        let _ = Box::from_raw(state_ptr as *mut Arc<Mutex<TapState>>);
                        let _ = ready_tx.send(Err(anyhow!(
                            "Failed to create event tap - accessibility permissions may not be granted"
                        )));
                        return;
                    }

                    use core_foundation::base::TCFType;
                    let source_ref =
                        CFMachPortCreateRunLoopSource(std::ptr::null_mut(), tap as CFMachPortRef, 0);
                    let source = core_foundation::runloop::CFRunLoopSource::wrap_under_create_rule(
                        source_ref as core_foundation::runloop::CFRunLoopSourceRef,
                    );
                    CFRunLoop::get_current().add_source(&source, kCFRunLoopCommonModes);
                    CGEventTapEnable(tap, true);
                }

                let _ = ready_tx.send(Ok(()));
                info!("Input lock event tap running");
                CFRunLoop::run_current();
            })
            .context("Failed to spawn event tap thread")?;

        ready_rx
            .recv()
            .context("Event tap thread exited before reporting")??;
        self.started = true;
        Ok(())
    }
}

impl Default for EventTapLock {
    fn default() -> Self {
        Self::new()
    }
}

impl InputLock for EventTapLock {
    fn engage(&mut self) -> Result<()> {
        if !self.started {
            self.start_tap_thread()?;
        }
        self.state.lock().engaged = true;
        Ok(())
    }

    fn disengage(&mut self) {
        let mut state = self.state.lock();
        state.engaged = false;
        debug!("Event tap disengaged after swallowing {} events", state.swallowed);
    }
}

unsafe extern "C" fn tap_callback(
    _proxy: CGEventTapRef,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    let state = &*(user_info as *const Arc<Mutex<TapState>>);
    let mut state = state.lock();
    if !state.engaged {
        return event;
    }

    let is_key = event_type == CGEventType::KeyDown as u32 || event_type == CGEventType::KeyUp as u32;
    if !is_key {
        return event;
    }

    // Borrowed from the system; must not be released here
    let cg_event = ManuallyDrop::new(CGEvent::from_ptr(event));
    if cg_event.get_flags().contains(CGEventFlags::CGEventFlagCommand) {
        state.swallowed += 1;
        if state.swallowed % 50 == 1 {
            info!("Blocked Command shortcut during lock session");
        }
        return std::ptr::null_mut();
    }

    event
}
