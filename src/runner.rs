//! Real-time driver for a lock session
//!
//! Maps wall-clock time onto the session's logical clock: the loop sleeps
//! until the next deferred callback is due or a host command arrives,
//! whichever comes first.
//!
//! On macOS the wait pumps the main thread's run loop, which is where global
//! hotkey events are delivered.

use crate::session::{EndReason, HostCommand, LockSession};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::{self, BufRead, IsTerminal};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest wait when nothing is scheduled
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// Drive `session` until it ends and return the reason
///
/// A closed command channel does not end the session; only the session's own
/// exits (password, cancel, timer) do.
pub fn run(session: &mut LockSession, commands: &Receiver<HostCommand>) -> EndReason {
    let started = Instant::now()
        .checked_sub(session.now())
        .unwrap_or_else(Instant::now);
    let mut connected = true;

    loop {
        session.advance_to(started.elapsed());
        if let Some(reason) = session.end_reason() {
            return reason;
        }

        let wait = session
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(started.elapsed()))
            .unwrap_or(IDLE_WAIT)
            .min(IDLE_WAIT);

        if !connected {
            thread::sleep(wait);
            continue;
        }

        match wait_for_command(commands, wait) {
            Ok(command) => {
                session.advance_to(started.elapsed());
                debug!("Host command: {:?}", redact(&command));
                session.handle(command);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Host command channel closed");
                connected = false;
            }
        }
    }
}

/// Wait up to `timeout` for the next host command
#[cfg(not(target_os = "macos"))]
pub fn wait_for_command(
    commands: &Receiver<HostCommand>,
    timeout: Duration,
) -> Result<HostCommand, RecvTimeoutError> {
    commands.recv_timeout(timeout)
}

/// Wait up to `timeout` for the next host command while running the main run loop
///
/// Terminal commands do not wake the run loop, so it runs in short slices and
/// the channel is checked between them.
#[cfg(target_os = "macos")]
pub fn wait_for_command(
    commands: &Receiver<HostCommand>,
    timeout: Duration,
) -> Result<HostCommand, RecvTimeoutError> {
    use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopRunResult};
    use std::sync::mpsc::TryRecvError;

    const RUN_LOOP_SLICE: Duration = Duration::from_millis(50);

    let deadline = Instant::now() + timeout;
    loop {
        match commands.try_recv() {
            Ok(command) => return Ok(command),
            Err(TryRecvError::Disconnected) => return Err(RecvTimeoutError::Disconnected),
            Err(TryRecvError::Empty) => {}
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RecvTimeoutError::Timeout);
        }
        let slice = remaining.min(RUN_LOOP_SLICE);
        let result = unsafe { CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, slice, true) };
        // A run loop with no sources returns at once
        if matches!(result, CFRunLoopRunResult::Finished) {
            thread::sleep(slice);
        }
    }
}

/// Keep typed passwords out of the log
fn redact(command: &HostCommand) -> HostCommand {
    match command {
        HostCommand::PasswordSubmit(_) => HostCommand::PasswordSubmit("***".to_string()),
        other => other.clone(),
    }
}

/// Interpret one line typed on the terminal
///
/// Lines starting with `:` are control commands; anything else is a password
/// attempt. Unknown or malformed commands yield None.
pub fn parse_command(line: &str) -> Option<HostCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(command) = line.strip_prefix(':') else {
        return Some(HostCommand::PasswordSubmit(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next()?;
    let arg = parts.next();
    let parsed = match (name, arg) {
        ("skip", None) => Some(HostCommand::Skip),
        ("cancel", None) => Some(HostCommand::Cancel),
        ("screensaver", None) => Some(HostCommand::ToggleScreensaver),
        ("reveal", None) => Some(HostCommand::RevealControls),
        ("rate", Some(value)) => value.parse().ok().map(HostCommand::Rate),
        ("volume", Some(value)) => value.parse().ok().map(HostCommand::Volume),
        _ => None,
    };

    if parsed.is_none() {
        warn!("Unknown command: ':{}'", command);
    }
    parsed
}

/// Forward terminal lines to the session as host commands
///
/// When stdin is a terminal, input is read without echo so typed passwords
/// stay off the screen.
pub fn spawn_stdin_reader(sender: Sender<HostCommand>) -> Result<JoinHandle<()>> {
    let hidden = io::stdin().is_terminal();
    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            loop {
                let line = match read_entry(hidden, &mut io::stdin().lock()) {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read terminal input: {}", e);
                        break;
                    }
                };
                if let Some(command) = parse_command(&line) {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
            }
            debug!("Terminal input closed");
        })
        .context("Failed to spawn terminal input thread")
}

/// One line of terminal input, None at end of input
fn read_entry(hidden: bool, input: &mut impl BufRead) -> io::Result<Option<String>> {
    if hidden {
        return match rpassword::read_password() {
            Ok(line) => Ok(Some(line)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        };
    }

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
