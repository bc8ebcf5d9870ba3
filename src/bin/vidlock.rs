// vidlock CLI - kiosk lock screen that plays videos until released
// This binary provides a terminal-based host with argument parsing

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use vidlock::constants::TIMER_MAX_SECONDS;
use vidlock::host::terminal::TerminalHost;
use vidlock::hotkeys::HotkeyManager;
use vidlock::input_lock::platform_lock;
use vidlock::library::VideoDirs;
use vidlock::playback::headless::HeadlessMedia;
use vidlock::{config, logging, runner, HostCommand, LockSession, Mode, SessionParts, Settings};

/// Kiosk lock screen that plays videos until released
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Kiosk lock screen that plays videos until a password, timer, or escape key releases it",
    long_about = "Kiosk lock screen that plays videos until a password, timer, or escape key releases it.

Modes:
 - fullscreen: one video at a time, advancing to a random next video when it ends
 - popup: floating video and text pop-ups over a coloured backdrop

SETUP:
  Write a settings file interactively:
    vidlock --setup

  Settings are stored as key=value lines at:
    ~/Library/Application Support/vidlock/config.txt (macOS)
    ~/.config/vidlock/config.txt (Linux)

  Videos are read from the videos/ or custom_videos/ folder in the data directory.

HOTKEYS:
  Escape                    End the session
  F1                        Toggle the screensaver (fullscreen only)
  `                         Reveal the playback controls for 5 seconds

TERMINAL:
  Type the password and press Enter to unlock. Typing is not echoed when
  stdin is a terminal. Commands:
  :skip  :rate <0.5-2.0>  :volume <0-100>  :screensaver  :reveal  :cancel"
)]
struct Args {
    /// Run interactive setup to write the settings file
    #[arg(long)]
    setup: bool,

    /// Settings file to use instead of the standard location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory containing the videos/ and custom_videos/ folders
    #[arg(long, value_name = "DIR")]
    videos: Option<PathBuf>,

    /// Countdown in seconds, 0 disables (0-86400, overrides settings and environment)
    /// NOTE: Keep range in sync with TIMER_MAX_SECONDS
    #[arg(long)]
    timer: Option<u64>,

    /// Session mode: fullscreen or popup (overrides settings and environment)
    #[arg(long)]
    mode: Option<String>,

    /// Append log output to this file instead of the default log file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Clip length in seconds assumed by the headless player
    #[arg(long)]
    clip_seconds: Option<u64>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

/// Helper function to prompt for a line with a default value
fn prompt_line(prompt: &str, default: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input.to_string())
    }
}

/// Helper function to prompt for a number with a default value
fn prompt_number<T>(prompt: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + ToString,
{
    let input = prompt_line(prompt, &default.to_string())?;
    input
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("Invalid number: {}", input))
}

fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    let input = prompt_line(&format!("{} [{}]: ", prompt, hint), "")?;
    Ok(match input.to_ascii_lowercase().as_str() {
        "" => default,
        answer => answer.starts_with('y'),
    })
}

/// Run interactive setup to write the settings file
fn run_setup(config_path: &Path) -> Result<()> {
    println!("vidlock Setup");
    println!("=============\n");

    let mut settings = Settings::load_from_path(config_path).unwrap_or_default();

    // Prompt for password (non-echoing)
    let password = rpassword::prompt_password("Enter unlock password: ")
        .context("Failed to read password")?;

    if password.is_empty() {
        anyhow::bail!("Error: Password cannot be empty");
    }

    let confirm = rpassword::prompt_password("Confirm password: ")
        .context("Failed to read confirmation")?;

    if password != confirm {
        anyhow::bail!("Error: Passwords do not match");
    }
    settings.password = password;

    settings.timer_seconds = prompt_number(
        "Countdown in seconds, 0 for none (default: 0): ",
        0u64,
    )?;
    if settings.timer_seconds > TIMER_MAX_SECONDS {
        anyhow::bail!("Error: Countdown must be at most {} seconds", TIMER_MAX_SECONDS);
    }

    let mode = prompt_line("Mode, fullscreen or popup (default: fullscreen): ", "fullscreen")?;
    settings.mode = mode.parse::<Mode>()?;

    settings.background_color = prompt_line(
        &format!("Background colour (default: {}): ", settings.background_color),
        &settings.background_color,
    )?;

    if settings.mode == Mode::Popup {
        settings.popup_interval_secs = prompt_number(
            &format!("Seconds between video pop-ups (default: {}): ", settings.popup_interval_secs),
            settings.popup_interval_secs,
        )?;
        settings.popup_duration_secs = prompt_number(
            &format!("Seconds each pop-up stays (default: {}): ", settings.popup_duration_secs),
            settings.popup_duration_secs,
        )?;
        settings.popup_video_size = prompt_number(
            &format!("Pop-up size 1-10 (default: {}): ", settings.popup_video_size),
            settings.popup_video_size,
        )?;
    }

    settings.use_default_videos = prompt_yes_no("Use the bundled video folder?", settings.use_default_videos)?;
    settings.show_password_entry = prompt_yes_no(
        "Show the password entry?",
        settings.timer_seconds > 0,
    )?;

    settings.validate().context("Invalid settings")?;
    settings
        .save_to_path(config_path)
        .context("Failed to save settings")?;

    println!("\nSettings saved to: {}", config_path.display());
    println!("Setup complete!");
    println!("\nYou can now run 'vidlock' to start a session.");

    Ok(())
}

/// Confirm before taking over the screen
fn confirm_start(settings: &Settings) -> Result<bool> {
    println!("WARNING: This program will play videos continuously until you type the correct");
    println!("password, press the ESC key, or the timer runs out.");
    if settings.timer_seconds > 0 {
        println!("Timer: {} seconds", settings.timer_seconds);
    }
    prompt_yes_no("Do you want to continue?", false)
}

/// Apply overrides with precedence: CLI arg > env var > settings file
fn apply_overrides(settings: &mut Settings, args: &Args) {
    let timer = match args.timer {
        Some(seconds) if seconds <= TIMER_MAX_SECONDS => {
            info!("Countdown set via --timer argument: {} seconds", seconds);
            Some(seconds)
        }
        Some(seconds) => {
            warn!(
                "Invalid --timer value: {} (must be 0-{} seconds). Using environment variable or settings file.",
                seconds, TIMER_MAX_SECONDS
            );
            config::parse_timer_override()
        }
        None => config::parse_timer_override(),
    };
    if let Some(seconds) = timer {
        settings.timer_seconds = seconds;
    }

    let mode = match args.mode.as_deref().map(str::parse::<Mode>) {
        Some(Ok(mode)) => {
            info!("Mode set via --mode argument: {}", mode);
            Some(mode)
        }
        Some(Err(e)) => {
            warn!("Invalid --mode value: {}. Using environment variable or settings file.", e);
            config::parse_mode_override()
        }
        None => config::parse_mode_override(),
    };
    if let Some(mode) = mode {
        settings.mode = mode;
    }
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Settings::config_path()?,
    };

    // Handle setup command
    if args.setup {
        return run_setup(&config_path);
    }

    // Initialize logger
    let log_file = args.log_file.clone().or_else(|| logging::default_log_path().ok());
    logging::init(log_file.as_deref())?;

    info!("Starting vidlock");

    let mut settings = match Settings::load_from_path(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Failed to load settings: {:#}. Using defaults.", e);
            Settings::default()
        }
    };
    logging::apply_level(settings.log_level);
    apply_overrides(&mut settings, &args);

    if !args.yes && !confirm_start(&settings)? {
        info!("User chose not to continue.");
        return Ok(());
    }

    let video_dirs = match &args.videos {
        Some(dir) => VideoDirs::under(dir),
        None => VideoDirs::standard()?,
    };

    let (sender, receiver) = mpsc::channel::<HostCommand>();
    runner::spawn_stdin_reader(sender.clone())?;

    // Hotkeys are optional: the terminal still accepts :cancel
    let _hotkeys = match HotkeyManager::new().and_then(|mut manager| {
        manager.register_all()?;
        manager.start_listener(sender)?;
        Ok(manager)
    }) {
        Ok(manager) => Some(manager),
        Err(e) => {
            error!("Global hotkeys unavailable: {:#}", e);
            None
        }
    };

    let parts = SessionParts::new(
        Box::new(TerminalHost::new(None)),
        Box::new(HeadlessMedia::new(args.clip_seconds)),
        platform_lock(),
        video_dirs,
    );
    let mut session = LockSession::start(settings, parts);

    info!("vidlock is running - type the password and press Enter to unlock");
    let reason = runner::run(&mut session, &receiver);

    info!("Session ended ({}), exiting", reason);
    Ok(())
}
