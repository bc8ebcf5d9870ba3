mod common;

use common::{fullscreen, popup, Harness};
use std::path::PathBuf;
use std::time::Duration;
use vidlock::playback::EndAction;
use vidlock::{EndReason, HostCommand, Mode, Settings, TimerPosition};

const VIDEOS: &[&str] = &["a.mp4", "b.mkv", "c.avi"];

fn with_timer(mut settings: Settings, seconds: u64) -> Settings {
    settings.timer_seconds = seconds;
    settings
}

#[test]
fn test_start_locks_input_and_plays() {
    let harness = Harness::with_videos(VIDEOS);
    let session = harness.start(fullscreen());

    assert!(session.state().input_locked);
    assert_eq!(harness.lock.lock().engaged, 1);
    assert_eq!(session.library().len(), 3);
    assert!(session.current_video().is_some());

    let main = harness.main_player();
    assert_eq!(main.loaded.len(), 1);
    assert!(main.playing);
    assert_eq!(main.rate, Some(1.0));
    assert_eq!(main.volume, Some(100));

    let host = harness.host.lock();
    assert_eq!(host.chrome.len(), 1);
    assert_eq!(host.chrome[0].0, Mode::Fullscreen);
    assert!(host.errors.is_empty());
}

#[test]
fn test_password_must_match_exactly() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(fullscreen());

    for wrong in ["Password", "password ", "", "passw0rd"] {
        assert!(!session.on_password_submit(wrong));
        assert!(!session.is_ended());
    }
    {
        let host = harness.host.lock();
        assert_eq!(host.password_clears, 4);
        assert_eq!(host.error_titles(), vec!["Incorrect Password"; 4]);
        assert!(host.ended.is_empty());
    }

    assert!(session.on_password_submit("password"));
    assert_eq!(session.end_reason(), Some(EndReason::PasswordMatch));
    assert_eq!(harness.host.lock().ended, vec![EndReason::PasswordMatch]);
}

#[test]
fn test_no_lockout_after_many_attempts() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(fullscreen());

    for _ in 0..50 {
        session.handle(HostCommand::PasswordSubmit("nope".to_string()));
    }
    session.handle(HostCommand::PasswordSubmit("password".to_string()));
    assert_eq!(session.end_reason(), Some(EndReason::PasswordMatch));
}

#[test]
fn test_cancel_always_ends_session() {
    for mode in [Mode::Fullscreen, Mode::Popup] {
        for show_password_entry in [true, false] {
            for timer_seconds in [0, 30] {
                let harness = Harness::with_videos(VIDEOS);
                let settings = Settings {
                    mode,
                    show_password_entry,
                    timer_seconds,
                    ..Settings::default()
                };
                let mut session = harness.start(settings);
                session.advance(Duration::from_millis(1500));

                session.on_cancel_key();
                assert_eq!(session.end_reason(), Some(EndReason::UserCancel));
                assert_eq!(harness.host.lock().ended, vec![EndReason::UserCancel]);
            }
        }
    }
}

#[test]
fn test_timer_counts_down_to_expiry() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(with_timer(fullscreen(), 5));

    assert!(session.state().timer_running);
    assert_eq!(session.state().time_remaining, 5);

    for k in 1..5 {
        session.advance(Duration::from_secs(1));
        assert_eq!(session.state().time_remaining, 5 - k);
        assert!(!session.is_ended());
    }

    session.advance(Duration::from_secs(1));
    assert_eq!(session.end_reason(), Some(EndReason::TimerExpired));
    assert!(!session.state().timer_running);

    let host = harness.host.lock();
    let texts: Vec<&str> = host.timer_texts.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(texts, vec!["00:05", "00:04", "00:03", "00:02", "00:01", "00:00"]);
    assert!(host
        .timer_texts
        .iter()
        .all(|(_, position)| *position == TimerPosition::TopRight));
}

#[test]
fn test_exactly_n_direct_ticks_expire_timer() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(with_timer(fullscreen(), 3));

    session.on_timer_tick();
    session.on_timer_tick();
    assert_eq!(session.state().time_remaining, 1);
    assert!(!session.is_ended());

    // Direct ticks replace the armed one instead of adding another
    session.advance(Duration::from_millis(999));
    assert_eq!(session.state().time_remaining, 1);

    session.on_timer_tick();
    assert_eq!(session.end_reason(), Some(EndReason::TimerExpired));
}

#[test]
fn test_long_timer_display() {
    let harness = Harness::with_videos(VIDEOS);
    let mut settings = with_timer(fullscreen(), 125);
    settings.timer_position = TimerPosition::BottomLeft;
    let _session = harness.start(settings);

    let host = harness.host.lock();
    assert_eq!(
        host.timer_texts,
        vec![("02:05".to_string(), TimerPosition::BottomLeft)]
    );
}

#[test]
fn test_no_timer_never_expires() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(fullscreen());

    session.advance(Duration::from_secs(600));
    assert!(!session.is_ended());
    assert!(!session.state().timer_running);
    assert!(harness.host.lock().timer_texts.is_empty());
}

#[test]
fn test_end_session_is_idempotent() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(with_timer(fullscreen(), 10));

    session.end_session(EndReason::UserCancel);
    session.end_session(EndReason::PasswordMatch);
    session.on_cancel_key();
    assert!(!session.on_password_submit("password"));

    assert_eq!(session.end_reason(), Some(EndReason::UserCancel));
    assert_eq!(harness.lock.lock().disengaged, 1);
    assert!(!session.state().input_locked);

    let main = harness.main_player();
    assert_eq!(main.stops, 1);
    assert_eq!(main.releases, 1);
    assert_eq!(harness.host.lock().ended, vec![EndReason::UserCancel]);
}

#[test]
fn test_nothing_fires_after_end() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(with_timer(fullscreen(), 10));

    session.on_cancel_key();
    assert_eq!(session.next_deadline(), None);

    let texts_before = harness.host.lock().timer_texts.len();
    session.advance(Duration::from_secs(60));
    assert_eq!(harness.host.lock().timer_texts.len(), texts_before);
    assert_eq!(harness.main_player().loaded.len(), 1);
}

#[test]
fn test_playback_poll_advances_finished_video() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(fullscreen());

    session.advance(Duration::from_secs(3));
    assert_eq!(harness.main_player().loaded.len(), 1, "Still playing");

    harness.media.lock().players[0].playing = false;
    session.advance(Duration::from_secs(1));

    let main = harness.main_player();
    assert_eq!(main.loaded.len(), 2);
    assert!(main.playing);
}

#[test]
fn test_skip_rate_and_volume() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(fullscreen());

    session.handle(HostCommand::Skip);
    assert_eq!(harness.main_player().loaded.len(), 2);

    session.handle(HostCommand::Rate(5.0));
    assert_eq!(session.rate(), 2.0);
    session.handle(HostCommand::Rate(0.1));
    assert_eq!(session.rate(), 0.5);
    session.handle(HostCommand::Rate(1.25));
    assert_eq!(harness.main_player().rate, Some(1.25));

    session.handle(HostCommand::Volume(150));
    assert_eq!(session.volume(), 100);
    session.handle(HostCommand::Volume(-5));
    assert_eq!(harness.main_player().volume, Some(0));

    // Rate and volume carry over to the next video
    session.handle(HostCommand::Skip);
    let main = harness.main_player();
    assert_eq!(main.rate, Some(1.25));
    assert_eq!(main.volume, Some(0));
}

#[test]
fn test_screensaver_resumes_only_if_playing() {
    let harness = Harness::with_videos(VIDEOS);
    let image = harness.write_file("saver.png", "");
    let mut settings = fullscreen();
    settings.screensaver_image = Some(image);
    let mut session = harness.start(settings);

    // playing -> on -> off -> playing
    session.toggle_screensaver();
    assert!(session.state().screensaver_active);
    assert!(session.state().playback_was_active_before_screensaver);
    assert!(!harness.main_player().playing);
    session.toggle_screensaver();
    assert!(!session.state().screensaver_active);
    assert!(harness.main_player().playing);

    // paused -> on -> off -> still paused
    harness.media.lock().players[0].playing = false;
    let plays = harness.main_player().plays;
    session.toggle_screensaver();
    assert!(!session.state().playback_was_active_before_screensaver);
    session.toggle_screensaver();
    assert!(!harness.main_player().playing);
    assert_eq!(harness.main_player().plays, plays);

    let host = harness.host.lock();
    assert_eq!(host.screensaver_shown, 2);
    assert_eq!(host.screensaver_hidden, 2);
}

#[test]
fn test_screensaver_holds_playback_poll() {
    let harness = Harness::with_videos(VIDEOS);
    let image = harness.write_file("saver.png", "");
    let mut settings = fullscreen();
    settings.screensaver_image = Some(image);
    let mut session = harness.start(settings);

    session.handle(HostCommand::ToggleScreensaver);
    session.advance(Duration::from_secs(10));
    assert_eq!(harness.main_player().loaded.len(), 1, "Paused video kept");

    session.handle(HostCommand::ToggleScreensaver);
    assert!(harness.main_player().playing);
}

#[test]
fn test_screensaver_off_shows_controls_without_hiding() {
    let harness = Harness::with_videos(VIDEOS);
    let image = harness.write_file("saver.png", "");
    let mut settings = fullscreen();
    settings.screensaver_image = Some(image);
    let mut session = harness.start(settings);

    session.advance(Duration::from_secs(1));
    assert!(!session.state().controls_visible);

    session.toggle_screensaver();
    session.toggle_screensaver();
    assert!(session.state().controls_visible);

    session.advance(Duration::from_secs(10));
    assert!(session.state().controls_visible);
    assert_eq!(harness.host.lock().controls, vec![true, false, true]);
}

#[test]
fn test_screensaver_failure_leaves_state_unchanged() {
    let harness = Harness::with_videos(VIDEOS);
    harness.host.lock().fail_screensaver = true;
    let mut settings = fullscreen();
    settings.screensaver_image = Some(PathBuf::from("/missing/saver.png"));
    let mut session = harness.start(settings);

    session.toggle_screensaver();
    assert!(!session.state().screensaver_active);
    assert!(harness.main_player().playing);
    assert_eq!(harness.main_player().pauses, 0);
    assert_eq!(harness.host.lock().error_titles(), vec!["Screensaver Error"]);
}

#[test]
fn test_screensaver_unavailable_in_popup_mode() {
    let harness = Harness::with_videos(VIDEOS);
    let image = harness.write_file("saver.png", "");
    let mut settings = popup();
    settings.screensaver_image = Some(image);
    let mut session = harness.start(settings);

    session.toggle_screensaver();
    assert!(!session.state().screensaver_active);
    assert_eq!(harness.host.lock().screensaver_shown, 0);
}

#[test]
fn test_screensaver_without_image_is_noop() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(fullscreen());

    session.toggle_screensaver();
    assert!(!session.state().screensaver_active);
    assert!(harness.main_player().playing);
}

#[test]
fn test_end_hides_active_screensaver() {
    let harness = Harness::with_videos(VIDEOS);
    let image = harness.write_file("saver.png", "");
    let mut settings = fullscreen();
    settings.screensaver_image = Some(image);
    let mut session = harness.start(settings);

    session.toggle_screensaver();
    session.on_cancel_key();
    assert_eq!(harness.host.lock().screensaver_hidden, 1);
    assert!(!session.state().screensaver_active);
}

#[test]
fn test_controls_visibility_flow() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(fullscreen());
    assert!(session.state().controls_visible);

    session.advance(Duration::from_millis(100));
    assert!(!session.state().controls_visible);

    session.handle(HostCommand::NavEnter);
    assert!(session.state().controls_visible);
    session.handle(HostCommand::NavLeave);
    session.advance(Duration::from_millis(1500));
    session.handle(HostCommand::PointerMotion);
    session.advance(Duration::from_secs(5));
    assert!(session.state().controls_visible, "Motion cancelled the hide");

    session.handle(HostCommand::NavLeave);
    session.advance(Duration::from_secs(2));
    assert!(!session.state().controls_visible);

    session.handle(HostCommand::RevealControls);
    session.handle(HostCommand::TimerHover);
    session.handle(HostCommand::NavLeave);
    session.advance(Duration::from_millis(4999));
    assert!(session.state().controls_visible);
    session.advance(Duration::from_millis(1));
    assert!(!session.state().controls_visible);

    assert_eq!(
        harness.host.lock().controls,
        vec![true, false, true, false, true, false]
    );
}

#[test]
fn test_popup_mode_has_no_controls() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(popup());

    session.handle(HostCommand::RevealControls);
    session.handle(HostCommand::PointerMotion);
    assert!(!session.state().controls_visible);
    assert!(harness.host.lock().controls.is_empty());
}

#[test]
fn test_missing_video_folder_degrades() {
    let harness = Harness::without_videos();
    let mut session = harness.start(with_timer(fullscreen(), 2));

    assert!(session.library().is_empty());
    assert!(session.current_video().is_none());
    assert!(harness.media.lock().players.is_empty());
    assert_eq!(harness.host.lock().error_titles(), vec!["Video Error"]);

    session.advance(Duration::from_secs(2));
    assert_eq!(session.end_reason(), Some(EndReason::TimerExpired));
}

#[test]
fn test_empty_video_folder_degrades() {
    let harness = Harness::with_videos(&["readme.txt"]);
    let mut session = harness.start(fullscreen());

    assert!(session.library().is_empty());
    let host_errors = harness.host.lock().errors.clone();
    assert_eq!(host_errors.len(), 1);
    assert!(host_errors[0].1.contains("No videos found"));

    assert!(session.on_password_submit("password"));
}

#[test]
fn test_custom_folder_selected_by_settings() {
    let harness = Harness::with_videos(VIDEOS);
    let custom = harness.dir.path().join("custom_videos");
    std::fs::create_dir_all(&custom).unwrap();
    std::fs::write(custom.join("mine.mp4"), b"").unwrap();

    let mut settings = fullscreen();
    settings.use_default_videos = false;
    let session = harness.start(settings);

    assert_eq!(session.library().len(), 1);
    assert_eq!(session.current_video(), Some(custom.join("mine.mp4").as_path()));
}

#[test]
fn test_main_player_creation_failure_is_reported() {
    let harness = Harness::with_videos(VIDEOS);
    harness.media.lock().fail_create = true;
    let mut session = harness.start(fullscreen());

    assert!(session.current_video().is_none());
    assert_eq!(harness.host.lock().error_titles(), vec!["Playback Error"]);
    session.on_cancel_key();
    assert!(session.is_ended());
}

#[test]
fn test_repeated_load_failures_raise_one_dialog() {
    let harness = Harness::with_videos(VIDEOS);
    harness.media.lock().fail_load = true;
    let mut session = harness.start(fullscreen());

    session.advance(Duration::from_secs(10));
    assert!(session.current_video().is_none());
    assert_eq!(harness.host.lock().error_titles(), vec!["Playback Error"]);

    // Recovery ends the streak, so the next failure is raised again
    harness.media.lock().fail_load = false;
    session.advance(Duration::from_secs(1));
    assert!(session.current_video().is_some());

    harness.media.lock().fail_load = true;
    session.on_skip_requested();
    session.advance(Duration::from_secs(5));
    assert_eq!(
        harness.host.lock().error_titles(),
        vec!["Playback Error", "Playback Error"]
    );
}

#[test]
fn test_repeated_create_failures_raise_one_dialog() {
    let harness = Harness::with_videos(VIDEOS);
    harness.media.lock().fail_create = true;
    let mut session = harness.start(fullscreen());

    session.advance(Duration::from_secs(10));
    assert_eq!(harness.host.lock().error_titles(), vec!["Playback Error"]);
    assert!(!session.is_ended());
}

#[test]
fn test_input_lock_failure_is_not_fatal() {
    let harness = Harness::with_videos(VIDEOS);
    harness.lock.lock().fail = true;
    let mut session = harness.start(fullscreen());

    assert!(!session.state().input_locked);
    assert_eq!(harness.host.lock().error_titles(), vec!["Input Lock Error"]);
    assert!(harness.main_player().playing);

    session.on_cancel_key();
    assert_eq!(harness.lock.lock().disengaged, 0);
}

#[test]
fn test_popup_session_shows_backdrop_and_popups() {
    let harness = Harness::with_videos(VIDEOS);
    let texts = harness.write_file("phrases.txt", "hello\n\n  world  \n");
    let mut settings = popup();
    settings.popup_text_file = Some(texts);
    let mut session = harness.start(settings);

    assert_eq!(harness.host.lock().chrome[0].0, Mode::Popup);
    assert_eq!(harness.host.lock().backdrop_shown, 1);
    assert_eq!(harness.main_player().end_action, EndAction::Stop);

    session.advance(Duration::from_secs(3));
    {
        let host = harness.host.lock();
        assert!(!host.text_popups.is_empty());
        assert!(!host.video_popups.is_empty());
        assert!(host
            .text_popups
            .iter()
            .all(|(text, _, _)| text == "hello" || text == "world"));
    }
    assert!(session.overlay().live_count() > 0);

    let popup_players = harness.popup_players();
    assert!(!popup_players.is_empty());
    assert!(popup_players.iter().all(|p| p.end_action == EndAction::Loop));

    session.on_cancel_key();
    assert_eq!(session.overlay().live_count(), 0);
    assert_eq!(session.overlay().pending_rearms(), 0);

    let host = harness.host.lock();
    assert!(host.surfaces.is_empty(), "Every pop-up surface closed");
    assert_eq!(host.backdrop_hidden, 1);
    drop(host);

    for player in harness.popup_players() {
        assert_eq!(player.releases, 1);
    }
    assert_eq!(harness.main_player().releases, 1);
}

#[test]
fn test_popup_text_file_error_is_reported() {
    let harness = Harness::with_videos(VIDEOS);
    let mut settings = popup();
    settings.popup_text_file = Some(PathBuf::from("/missing/phrases.txt"));
    let mut session = harness.start(settings);

    assert_eq!(harness.host.lock().error_titles(), vec!["Pop-up Error"]);

    session.advance(Duration::from_secs(2));
    let host = harness.host.lock();
    assert!(host.text_popups.is_empty());
    assert!(!host.video_popups.is_empty(), "Video pop-ups unaffected");
}

#[test]
fn test_popup_background_follows_setting() {
    let harness = Harness::with_videos(VIDEOS);
    let mut settings = popup();
    settings.show_popup_background = false;
    let mut session = harness.start(settings);
    session.advance(Duration::from_secs(1));

    let host = harness.host.lock();
    assert!(!host.video_popups.is_empty());
    assert!(host.video_popups.iter().all(|(_, bg)| bg.is_none()));
}

#[test]
fn test_popup_mode_does_not_loop_main_video() {
    let harness = Harness::with_videos(VIDEOS);
    let mut session = harness.start(popup());

    harness.media.lock().players[0].playing = false;
    session.advance(Duration::from_secs(5));
    assert_eq!(harness.main_player().loaded.len(), 1);
}
