//! Integration tests for the Crickstream player core
//!
//! These tests drive the controller through the headless backends:
//! - Live edge tracking and session teardown
//! - Cast handoff, failure and retry
//! - Controls visibility and lock
//! - Degraded platform features
//! - Catalog and configuration loading

use anyhow::Result;
use crickstream::cast::{RemoteField, ADAPTIVE_CONTENT_TYPE};
use crickstream::engine::{EngineEvent, ManifestInfo, QualityLevel};
use crickstream::headless::{HeadlessElement, HeadlessEngines, HeadlessRig};
use crickstream::player::{Authority, KeyInput};
use crickstream::{
    Catalog, Config, MediaPlayerBuilder, PlayerCommand, PlayerEvent, StreamDescriptor, StreamKind,
};
use crickstream_integration_tests::{
    ladder_manifest, live_stream, PlayerRig, TestFixture, SAMPLE_CATALOG,
};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

const POLL: Duration = Duration::from_secs(2);

#[test]
fn test_behind_live_follows_the_edge() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    assert!(player.controller.snapshot().is_playing);

    player.rig.element.play_to(100.0);
    player.rig.engines.set_live_sync(Some(120.0));
    player.advance(POLL);

    let snapshot = player.controller.snapshot();
    assert!(snapshot.is_behind_live);
    assert!(snapshot.shows_jump_to_live());
    assert!(player
        .events()
        .contains(&PlayerEvent::BehindLiveChanged { behind: true }));

    player.rig.element.play_to(110.0);
    player.advance(POLL);
    assert!(!player.controller.snapshot().is_behind_live);

    Ok(())
}

#[test]
fn test_jump_to_live_seeks_to_sync_position() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.rig.element.play_to(30.0);
    player.rig.engines.set_live_sync(Some(95.0));
    player.advance(POLL);
    assert!(player.controller.snapshot().is_behind_live);

    player.controller.execute(PlayerCommand::JumpToLive)?;

    assert_eq!(player.rig.element.position(), 95.0);
    let snapshot = player.controller.snapshot();
    assert_eq!(snapshot.current_time, 95.0);
    assert!(!snapshot.is_behind_live);

    Ok(())
}

#[test]
fn test_live_edge_is_not_polled_while_paused() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.controller.execute(PlayerCommand::TogglePlayPause)?;
    assert!(!player.controller.snapshot().is_playing);

    player.rig.element.play_to(10.0);
    player.rig.engines.set_live_sync(Some(200.0));
    player.advance(POLL);

    assert!(!player.controller.snapshot().is_behind_live);
    Ok(())
}

#[test]
fn test_switching_streams_tears_down_previous_engine() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.load(live_stream(6))?;

    assert_eq!(player.rig.engines.created(), 2);
    assert_eq!(player.rig.engines.destroyed(), 1);
    assert_eq!(player.rig.engines.live_instances(), 1);

    // A late callback from the first engine must not touch the new session
    player.rig.engines.emit_from(
        0,
        EngineEvent::ManifestParsed(ManifestInfo {
            live: false,
            levels: vec![QualityLevel::new(426, 240, 400_000)],
            subtitle_tracks: Vec::new(),
        }),
    );
    player.rig.engines.emit_from(0, EngineEvent::Error {
        fatal: true,
        details: "networkError".to_string(),
    });
    player.controller.pump();

    let snapshot = player.controller.snapshot();
    assert_eq!(snapshot.stream_id, Some(6));
    assert_eq!(snapshot.quality_levels.len(), 3);
    assert!(snapshot.is_live);
    assert!(snapshot.fault.is_none());

    Ok(())
}

#[test]
fn test_fatal_engine_error_shows_static_message() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.rig.engines.emit(EngineEvent::Error {
        fatal: true,
        details: "manifestLoadError".to_string(),
    });
    player.controller.pump();

    let snapshot = player.controller.snapshot();
    assert_eq!(
        snapshot.fault.as_deref(),
        Some("This stream is currently unavailable.")
    );
    assert!(!snapshot.is_playing);
    assert_eq!(player.rig.engines.live_instances(), 0);

    // Commands are no-ops once the session has failed
    player.controller.execute(PlayerCommand::TogglePlayPause)?;
    assert!(player.rig.element.paused());

    Ok(())
}

#[test]
fn test_unsupported_engine_disables_player() -> Result<()> {
    let mut rig = HeadlessRig::new();
    rig.engines = HeadlessEngines::unsupported();
    let mut player = PlayerRig::from_rig(rig, &Config::default());
    player.load(live_stream(5))?;

    let snapshot = player.controller.snapshot();
    assert_eq!(
        snapshot.fault.as_deref(),
        Some("This player is not supported on this device.")
    );
    assert_eq!(player.rig.engines.created(), 0);
    Ok(())
}

#[test]
fn test_native_playback_without_engine() -> Result<()> {
    let mut rig = HeadlessRig::new();
    rig.engines = HeadlessEngines::unsupported();
    rig.element = HeadlessElement::new(1).with_native_hls(true);
    let mut player = PlayerRig::from_rig(rig, &Config::default());
    player.load(live_stream(5))?;

    assert_eq!(
        player.rig.element.source().as_deref(),
        Some("https://cdn.example/live/5.m3u8")
    );
    assert!(player.controller.snapshot().is_playing);
    assert!(player.controller.snapshot().fault.is_none());
    Ok(())
}

#[test]
fn test_subtitles_follow_user_language() -> Result<()> {
    let mut rig = HeadlessRig::new();
    rig.engines = HeadlessEngines::new().with_manifest(ladder_manifest(true));
    rig.host = rig.host.clone().with_language("hi-IN");
    let mut player = PlayerRig::from_rig(rig, &Config::default());
    player.load(live_stream(5))?;

    assert_eq!(player.controller.snapshot().active_subtitle_index, 1);
    assert_eq!(player.rig.engines.subtitle_track(), Some(1));

    player.controller.execute(PlayerCommand::SetSubtitleTrack(-1))?;
    assert_eq!(player.rig.engines.subtitle_track(), Some(-1));
    Ok(())
}

#[test]
fn test_cast_handoff_resumes_at_local_position() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.rig.element.play_to(42.0);
    player.controller.pump();

    player.rig.cast.announce(true);
    player.rig.cast.connect("Living Room TV");
    player.controller.pump();

    assert_eq!(player.controller.authority(), Authority::Remote);
    let loads = player.rig.cast.loads();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].content_id, "https://cdn.example/live/5.m3u8");
    assert_eq!(loads[0].content_type, ADAPTIVE_CONTENT_TYPE);
    assert_eq!(loads[0].title, "Live match 5");
    assert_eq!(loads[0].current_time, 42.0);
    assert!(player.rig.element.is_muted());
    assert!(player.rig.element.is_hidden());

    let snapshot = player.controller.snapshot();
    assert!(snapshot.cast.is_casting);
    assert_eq!(snapshot.cast.device_name, "Living Room TV");

    // The hidden local element no longer drives the position
    player.rig.element.play_to(50.0);
    player.controller.pump();
    assert_eq!(player.controller.snapshot().current_time, 42.0);

    player.rig.cast.complete_load(true);
    player.rig.cast.remote(RemoteField::CurrentTime(61.0));
    player.controller.pump();
    assert!(player.events().contains(&PlayerEvent::CastMediaLoaded));
    assert_eq!(player.controller.snapshot().current_time, 61.0);

    Ok(())
}

#[test]
fn test_commands_route_to_receiver_while_casting() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;
    player.rig.cast.announce(true);
    player.rig.cast.connect("Den");
    player.controller.pump();
    player.rig.cast.complete_load(true);
    player.controller.pump();

    player.controller.execute(PlayerCommand::Seek(30.0))?;
    player.controller.execute(PlayerCommand::TogglePlayPause)?;
    player.controller.execute(PlayerCommand::SetVolume(0.4))?;

    assert_eq!(
        player.rig.cast.commands(),
        vec![
            "seek 30".to_string(),
            "play_or_pause".to_string(),
            "volume 0.4".to_string(),
            "mute_or_unmute".to_string(),
        ]
    );
    let snapshot = player.controller.snapshot();
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.volume, 0.4);

    Ok(())
}

#[test]
fn test_ending_cast_restores_local_playback() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.rig.cast.announce(true);
    player.rig.cast.connect("Kitchen");
    player.controller.pump();
    player.rig.cast.complete_load(true);
    player.controller.pump();

    player.rig.cast.disconnect();
    player.controller.pump();

    assert_eq!(player.controller.authority(), Authority::Local);
    assert!(!player.rig.element.is_hidden());
    let snapshot = player.controller.snapshot();
    assert!(!snapshot.cast.is_casting);
    assert!(snapshot.cast.is_available);
    assert_eq!(snapshot.is_playing, !player.rig.element.paused());

    Ok(())
}

#[test]
fn test_failed_cast_load_reverts_and_can_retry() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.rig.cast.announce(true);
    player.rig.cast.connect("Bedroom");
    player.controller.pump();
    player.events();

    player.rig.cast.complete_load(false);
    player.controller.pump();

    assert_eq!(player.controller.authority(), Authority::Local);
    assert!(!player.rig.element.is_hidden());
    assert!(!player.controller.snapshot().cast.is_casting);
    assert!(player
        .events()
        .iter()
        .any(|event| matches!(event, PlayerEvent::CastLoadFailed { .. })));

    player.controller.execute(PlayerCommand::RetryCast)?;
    assert_eq!(player.controller.authority(), Authority::Remote);
    assert_eq!(player.rig.cast.loads().len(), 2);

    player.rig.cast.complete_load(true);
    player.controller.pump();
    assert!(player.controller.snapshot().cast.is_casting);

    Ok(())
}

#[test]
fn test_rejected_cast_load_stays_local() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.rig.cast.announce(true);
    player.rig.cast.reject_loads(true);
    player.rig.cast.connect("Office");
    player.controller.pump();

    assert_eq!(player.controller.authority(), Authority::Local);
    assert!(player.rig.cast.loads().is_empty());
    assert!(!player.rig.element.is_hidden());
    Ok(())
}

#[test]
fn test_retry_cast_without_device_is_an_error() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.rig.cast.announce(true);
    player.controller.pump();

    assert!(player.controller.execute(PlayerCommand::RetryCast).is_err());
    assert_eq!(player.controller.authority(), Authority::Local);
    Ok(())
}

#[test]
fn test_controls_hide_after_inactivity() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.advance(Duration::from_secs(2));
    player.controller.execute(PlayerCommand::PointerMove)?;
    player.advance(Duration::from_secs(2));
    assert!(player.controller.snapshot().controls_visible);

    player.advance(Duration::from_secs(1));
    assert!(!player.controller.snapshot().controls_visible);

    player.controller.execute(PlayerCommand::PointerMove)?;
    assert!(player.controller.snapshot().controls_visible);
    Ok(())
}

#[test]
fn test_controls_stay_while_paused_or_menu_open() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.controller.execute(PlayerCommand::ToggleSettings)?;
    player.advance_by_steps(Duration::from_secs(5), Duration::from_millis(500));
    assert!(player.controller.snapshot().controls_visible);
    player.controller.execute(PlayerCommand::ToggleSettings)?;

    player.controller.execute(PlayerCommand::TogglePlayPause)?;
    player.advance_by_steps(Duration::from_secs(5), Duration::from_millis(500));
    assert!(player.controller.snapshot().controls_visible);

    player.controller.execute(PlayerCommand::PointerLeave)?;
    assert!(player.controller.snapshot().controls_visible);
    Ok(())
}

#[test]
fn test_menu_selection_rearms_hide_timer() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    // The idle deadline lapses while the menu holds the controls open
    player.controller.execute(PlayerCommand::ToggleSettings)?;
    player.advance(Duration::from_secs(5));
    assert!(player.controller.snapshot().controls_visible);

    player.controller.execute(PlayerCommand::SetQuality(1))?;
    assert!(!player.controller.snapshot().settings_open);
    player.advance_by_steps(Duration::from_secs(3), Duration::from_secs(1));
    assert!(!player.controller.snapshot().controls_visible);

    player.controller.execute(PlayerCommand::ToggleSettings)?;
    player.advance(Duration::from_secs(5));
    player.controller.execute(PlayerCommand::ToggleDataSaver)?;
    player.advance_by_steps(Duration::from_secs(3), Duration::from_secs(1));
    assert!(!player.controller.snapshot().controls_visible);

    player.controller.execute(PlayerCommand::ToggleSettings)?;
    player.advance(Duration::from_secs(5));
    player.controller.execute(PlayerCommand::SetSubtitleTrack(0))?;
    player.advance_by_steps(Duration::from_secs(3), Duration::from_secs(1));
    assert!(!player.controller.snapshot().controls_visible);
    Ok(())
}

#[test]
fn test_pointer_leave_hides_while_playing() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.controller.execute(PlayerCommand::PointerLeave)?;
    assert!(!player.controller.snapshot().controls_visible);
    Ok(())
}

#[test]
fn test_lock_blocks_shortcuts_and_survives_reload() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.controller.execute(PlayerCommand::ToggleLock)?;
    assert!(player.controller.snapshot().locked);

    player.controller.execute(PlayerCommand::Key(KeyInput::new("Space")))?;
    player.controller.execute(PlayerCommand::VideoClick)?;
    assert!(player.controller.snapshot().is_playing);

    player.load(live_stream(6))?;
    assert!(player.controller.snapshot().locked);

    player.controller.execute(PlayerCommand::ToggleLock)?;
    assert!(!player.controller.snapshot().locked);

    player.controller.execute(PlayerCommand::Key(KeyInput::new("Space")))?;
    assert!(!player.controller.snapshot().is_playing);
    Ok(())
}

#[test]
fn test_shortcuts_ignored_in_text_inputs() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player
        .controller
        .execute(PlayerCommand::Key(KeyInput::in_text_input("KeyM")))?;
    assert!(player.controller.snapshot().is_muted);

    player.controller.execute(PlayerCommand::Key(KeyInput::new("KeyM")))?;
    assert!(!player.controller.snapshot().is_muted);
    Ok(())
}

#[test]
fn test_fullscreen_denied_degrades_silently() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.rig.host.deny_fullscreen(true);
    player.controller.execute(PlayerCommand::ToggleFullscreen)?;
    assert!(!player.controller.snapshot().is_fullscreen);

    player.rig.host.deny_fullscreen(false);
    player.controller.execute(PlayerCommand::ToggleFullscreen)?;
    assert!(player.controller.snapshot().is_fullscreen);
    assert!(player.rig.host.fullscreen());

    player.controller.execute(PlayerCommand::ToggleFullscreen)?;
    assert!(!player.controller.snapshot().is_fullscreen);
    Ok(())
}

#[test]
fn test_picture_in_picture_unsupported_is_a_no_op() -> Result<()> {
    let mut rig = HeadlessRig::new();
    rig.engines = HeadlessEngines::new().with_manifest(ladder_manifest(false));
    rig.element = HeadlessElement::new(1).with_picture_in_picture(false);
    let mut player = PlayerRig::from_rig(rig, &Config::default());
    player.load(live_stream(5))?;

    player.controller.execute(PlayerCommand::TogglePictureInPicture)?;
    assert!(!player.controller.snapshot().in_picture_in_picture);
    Ok(())
}

#[test]
fn test_picture_in_picture_round_trip() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.controller.execute(PlayerCommand::TogglePictureInPicture)?;
    assert!(player.controller.snapshot().in_picture_in_picture);

    player.controller.execute(PlayerCommand::TogglePictureInPicture)?;
    assert!(!player.controller.snapshot().in_picture_in_picture);
    Ok(())
}

#[test]
fn test_data_saver_picks_lowest_level() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    player.load(live_stream(5))?;

    player.controller.execute(PlayerCommand::ToggleDataSaver)?;
    let snapshot = player.controller.snapshot();
    assert!(snapshot.data_saver);
    assert_eq!(snapshot.active_quality_index, 0);
    assert_eq!(player.rig.engines.level(), Some(0));

    player.controller.execute(PlayerCommand::SetQuality(2))?;
    let snapshot = player.controller.snapshot();
    assert!(!snapshot.data_saver);
    assert!(snapshot.is_quality_checked(2));
    assert_eq!(player.rig.engines.level(), Some(2));

    assert!(player.controller.execute(PlayerCommand::SetQuality(3)).is_err());
    Ok(())
}

#[test]
fn test_embedded_stream_gets_embed_url() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(false));
    let stream = Arc::new(StreamDescriptor::embedded(
        1,
        "Final",
        "https://www.youtube.com/embed/abc?autoplay=1&mute=1",
        true,
    ));
    player.load(stream)?;

    let snapshot = player.controller.snapshot();
    assert_eq!(
        snapshot.embed_url.as_deref(),
        Some("https://www.youtube.com/embed/abc?autoplay=1&mute=1")
    );
    assert_eq!(player.rig.engines.created(), 0);
    Ok(())
}

#[test]
fn test_unmount_releases_everything() -> Result<()> {
    let mut player = PlayerRig::with_manifest(ladder_manifest(true));
    player.load(live_stream(5))?;
    player.controller.execute(PlayerCommand::Unmount)?;

    assert_eq!(player.rig.engines.live_instances(), 0);
    assert!(!player.rig.element.has_listener());
    assert!(player.rig.element.source().is_none());
    assert!(player.controller.snapshot().stream_id.is_none());
    assert!(player.events().contains(&PlayerEvent::Unloaded));
    Ok(())
}

#[tokio::test]
async fn test_async_player_loop() -> Result<()> {
    let mut rig = HeadlessRig::new();
    rig.engines = HeadlessEngines::new().with_manifest(ladder_manifest(true));
    let mut player = MediaPlayerBuilder::new()
        .with_tick_interval(Duration::from_millis(5))
        .build(rig.backends())?;
    let handle = player.handle();
    let task = tokio::spawn(async move { player.run().await });

    handle.load(live_stream(5), false)?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.stream_id, Some(5));
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.duration_label, "Live");

    handle.send(PlayerCommand::ToggleMute)?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.snapshot().is_muted);

    handle.shutdown()?;
    task.await??;
    assert_eq!(rig.engines.live_instances(), 0);
    Ok(())
}

#[test]
fn test_catalog_from_file() -> Result<()> {
    let fixture = TestFixture::new()?;
    let path = fixture.write_catalog(&SAMPLE_CATALOG)?;

    let catalog = Catalog::load(&path)?;
    assert_eq!(catalog.len(), 2);

    let embedded = catalog.find(1).expect("stream 1");
    assert_eq!(embedded.kind, StreamKind::EmbeddedVideo);
    assert_eq!(embedded.channel_name, "Sky Sports Cricket");

    let adaptive = catalog.find(5).expect("stream 5");
    assert!(adaptive.is_adaptive());
    assert!(adaptive.thumbnail_url.is_empty());
    assert!(catalog.find(9).is_none());
    Ok(())
}

#[test]
fn test_malformed_catalog_is_rejected() -> Result<()> {
    let fixture = TestFixture::new()?;
    let path = fixture.write_catalog("[{\"id\": \"not a number\"}]")?;
    assert!(Catalog::load(&path).is_err());
    assert!(Catalog::load(&fixture.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn test_config_file_overrides_defaults() -> Result<()> {
    let fixture = TestFixture::new()?;
    let path = fixture.write_config(
        r#"
[player]
hide_controls_delay_ms = 1000
start_unmuted = true

[cast]
receiver_app_id = "ABCD1234"
"#,
    )?;

    let config = Config::from_file(&path)?;
    assert_eq!(config.player.hide_controls_delay_ms, 1000);
    assert!(config.player.start_unmuted);
    assert_eq!(config.player.step_seconds, 10.0);
    assert_eq!(config.cast.receiver_app_id, "ABCD1234");

    // The shorter delay reaches the controls timer
    let mut player = PlayerRig::with_config(ladder_manifest(false), &config);
    player.load(live_stream(5))?;
    player.advance(Duration::from_secs(1));
    assert!(!player.controller.snapshot().controls_visible);
    Ok(())
}

#[test]
#[serial]
fn test_env_overrides() -> Result<()> {
    std::env::set_var("CRICKSTREAM_HIDE_CONTROLS_MS", "1500");
    std::env::set_var("CRICKSTREAM_RECEIVER_APP_ID", "FFFF0000");

    let mut config = Config::default();
    let result = config.apply_env_overrides();

    std::env::remove_var("CRICKSTREAM_HIDE_CONTROLS_MS");
    std::env::remove_var("CRICKSTREAM_RECEIVER_APP_ID");

    result?;
    assert_eq!(config.player.hide_controls_delay_ms, 1500);
    assert_eq!(config.cast.receiver_app_id, "FFFF0000");
    Ok(())
}

#[test]
#[serial]
fn test_invalid_env_override_is_an_error() {
    std::env::set_var("CRICKSTREAM_HIDE_CONTROLS_MS", "soon");
    let result = Config::default().apply_env_overrides();
    std::env::remove_var("CRICKSTREAM_HIDE_CONTROLS_MS");

    assert!(result.is_err());
}
