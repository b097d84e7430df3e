use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crickstream::engine::{ManifestInfo, QualityLevel, SubtitleTrack};
use crickstream::headless::{HeadlessEngines, HeadlessRig};
use crickstream::player::PlayerEventHandler;
use crickstream::stream::embed_url;
use crickstream::utils::{format_time, load_config};
use crickstream::{Catalog, MediaPlayerBuilder, PlayerEvent, StreamKind};

/// Crickstream - play cricket livestreams on the headless player core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// List the catalog and exit
    #[arg(short, long)]
    list: bool,

    /// Id of the stream to play
    #[arg(short, long, value_name = "ID", default_value = "5")]
    stream: u64,

    /// Catalog JSON file (defaults to the configured or builtin catalog)
    #[arg(short, long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Start with sound on
    #[arg(short, long)]
    unmuted: bool,

    /// How long to play before exiting
    #[arg(long, value_name = "N", default_value = "10")]
    seconds: u64,

    /// Hand playback to a simulated cast device with this name
    #[arg(long, value_name = "DEVICE")]
    cast: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

const STEP: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let mut config = load_config().context("Failed to load configuration")?;
    config.player.start_unmuted |= args.unmuted;

    // Initialize logging
    let log_level = if args.debug {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting Crickstream v{}", env!("CARGO_PKG_VERSION"));

    let catalog = match args.catalog.as_ref().or(config.general.catalog_path.as_ref()) {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };

    if args.list {
        for stream in catalog.iter() {
            println!(
                "{:>4}  {:<8} {:<5} {} ({})",
                stream.id,
                if stream.is_adaptive() { "m3u8" } else { "youtube" },
                if stream.is_live { "LIVE" } else { "" },
                stream.title,
                stream.channel_name
            );
        }
        return Ok(());
    }

    let stream = catalog
        .find(args.stream)
        .ok_or_else(|| anyhow!("No stream with id {}", args.stream))?;

    if stream.kind == StreamKind::EmbeddedVideo {
        println!("{}", embed_url(&stream, config.player.start_unmuted));
        return Ok(());
    }

    let mut rig = HeadlessRig::new();
    rig.engines = HeadlessEngines::new().with_manifest(demo_manifest(stream.is_live));

    let mut player = MediaPlayerBuilder::new()
        .with_config(config.clone())
        .with_event_handler(Box::new(LoggingEventHandler))
        .build(rig.backends())?;

    // Subscribe to events for UI updates
    let _event_sub = player.subscribe_events(|event| match event {
        PlayerEvent::StreamLoaded { title, .. } => info!("Now playing: {}", title),
        PlayerEvent::PlaybackStarted => info!("Playback started"),
        PlayerEvent::PlaybackPaused => info!("Playback paused"),
        PlayerEvent::CastStateChanged(state) if state.is_casting => {
            info!("Casting to {}", state.device_name)
        }
        PlayerEvent::Error { message } => error!("Player error: {}", message),
        _ => {}
    });

    let handle = player.handle();
    let task = tokio::spawn(async move { player.run().await });

    handle.load(Arc::clone(&stream), config.player.start_unmuted)?;
    rig.cast.announce(true);

    // Drive the simulated timeline
    let started = Instant::now();
    let deadline = Duration::from_secs(args.seconds);
    let mut cast_started = false;
    while started.elapsed() < deadline {
        tokio::time::sleep(STEP).await;
        rig.element.advance(STEP.as_secs_f64());
        if stream.is_live {
            rig.engines
                .set_live_sync(Some(started.elapsed().as_secs_f64() + 12.0));
        }

        if let Some(device) = &args.cast {
            if !cast_started && started.elapsed() >= deadline / 2 {
                rig.cast.connect(device);
                tokio::time::sleep(STEP).await;
                rig.cast.complete_load(true);
                cast_started = true;
            }
        }
    }

    let snapshot = handle.snapshot();
    info!(
        "{} at {} / {} (playing: {}, muted: {}, quality: {}, behind live: {}, casting: {})",
        snapshot.title,
        snapshot.time_label,
        snapshot.duration_label,
        snapshot.is_playing,
        snapshot.is_muted,
        snapshot.active_quality_index,
        snapshot.is_behind_live,
        snapshot.cast.is_casting
    );

    handle.shutdown()?;
    task.await??;
    Ok(())
}

fn demo_manifest(live: bool) -> ManifestInfo {
    ManifestInfo {
        live,
        levels: vec![
            QualityLevel::new(640, 360, 800_000),
            QualityLevel::new(1280, 720, 2_800_000),
            QualityLevel::new(1920, 1080, 5_000_000),
        ],
        subtitle_tracks: vec![
            SubtitleTrack::new(0, "English", Some("en")),
            SubtitleTrack::new(1, "Hindi", Some("hi")),
        ],
    }
}

/// Event handler that logs events
struct LoggingEventHandler;

impl PlayerEventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::PositionChanged { seconds } => {
                // Log position changes at debug level to avoid spam
                debug!("Position: {}", format_time(*seconds));
            }
            PlayerEvent::BufferingChanged { buffering } => {
                debug!("Buffering: {}", buffering);
            }
            PlayerEvent::VolumeChanged { volume, muted } => {
                info!("Volume: {:.0}%{}", volume * 100.0, if *muted { " (muted)" } else { "" });
            }
            PlayerEvent::ManifestParsed { live, levels, subtitle_tracks } => {
                info!(
                    "Manifest: {} quality levels, {} subtitle tracks{}",
                    levels,
                    subtitle_tracks,
                    if *live { ", live" } else { "" }
                );
            }
            PlayerEvent::BehindLiveChanged { behind } => {
                info!("Behind live edge: {}", behind);
            }
            PlayerEvent::CastLoadFailed { message } => {
                info!("Cast failed, continuing locally: {}", message);
            }
            _ => {
                // Other events are handled by the main event subscription
            }
        }
    }
}
