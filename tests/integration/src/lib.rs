//! Integration test utilities for Crickstream
//!
//! This module provides common utilities for integration testing including:
//! - A player rig over the headless backends with a manual clock
//! - Sample manifests and catalogs
//! - Temporary catalog and config files

use anyhow::Result;
use crickstream::engine::{ManifestInfo, QualityLevel, SubtitleTrack};
use crickstream::headless::{HeadlessEngines, HeadlessRig};
use crickstream::{Config, PlayerCommand, PlayerController, PlayerEvent, StreamDescriptor};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Catalog file contents shared by the catalog tests
pub static SAMPLE_CATALOG: Lazy<String> = Lazy::new(|| {
    r#"[
  {
    "id": 1,
    "title": "ICC T20 World Cup Final",
    "channelName": "Sky Sports Cricket",
    "url": "https://www.youtube.com/embed/live_stream?channel=abc&autoplay=1&mute=1",
    "isLive": true,
    "streamType": "youtube",
    "thumbnailUrl": "https://img.example/final.jpg"
  },
  {
    "id": 5,
    "title": "County Championship Day 2",
    "channelName": "Demo Channel",
    "url": "https://cdn.example/county/master.m3u8",
    "isLive": true,
    "streamType": "m3u8"
  }
]"#
    .to_string()
});

/// Temporary directory holding catalog and config files
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_catalog(&self, json: &str) -> Result<PathBuf> {
        let path = self.path().join("catalog.json");
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn write_config(&self, toml: &str) -> Result<PathBuf> {
        let path = self.path().join("config.toml");
        std::fs::write(&path, toml)?;
        Ok(path)
    }
}

/// A live adaptive stream
pub fn live_stream(id: u64) -> Arc<StreamDescriptor> {
    Arc::new(StreamDescriptor::adaptive(
        id,
        &format!("Live match {}", id),
        &format!("https://cdn.example/live/{}.m3u8", id),
        true,
    ))
}

/// Three ascending levels and two subtitle tracks
pub fn ladder_manifest(live: bool) -> ManifestInfo {
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

/// Headless backends plus a controller timed by the rig's manual clock
pub struct PlayerRig {
    pub rig: HeadlessRig,
    pub controller: PlayerController,
}

impl PlayerRig {
    /// Rig whose engines parse `manifest` as soon as they attach
    pub fn with_manifest(manifest: ManifestInfo) -> Self {
        Self::with_config(manifest, &Config::default())
    }

    pub fn with_config(manifest: ManifestInfo, config: &Config) -> Self {
        let mut rig = HeadlessRig::new();
        rig.engines = HeadlessEngines::new().with_manifest(manifest);
        Self::from_rig(rig, config)
    }

    /// Wrap a rig whose backends were customised by the caller
    pub fn from_rig(rig: HeadlessRig, config: &Config) -> Self {
        let controller = rig.controller(config);
        Self { rig, controller }
    }

    pub fn load(&mut self, stream: Arc<StreamDescriptor>) -> Result<()> {
        self.controller.execute(PlayerCommand::Load {
            stream,
            start_unmuted: false,
        })?;
        Ok(())
    }

    /// Move the manual clock and run one host-loop iteration
    pub fn advance(&mut self, by: Duration) {
        self.rig.clock.advance(by);
        self.controller.tick();
    }

    /// Advance in `step` increments until `total` has elapsed
    pub fn advance_by_steps(&mut self, total: Duration, step: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            self.advance(step);
            elapsed += step;
        }
    }

    pub fn events(&mut self) -> Vec<PlayerEvent> {
        self.controller.drain_events()
    }
}
