//! Stream catalog
//!
//! The catalog is an external collaborator of the player: it owns the
//! stream descriptors and hands one to the player per playback request.
//! Only loading and lookup live here; editing and remote sync are left to
//! the surrounding application.

use crate::stream::StreamDescriptor;
use crate::utils::error::{IntoPlayerError, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

static BUILTIN: Lazy<Vec<StreamDescriptor>> = Lazy::new(|| {
    let mut final_ = StreamDescriptor::embedded(
        1,
        "ICC T20 World Cup Final",
        "https://www.youtube.com/embed/live_stream?channel=UC20_32VbS1_4qTzG8T7b4Ow&autoplay=1&mute=1",
        true,
    );
    final_.channel_name = "Sky Sports Cricket".to_string();

    let mut ashes = StreamDescriptor::embedded(
        2,
        "The Ashes: 2nd Test, Day 3",
        "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&mute=1",
        false,
    );
    ashes.channel_name = "Willow TV".to_string();

    let mut demo = StreamDescriptor::adaptive(
        5,
        "Big Buck Bunny (M3U8 Test)",
        "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8",
        true,
    );
    demo.channel_name = "Demo Channel".to_string();

    vec![final_, ashes, demo]
});

/// An ordered list of streams
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    streams: Vec<Arc<StreamDescriptor>>,
}

impl Catalog {
    /// Demo catalog used when no catalog file is configured
    pub fn builtin() -> Self {
        Self::from_streams(BUILTIN.clone())
    }

    pub fn from_streams(streams: Vec<StreamDescriptor>) -> Self {
        Self {
            streams: streams.into_iter().map(Arc::new).collect(),
        }
    }

    /// Parse a JSON array of stream records
    pub fn from_json(json: &str) -> Result<Self> {
        let streams: Vec<StreamDescriptor> = serde_json::from_str(json)?;
        debug!("Parsed {} catalog entries", streams.len());
        Ok(Self::from_streams(streams))
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .catalog_err(&format!("Reading {}", path.display()))?;
        let catalog = Self::from_json(&contents)?;
        info!("Loaded {} streams from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn find(&self, id: u64) -> Option<Arc<StreamDescriptor>> {
        self.streams.iter().find(|s| s.id == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<StreamDescriptor>> {
        self.streams.iter()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
