//! Segmented-media engine boundary
//!
//! The adaptive streaming engine (manifest parsing, segment fetching and
//! demuxing) is an external library. This module only describes the
//! surface the player drives: create, load a source, attach to an element,
//! read and write the quality level and subtitle track, read the live-sync
//! position, and destroy. Engine callbacks arrive through an [`EngineSink`].

use crate::player::inbox::EngineSink;
use crate::utils::error::Result;

/// Opaque identity of a media element an engine can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// One rendition advertised by the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct QualityLevel {
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
}

impl QualityLevel {
    pub fn new(width: u32, height: u32, bitrate: u64) -> Self {
        Self { width, height, bitrate }
    }

    /// Menu label, e.g. "720p"
    pub fn label(&self) -> String {
        format!("{}p", self.height)
    }
}

/// A subtitle rendition
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTrack {
    pub id: u32,
    pub name: String,
    /// BCP 47 language tag, when the manifest declares one
    pub lang: Option<String>,
}

impl SubtitleTrack {
    pub fn new(id: u32, name: &str, lang: Option<&str>) -> Self {
        Self {
            id,
            name: name.to_string(),
            lang: lang.map(str::to_string),
        }
    }

    /// Whether this track's primary language subtag equals `primary`
    pub fn matches_language(&self, primary: &str) -> bool {
        self.lang
            .as_deref()
            .and_then(|lang| lang.split(['-', '_']).next())
            .is_some_and(|subtag| !primary.is_empty() && subtag.eq_ignore_ascii_case(primary))
    }
}

/// Payload of the manifest-parsed callback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestInfo {
    pub live: bool,
    pub levels: Vec<QualityLevel>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// Callbacks raised by an engine instance
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine finished binding to the media element
    MediaAttached,

    /// Manifest loaded and parsed
    ManifestParsed(ManifestInfo),

    /// A fragment started buffering
    BufferingStarted,

    /// The fragment finished buffering
    BufferingEnded,

    /// Engine error; fatal errors end the session
    Error { fatal: bool, details: String },
}

/// A live engine instance bound to one media element
pub trait SegmentedEngine: Send {
    /// Start loading the manifest at `url`
    fn load_source(&mut self, url: &str) -> Result<()>;

    /// Bind to a media element
    fn attach_media(&mut self, element: ElementHandle) -> Result<()>;

    /// Release the instance and stop all of its callbacks
    fn destroy(&mut self);

    /// Current quality level, -1 for automatic selection
    fn current_level(&self) -> i32;

    fn set_current_level(&mut self, level: i32);

    /// Select a subtitle track, -1 disables subtitles
    fn set_subtitle_track(&mut self, index: i32);

    /// Position the engine considers the live edge, if it knows one
    fn live_sync_position(&self) -> Option<f64>;
}

/// Creates engine instances
pub trait EngineFactory: Send {
    /// Whether the platform can run the engine at all
    fn is_supported(&self) -> bool;

    /// Create an instance whose callbacks go to `sink`
    fn create(&self, sink: EngineSink) -> Result<Box<dyn SegmentedEngine>>;
}
