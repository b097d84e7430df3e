//! Player state for Crickstream
//!
//! This module holds the mutable state of one playback attempt, the
//! process-wide cast state, and the read-only snapshot handed to the UI.

use crate::engine::{QualityLevel, SubtitleTrack};
use crate::stream::StreamDescriptor;
use crate::utils::{clamp, format_time};
use std::sync::Arc;

/// Brightness bounds of the video filter
pub const MIN_BRIGHTNESS: f64 = 0.5;
pub const MAX_BRIGHTNESS: f64 = 1.5;

/// Aspect ratio used until the element reports its dimensions
pub const DEFAULT_ASPECT_RATIO: &str = "16 / 9";

/// Quality index meaning "let the engine choose"
pub const AUTO_QUALITY: i32 = -1;

/// Subtitle index meaning "off"
pub const SUBTITLES_OFF: i32 = -1;

/// Why a session cannot play
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackFault {
    /// The engine could not bind to the element; the player is disabled
    EngineAttach(String),

    /// Fatal engine error; shown as a static message, never retried
    StreamUnplayable(String),
}

impl PlaybackFault {
    /// Static user-facing message
    pub fn message(&self) -> &'static str {
        match self {
            PlaybackFault::EngineAttach(_) => "This player is not supported on this device.",
            PlaybackFault::StreamUnplayable(_) => "This stream is currently unavailable.",
        }
    }
}

/// Mutable state of one playback attempt
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    /// Borrowed from the catalog for the session's lifetime
    pub stream: Arc<StreamDescriptor>,

    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub is_buffering: bool,

    /// Volume level (0.0 to 1.0)
    pub volume: f64,
    pub is_muted: bool,

    /// Video brightness filter (0.5 to 1.5)
    pub brightness: f64,
    pub aspect_ratio: String,

    pub is_live: bool,
    pub is_behind_live: bool,

    /// -1 for automatic, otherwise an index into `quality_levels`
    pub active_quality_index: i32,
    pub quality_levels: Vec<QualityLevel>,

    pub subtitle_tracks: Vec<SubtitleTrack>,
    pub active_subtitle_index: i32,

    pub data_saver: bool,

    /// Seek gesture in progress; `scrub_time` is provisional until commit
    pub is_seeking: bool,
    pub scrub_time: Option<f64>,

    pub in_picture_in_picture: bool,

    pub fault: Option<PlaybackFault>,
}

impl PlaybackSession {
    /// Fresh session; starts muted unless the caller asked otherwise
    pub fn new(stream: Arc<StreamDescriptor>, start_unmuted: bool, volume: f64) -> Self {
        let is_live = stream.is_live;
        Self {
            stream,
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            is_buffering: false,
            volume: clamp(volume, 0.0, 1.0),
            is_muted: !start_unmuted,
            brightness: 1.0,
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            is_live,
            is_behind_live: false,
            active_quality_index: AUTO_QUALITY,
            quality_levels: Vec::new(),
            subtitle_tracks: Vec::new(),
            active_subtitle_index: SUBTITLES_OFF,
            data_saver: false,
            is_seeking: false,
            scrub_time: None,
            in_picture_in_picture: false,
            fault: None,
        }
    }

    /// Position shown on the seek bar
    pub fn display_time(&self) -> f64 {
        match (self.is_seeking, self.scrub_time) {
            (true, Some(scrub)) => scrub,
            _ => self.current_time,
        }
    }

    /// Upper bound for seeks; unbounded while the duration is unknown
    pub fn seek_limit(&self) -> f64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            self.duration
        } else {
            f64::INFINITY
        }
    }

    pub fn clamp_position(&self, seconds: f64) -> f64 {
        clamp(seconds, 0.0, self.seek_limit())
    }

    /// Apply a commanded volume; zero mutes and anything positive unmutes
    pub fn apply_volume(&mut self, volume: f64) {
        self.volume = clamp(volume, 0.0, 1.0);
        self.is_muted = self.volume == 0.0;
    }

    pub fn set_brightness(&mut self, brightness: f64) {
        self.brightness = clamp(brightness, MIN_BRIGHTNESS, MAX_BRIGHTNESS);
    }

    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = format!("{} / {}", width, height);
        }
    }

    pub fn is_valid_quality(&self, index: i32) -> bool {
        index == AUTO_QUALITY || (index >= 0 && (index as usize) < self.quality_levels.len())
    }

    pub fn is_valid_subtitle(&self, index: i32) -> bool {
        index == SUBTITLES_OFF || (index >= 0 && (index as usize) < self.subtitle_tracks.len())
    }

    /// Whether playback can be driven at all
    pub fn is_playable(&self) -> bool {
        self.fault.is_none()
    }
}

/// Process-wide cast state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastState {
    pub is_available: bool,
    pub is_casting: bool,
    pub device_name: String,
}

/// Read-only view of everything the UI renders
#[derive(Debug, Clone, Default)]
pub struct PlayerSnapshot {
    pub stream_id: Option<u64>,
    pub title: String,
    /// Set when the current stream is an embed rendered by the caller
    pub embed_url: Option<String>,

    pub current_time: f64,
    pub duration: f64,
    pub time_label: String,
    pub duration_label: String,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub volume: f64,
    pub is_muted: bool,
    pub brightness: f64,
    pub aspect_ratio: String,
    pub is_live: bool,
    pub is_behind_live: bool,
    pub active_quality_index: i32,
    pub quality_levels: Vec<QualityLevel>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
    pub active_subtitle_index: i32,
    pub data_saver: bool,
    pub is_seeking: bool,
    pub in_picture_in_picture: bool,

    pub is_fullscreen: bool,
    pub locked: bool,
    pub settings_open: bool,
    pub volume_slider_open: bool,
    pub controls_visible: bool,

    pub cast: CastState,
    pub fault: Option<String>,
}

impl PlayerSnapshot {
    pub(crate) fn from_session(session: &PlaybackSession) -> Self {
        Self {
            stream_id: Some(session.stream.id),
            title: session.stream.title.clone(),
            embed_url: None,
            current_time: session.display_time(),
            duration: session.duration,
            time_label: format_time(session.display_time()),
            duration_label: if session.is_live {
                "Live".to_string()
            } else {
                format_time(session.duration)
            },
            is_playing: session.is_playing,
            is_buffering: session.is_buffering,
            volume: session.volume,
            is_muted: session.is_muted,
            brightness: session.brightness,
            aspect_ratio: session.aspect_ratio.clone(),
            is_live: session.is_live,
            is_behind_live: session.is_behind_live,
            active_quality_index: session.active_quality_index,
            quality_levels: session.quality_levels.clone(),
            subtitle_tracks: session.subtitle_tracks.clone(),
            active_subtitle_index: session.active_subtitle_index,
            data_saver: session.data_saver,
            is_seeking: session.is_seeking,
            in_picture_in_picture: session.in_picture_in_picture,
            fault: session.fault.as_ref().map(|f| f.message().to_string()),
            ..Self::default()
        }
    }

    /// Whether a quality menu entry shows as checked; data saver hides the
    /// manual and Auto checkmarks
    pub fn is_quality_checked(&self, index: i32) -> bool {
        self.active_quality_index == index && !self.data_saver
    }

    /// The "LIVE" jump button is offered only when behind the edge
    pub fn shows_jump_to_live(&self) -> bool {
        self.is_live && self.is_behind_live
    }
}
