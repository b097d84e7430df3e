//! Player core for Crickstream
//!
//! This module orchestrates one adaptive playback session at a time: the
//! media session adapter over the segmented-media engine, the live edge
//! tracker, the controls visibility machine and the cast handoff. All
//! external callbacks are queued in the [`inbox`] and applied on one thread.

mod adapter;
mod controller;
pub mod inbox;
mod live_edge;
mod media_player;
pub mod state;
mod visibility;

pub use adapter::{AdapterMode, AdapterOutcome, MediaSessionAdapter};
pub use controller::{Authority, Backends, KeyInput, PlayerCommand, PlayerController, ShortcutKey};
pub use live_edge::LiveEdgeTracker;
pub use media_player::{EventSubscription, MediaPlayer, MediaPlayerBuilder, PlayerHandle};
pub use state::{CastState, PlaybackFault, PlaybackSession, PlayerSnapshot};
pub use visibility::{ControlsVisibility, Visibility, VisibilityGuards};

/// Player event for external event handling
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A new stream became the active session
    StreamLoaded { id: u64, title: String },

    /// The active session was torn down without a replacement
    Unloaded,

    /// Manifest parsed by the engine
    ManifestParsed {
        live: bool,
        levels: usize,
        subtitle_tracks: usize,
    },

    PlaybackStarted,

    PlaybackPaused,

    BufferingChanged { buffering: bool },

    /// Position changed by a command (not by playback progress)
    PositionChanged { seconds: f64 },

    VolumeChanged { volume: f64, muted: bool },

    QualityChanged { index: i32, data_saver: bool },

    SubtitleChanged { index: i32 },

    BehindLiveChanged { behind: bool },

    ControlsVisibilityChanged { visible: bool },

    LockChanged { locked: bool },

    FullscreenChanged { fullscreen: bool },

    PictureInPictureChanged { active: bool },

    CastStateChanged(CastState),

    /// The receiver accepted the stream
    CastMediaLoaded,

    /// The receiver rejected the stream; local playback continues
    CastLoadFailed { message: String },

    /// Playback fault with a static user-facing message
    Error { message: String },
}

/// Player event handler trait
pub trait PlayerEventHandler: Send {
    /// Handle player event
    ///
    /// # Arguments
    ///
    /// * `event` - Player event
    fn handle_event(&mut self, event: &PlayerEvent);
}
