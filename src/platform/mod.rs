//! Platform media element and display host boundary
//!
//! The media element is the playable surface (play/pause/seek/volume/mute
//! and picture-in-picture); the display host owns fullscreen and the user
//! agent language. Both report state changes asynchronously through sinks.

use crate::engine::ElementHandle;
use crate::player::inbox::{ElementSink, HostSink};
use crate::utils::error::Result;

/// MIME type of adaptive playlists that some platforms play natively
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// Notifications from the media element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    TimeUpdate(f64),
    DurationChange(f64),
    Play,
    Pause,
    LoadedMetadata { width: u32, height: u32 },
    EnterPictureInPicture,
    LeavePictureInPicture,
}

/// The playable element a session renders into
pub trait MediaElement: Send {
    /// Identity handed to the engine on attach
    fn handle(&self) -> ElementHandle;

    /// Install or remove the session's event listener
    fn set_listener(&mut self, sink: Option<ElementSink>);

    /// Whether the element can play `mime` without the engine
    fn can_play_type(&self, mime: &str) -> bool;

    /// Assign or clear a direct source
    fn set_source(&mut self, url: Option<&str>);

    /// Start playback; fails when the host blocks autoplay
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);

    /// Hide the video surface (used while casting)
    fn set_hidden(&mut self, hidden: bool);

    fn picture_in_picture_enabled(&self) -> bool;

    fn is_picture_in_picture(&self) -> bool;

    fn request_picture_in_picture(&mut self) -> Result<()>;

    fn exit_picture_in_picture(&mut self) -> Result<()>;
}

/// Notifications from the display host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    FullscreenChanged(bool),
}

/// Window/document level affordances
pub trait DisplayHost: Send {
    fn set_listener(&mut self, sink: HostSink);

    fn is_fullscreen(&self) -> bool;

    /// Ask for whole-container fullscreen; completion arrives as an event
    fn request_fullscreen(&mut self) -> Result<()>;

    fn exit_fullscreen(&mut self) -> Result<()>;

    /// User agent language tag, e.g. "en-GB"
    fn language(&self) -> String;
}

/// Primary subtag of a language tag ("en-GB" -> "en")
pub fn primary_language(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or("")
}
