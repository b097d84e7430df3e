//! Cast framework boundary and session bridge
//!
//! The casting framework is injected as a [`CastFramework`] capability. It
//! is discovered once at start-up, lives for the whole process, and reports
//! availability, session state and remote player fields through a
//! [`CastSink`]. The [`CastBridge`] turns those callbacks into the player's
//! cast state and forwards control actions to the remote receiver.

mod bridge;

pub use bridge::{CastBridge, CastPhase, CastUpdate};

use crate::player::inbox::CastSink;
use crate::utils::config::{AutoJoinPolicy, CastConfig};
use crate::utils::error::Result;

/// Content type sent with remote load requests for adaptive streams
pub const ADAPTIVE_CONTENT_TYPE: &str = "application/x-mpegURL";

/// Framework options applied once the API is available
#[derive(Debug, Clone, PartialEq)]
pub struct CastOptions {
    pub receiver_app_id: String,
    pub auto_join_policy: AutoJoinPolicy,
}

impl From<&CastConfig> for CastOptions {
    fn from(config: &CastConfig) -> Self {
        Self {
            receiver_app_id: config.receiver_app_id.clone(),
            auto_join_policy: config.auto_join_policy,
        }
    }
}

/// Remote session lifecycle as reported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Started,
    StartFailed,
    Resumed,
    Ending,
    Ended,
}

/// Remote player state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemotePlayerState {
    Idle,
    Playing,
    Paused,
    Buffering,
}

impl RemotePlayerState {
    /// Buffering counts as playing, matching what the receiver shows
    pub fn is_playing(self) -> bool {
        matches!(self, RemotePlayerState::Playing | RemotePlayerState::Buffering)
    }
}

/// A remote player field change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteField {
    PlayerState(RemotePlayerState),
    CurrentTime(f64),
    Duration(f64),
    VolumeLevel(f64),
    Muted(bool),
}

/// Callbacks raised by the cast framework
#[derive(Debug, Clone, PartialEq)]
pub enum CastEvent {
    /// The framework finished loading; `false` means casting is unsupported
    ApiAvailable(bool),

    SessionStateChanged(SessionState),

    RemoteFieldChanged(RemoteField),

    /// Completion of a load request
    LoadCompleted {
        request_id: u64,
        result: std::result::Result<(), String>,
    },
}

/// Remote media load request
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub request_id: u64,
    pub content_id: String,
    pub content_type: String,
    pub title: String,
    pub current_time: f64,
}

/// The process-wide casting capability
pub trait CastFramework: Send {
    /// Register the availability callback and start loading the framework
    fn discover(&mut self, sink: CastSink);

    /// Apply receiver id and auto-join policy
    fn configure(&mut self, options: &CastOptions) -> Result<()>;

    /// Friendly name of the device of the current session, if any
    fn current_device(&self) -> Option<String>;

    /// Issue a load on the current session; completion arrives as an event
    fn load_media(&mut self, request: LoadRequest) -> Result<()>;

    fn play_or_pause(&mut self);

    fn seek(&mut self, seconds: f64);

    fn set_volume_level(&mut self, volume: f64);

    fn mute_or_unmute(&mut self);
}
