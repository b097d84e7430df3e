//! Crickstream - adaptive livestream player core
//!
//! Orchestrates playback of cricket livestreams: an adaptive streaming
//! engine bound to a media element, live-edge tracking, quality and
//! subtitle selection, picture-in-picture and fullscreen, and handoff to a
//! cast receiver. Platform pieces are injected through the traits in
//! [`engine`], [`platform`] and [`cast`]; [`headless`] provides in-memory
//! implementations of all of them.

pub mod cast;
pub mod catalog;
pub mod engine;
pub mod headless;
pub mod platform;
pub mod player;
pub mod stream;
pub mod utils;

pub use catalog::Catalog;
pub use player::{
    Backends, MediaPlayer, MediaPlayerBuilder, PlayerCommand, PlayerController, PlayerEvent,
    PlayerEventHandler, PlayerHandle, PlayerSnapshot,
};
pub use stream::{StreamDescriptor, StreamKind};
pub use utils::{Config, PlayerError, Result};
