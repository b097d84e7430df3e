//! Media session adapter
//!
//! Owns the one engine instance of an adaptive session. Attaching creates
//! the instance, loads the source, then binds it to the element. Engine
//! callbacks are folded into the [`PlaybackSession`]; the adapter never
//! retries a failed stream. Platforms without engine support that play the
//! playlist format natively get the URL assigned straight to the element.

use crate::engine::{EngineEvent, EngineFactory, ManifestInfo, SegmentedEngine};
use crate::platform::{primary_language, MediaElement, HLS_MIME_TYPE};
use crate::player::inbox::EngineSink;
use crate::player::state::{PlaybackSession, AUTO_QUALITY, SUBTITLES_OFF};
use crate::stream::StreamDescriptor;
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use log::{debug, info, warn};

/// How the session's media reaches the element
pub enum AdapterMode {
    Engine(Box<dyn SegmentedEngine>),
    /// Source assigned directly to the element
    Native,
    /// Torn down
    Released,
}

/// What an engine callback means for the controller
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    Ignored,
    Buffering(bool),
    /// The element is bound; push volume and mute onto it
    MediaAttached,
    ManifestReady {
        live: bool,
        levels: usize,
        subtitle_tracks: usize,
    },
    /// Fatal engine error; the session is unplayable
    Fatal(String),
}

pub struct MediaSessionAdapter {
    mode: AdapterMode,
}

impl MediaSessionAdapter {
    /// Bind `stream` to `element`
    pub fn attach(
        factory: &dyn EngineFactory,
        element: &mut dyn MediaElement,
        stream: &StreamDescriptor,
        sink: EngineSink,
    ) -> Result<Self> {
        if !stream.is_adaptive() {
            return Err(PlayerError::InvalidInput(format!(
                "Stream {} is not an adaptive stream",
                stream.id
            )));
        }

        if !factory.is_supported() {
            if element.can_play_type(HLS_MIME_TYPE) {
                info!("Engine unsupported, playing '{}' natively", stream.title);
                element.set_source(Some(&stream.source_url));
                return Ok(Self {
                    mode: AdapterMode::Native,
                });
            }
            return Err(PlayerError::EngineAttach(
                "Adaptive streaming is not supported on this platform".to_string(),
            ));
        }

        debug!("Creating engine instance (generation {})", sink.generation());
        let mut engine = factory.create(sink).engine_err("Failed to create engine")?;

        let bound = engine
            .load_source(&stream.source_url)
            .and_then(|_| engine.attach_media(element.handle()));
        if let Err(e) = bound {
            engine.destroy();
            return Err(PlayerError::EngineAttach(e.to_string()));
        }

        info!("Engine attached for '{}'", stream.title);
        Ok(Self {
            mode: AdapterMode::Engine(engine),
        })
    }

    pub fn mode(&self) -> &AdapterMode {
        &self.mode
    }

    pub fn is_native(&self) -> bool {
        matches!(self.mode, AdapterMode::Native)
    }

    pub fn is_released(&self) -> bool {
        matches!(self.mode, AdapterMode::Released)
    }

    fn engine(&mut self) -> Option<&mut Box<dyn SegmentedEngine>> {
        match &mut self.mode {
            AdapterMode::Engine(engine) => Some(engine),
            _ => None,
        }
    }

    /// Fold one engine callback into the session
    pub fn handle_event(
        &mut self,
        event: EngineEvent,
        session: &mut PlaybackSession,
        user_language: &str,
    ) -> AdapterOutcome {
        if self.is_released() {
            return AdapterOutcome::Ignored;
        }

        match event {
            EngineEvent::MediaAttached => AdapterOutcome::MediaAttached,
            EngineEvent::ManifestParsed(info) => self.on_manifest(info, session, user_language),
            EngineEvent::BufferingStarted => {
                session.is_buffering = true;
                AdapterOutcome::Buffering(true)
            }
            EngineEvent::BufferingEnded => {
                session.is_buffering = false;
                AdapterOutcome::Buffering(false)
            }
            EngineEvent::Error { fatal: true, details } => AdapterOutcome::Fatal(details),
            EngineEvent::Error { fatal: false, details } => {
                debug!("Recoverable engine error: {}", details);
                AdapterOutcome::Ignored
            }
        }
    }

    fn on_manifest(
        &mut self,
        info: ManifestInfo,
        session: &mut PlaybackSession,
        user_language: &str,
    ) -> AdapterOutcome {
        if info.levels.windows(2).any(|pair| pair[0].height > pair[1].height) {
            warn!("Engine reported quality levels out of ascending height order");
        }

        session.is_live = info.live;
        session.quality_levels = info.levels;
        session.subtitle_tracks = info.subtitle_tracks;

        // Re-apply a selection made before the levels were known
        if session.active_quality_index != AUTO_QUALITY {
            if session.is_valid_quality(session.active_quality_index) {
                let level = session.active_quality_index;
                self.set_level(level);
            } else {
                warn!(
                    "Quality level {} not offered by the manifest, using automatic selection",
                    session.active_quality_index
                );
                session.active_quality_index = AUTO_QUALITY;
                session.data_saver = false;
            }
        }

        let primary = primary_language(user_language);
        session.active_subtitle_index = session
            .subtitle_tracks
            .iter()
            .position(|track| track.matches_language(primary))
            .map_or(SUBTITLES_OFF, |index| index as i32);
        if session.active_subtitle_index != SUBTITLES_OFF {
            debug!("Auto-selected subtitle track {} for '{}'", session.active_subtitle_index, primary);
            let index = session.active_subtitle_index;
            self.set_subtitle(index);
        }

        info!(
            "Manifest parsed: live={}, {} levels, {} subtitle tracks",
            session.is_live,
            session.quality_levels.len(),
            session.subtitle_tracks.len()
        );

        AdapterOutcome::ManifestReady {
            live: session.is_live,
            levels: session.quality_levels.len(),
            subtitle_tracks: session.subtitle_tracks.len(),
        }
    }

    pub fn set_level(&mut self, level: i32) {
        match self.engine() {
            Some(engine) => engine.set_current_level(level),
            None => debug!("No engine to apply quality level {}", level),
        }
    }

    pub fn set_subtitle(&mut self, index: i32) {
        if let Some(engine) = self.engine() {
            engine.set_subtitle_track(index);
        }
    }

    pub fn current_level(&self) -> Option<i32> {
        match &self.mode {
            AdapterMode::Engine(engine) => Some(engine.current_level()),
            _ => None,
        }
    }

    pub fn live_sync_position(&self) -> Option<f64> {
        match &self.mode {
            AdapterMode::Engine(engine) => engine.live_sync_position(),
            _ => None,
        }
    }

    /// Destroy the engine instance; idempotent
    pub fn teardown(&mut self) {
        if let AdapterMode::Engine(mut engine) = std::mem::replace(&mut self.mode, AdapterMode::Released) {
            debug!("Destroying engine instance");
            engine.destroy();
        }
    }
}

impl Drop for MediaSessionAdapter {
    fn drop(&mut self) {
        self.teardown();
    }
}
