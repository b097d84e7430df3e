//! Player controller implementation for Crickstream
//!
//! The PlayerController is the playback control surface. It owns the one
//! active session, the cast bridge and the controls visibility machine, and
//! dispatches every command on the current [`Authority`]: the local media
//! element, or the remote receiver while casting.

use crate::cast::{CastBridge, CastFramework, CastOptions, CastUpdate, RemoteField};
use crate::engine::EngineFactory;
use crate::platform::{DisplayHost, ElementEvent, HostEvent, MediaElement};
use crate::player::adapter::{AdapterOutcome, MediaSessionAdapter};
use crate::player::inbox::{Generation, Inbound, Inbox};
use crate::player::live_edge::LiveEdgeTracker;
use crate::player::state::{PlaybackFault, PlaybackSession, PlayerSnapshot, AUTO_QUALITY};
use crate::player::visibility::{ControlsVisibility, VisibilityGuards};
use crate::player::PlayerEvent;
use crate::stream::{embed_url, StreamDescriptor, StreamKind};
use crate::utils::error::{PlayerError, Result};
use crate::utils::{clamp, Clock, Config, PlayerSettings};
use log::{debug, error, info, trace, warn};
use std::sync::Arc;

/// Platform capabilities the controller drives
pub struct Backends {
    pub engines: Box<dyn EngineFactory>,
    pub element: Box<dyn MediaElement>,
    pub host: Box<dyn DisplayHost>,
    pub cast: Box<dyn CastFramework>,
}

/// Which side owns playback state; selected on cast transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Local,
    Remote,
}

/// Global keyboard shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    PlayPause,
    Fullscreen,
    PictureInPicture,
    Mute,
    StepForward,
    StepBackward,
}

impl ShortcutKey {
    /// Map a keyboard `code` value to a shortcut
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Space" => Some(ShortcutKey::PlayPause),
            "KeyF" => Some(ShortcutKey::Fullscreen),
            "KeyP" => Some(ShortcutKey::PictureInPicture),
            "KeyM" => Some(ShortcutKey::Mute),
            "ArrowRight" => Some(ShortcutKey::StepForward),
            "ArrowLeft" => Some(ShortcutKey::StepBackward),
            _ => None,
        }
    }
}

/// A key press as seen by the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub code: String,
    /// Focus is inside a text input
    pub in_text_input: bool,
}

impl KeyInput {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            in_text_input: false,
        }
    }

    pub fn in_text_input(code: &str) -> Self {
        Self {
            code: code.to_string(),
            in_text_input: true,
        }
    }
}

/// Player command
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    TogglePlayPause,
    Seek(f64),
    BeginSeek,
    Scrub(f64),
    CommitSeek(f64),
    StepForward,
    StepBackward,
    ToggleMute,
    SetVolume(f64),
    SetQuality(i32),
    ToggleDataSaver,
    SetSubtitleTrack(i32),
    ToggleFullscreen,
    TogglePictureInPicture,
    ToggleLock,
    JumpToLive,
    SetBrightness(f64),
    ToggleSettings,
    SetVolumeSliderOpen(bool),
    PointerMove,
    PointerLeave,
    SurfaceClick,
    VideoClick,
    Key(KeyInput),
    RetryCast,
    Load {
        stream: Arc<StreamDescriptor>,
        start_unmuted: bool,
    },
    Unmount,
    Shutdown,
}

/// Everything owned by one playback attempt
struct ActiveSession {
    generation: Generation,
    session: PlaybackSession,
    adapter: Option<MediaSessionAdapter>,
    live_edge: LiveEdgeTracker,
    /// Set for embedded streams, which bypass the adapter
    embed_url: Option<String>,
}

impl ActiveSession {
    fn is_playable(&self) -> bool {
        self.embed_url.is_none() && self.session.is_playable()
    }
}

/// Main player controller implementation
pub struct PlayerController {
    settings: PlayerSettings,
    clock: Arc<dyn Clock>,
    inbox: Inbox,

    engines: Box<dyn EngineFactory>,
    element: Box<dyn MediaElement>,
    host: Box<dyn DisplayHost>,
    cast: CastBridge,

    authority: Authority,
    generation: Generation,
    active: Option<ActiveSession>,

    visibility: ControlsVisibility,
    is_fullscreen: bool,
    locked: bool,
    settings_open: bool,
    volume_slider_open: bool,

    /// Volume carried into the next session
    last_volume: f64,

    events: Vec<PlayerEvent>,
}

impl PlayerController {
    pub fn new(config: &Config, backends: Backends, clock: Arc<dyn Clock>) -> Self {
        let Backends {
            engines,
            element,
            mut host,
            cast,
        } = backends;

        let inbox = Inbox::new();
        host.set_listener(inbox.host_sink());
        let is_fullscreen = host.is_fullscreen();

        let mut cast = CastBridge::new(cast, CastOptions::from(&config.cast));
        cast.initialize(inbox.cast_sink());

        Self {
            settings: config.player.clone(),
            clock,
            inbox,
            engines,
            element,
            host,
            cast,
            authority: Authority::Local,
            generation: 0,
            active: None,
            visibility: ControlsVisibility::new(config.player.hide_controls_delay()),
            is_fullscreen,
            locked: false,
            settings_open: false,
            volume_slider_open: false,
            last_volume: 1.0,
            events: Vec::new(),
        }
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn is_casting(&self) -> bool {
        self.authority == Authority::Remote
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.active.as_ref().map(|active| &active.session)
    }

    /// Events produced since the last call
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run a command, then apply whatever callbacks it triggered
    pub fn execute(&mut self, command: PlayerCommand) -> Result<()> {
        trace!("Executing {:?}", command);
        let result = self.apply(command);
        self.pump();
        result
    }

    fn apply(&mut self, command: PlayerCommand) -> Result<()> {
        match command {
            PlayerCommand::TogglePlayPause => self.toggle_play_pause(),
            PlayerCommand::Seek(seconds) => self.seek(seconds),
            PlayerCommand::BeginSeek => self.begin_seek(),
            PlayerCommand::Scrub(seconds) => self.scrub(seconds),
            PlayerCommand::CommitSeek(seconds) => self.commit_seek(seconds),
            PlayerCommand::StepForward => self.step(self.settings.step_seconds),
            PlayerCommand::StepBackward => self.step(-self.settings.step_seconds),
            PlayerCommand::ToggleMute => self.toggle_mute(),
            PlayerCommand::SetVolume(volume) => self.set_volume(volume),
            PlayerCommand::SetQuality(index) => self.set_quality(index),
            PlayerCommand::ToggleDataSaver => self.toggle_data_saver(),
            PlayerCommand::SetSubtitleTrack(index) => self.set_subtitle_track(index),
            PlayerCommand::ToggleFullscreen => self.toggle_fullscreen(),
            PlayerCommand::TogglePictureInPicture => self.toggle_picture_in_picture(),
            PlayerCommand::ToggleLock => self.toggle_lock(),
            PlayerCommand::JumpToLive => self.jump_to_live(),
            PlayerCommand::SetBrightness(brightness) => self.set_brightness(brightness),
            PlayerCommand::ToggleSettings => {
                self.settings_open = !self.settings_open;
                self.show_controls();
                Ok(())
            }
            PlayerCommand::SetVolumeSliderOpen(open) => {
                if self.volume_slider_open != open {
                    self.volume_slider_open = open;
                    self.show_controls();
                }
                Ok(())
            }
            PlayerCommand::PointerMove => {
                self.show_controls();
                Ok(())
            }
            PlayerCommand::PointerLeave => {
                let guards = self.guards();
                if self.visibility.pointer_left(guards) {
                    self.events
                        .push(PlayerEvent::ControlsVisibilityChanged { visible: false });
                }
                Ok(())
            }
            PlayerCommand::SurfaceClick => {
                if self.locked {
                    self.toggle_lock()
                } else {
                    self.show_controls();
                    Ok(())
                }
            }
            PlayerCommand::VideoClick => {
                if self.locked {
                    Ok(())
                } else {
                    self.toggle_play_pause()
                }
            }
            PlayerCommand::Key(key) => self.handle_key(key),
            PlayerCommand::RetryCast => self.retry_cast(),
            PlayerCommand::Load {
                stream,
                start_unmuted,
            } => {
                self.load_stream(stream, start_unmuted);
                Ok(())
            }
            PlayerCommand::Unmount | PlayerCommand::Shutdown => {
                self.unmount();
                Ok(())
            }
        }
    }

    /// Start a session for `stream`, tearing down the previous one first
    pub fn load_stream(&mut self, stream: Arc<StreamDescriptor>, start_unmuted: bool) {
        self.end_session();
        self.generation += 1;
        let generation = self.generation;
        let now = self.clock.now();

        info!(
            "Loading stream {} '{}' ({:?}, generation {})",
            stream.id, stream.title, stream.kind, generation
        );

        let mut session = PlaybackSession::new(Arc::clone(&stream), start_unmuted, self.last_volume);
        let mut live_edge = LiveEdgeTracker::new(
            self.settings.live_poll_interval(),
            self.settings.behind_live_threshold_secs,
        );
        self.settings_open = false;
        self.volume_slider_open = false;

        let (adapter, embed) = match stream.kind {
            StreamKind::EmbeddedVideo => (None, Some(embed_url(&stream, start_unmuted))),
            StreamKind::AdaptiveStream => {
                self.element.set_listener(Some(self.inbox.element_sink(generation)));
                match MediaSessionAdapter::attach(
                    self.engines.as_ref(),
                    self.element.as_mut(),
                    &stream,
                    self.inbox.engine_sink(generation),
                ) {
                    Ok(adapter) => {
                        live_edge.start(now);
                        (Some(adapter), None)
                    }
                    Err(e) => {
                        error!("{}", e);
                        self.element.set_listener(None);
                        session.fault = Some(PlaybackFault::EngineAttach(e.to_string()));
                        (None, None)
                    }
                }
            }
        };

        let native = adapter.as_ref().is_some_and(|adapter| adapter.is_native());
        let fault = session.fault.as_ref().map(|fault| fault.message().to_string());
        let volume = session.volume;
        let muted = session.is_muted;

        self.active = Some(ActiveSession {
            generation,
            session,
            adapter,
            live_edge,
            embed_url: embed,
        });
        self.events.push(PlayerEvent::StreamLoaded {
            id: stream.id,
            title: stream.title.clone(),
        });

        if let Some(message) = fault {
            self.events.push(PlayerEvent::Error { message });
        } else if stream.is_adaptive() {
            match self.authority {
                Authority::Remote => self.handoff_to_receiver(),
                Authority::Local => {
                    self.element.set_hidden(false);
                    self.element.set_volume(volume);
                    self.element.set_muted(muted);
                    if native {
                        self.autoplay();
                    }
                }
            }
        }

        self.show_controls();
    }

    /// Tear down the active session without starting another
    pub fn unmount(&mut self) {
        if self.active.is_some() {
            self.end_session();
            self.settings_open = false;
            self.volume_slider_open = false;
            self.events.push(PlayerEvent::Unloaded);
        }
    }

    fn end_session(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        debug!("Tearing down session {}", active.generation);

        active.live_edge.cancel();
        if let Some(mut adapter) = active.adapter.take() {
            adapter.teardown();
        }
        self.last_volume = active.session.volume;

        if active.embed_url.is_none() {
            self.element.set_listener(None);
            self.element.pause();
            self.element.set_source(None);
        }

        // Anything still queued for the old session is now stale
        self.generation += 1;
        self.visibility.reset();
    }

    /// Drain the inbox, running each callback to completion
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.inbox.try_next() {
            self.dispatch(message);
            handled += 1;
        }
        handled
    }

    /// Fire any due live-edge poll and controls deadline
    pub fn poll_timers(&mut self) {
        let now = self.clock.now();

        if let Some(active) = self.active.as_mut() {
            let adapter = active.adapter.as_ref();
            let changed = active.live_edge.poll(now, &mut active.session, || {
                adapter.and_then(|adapter| adapter.live_sync_position())
            });
            if changed {
                let behind = active.session.is_behind_live;
                info!("Behind live: {}", behind);
                self.events.push(PlayerEvent::BehindLiveChanged { behind });
            }
        }

        let guards = self.guards();
        if self.visibility.poll(now, guards) {
            debug!("Hiding controls after inactivity");
            self.events.push(PlayerEvent::ControlsVisibilityChanged {
                visible: self.visibility.is_rendered(guards),
            });
        }
    }

    /// One host-loop iteration
    pub fn tick(&mut self) {
        self.pump();
        self.poll_timers();
        self.pump();
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let mut snapshot = match &self.active {
            Some(active) => {
                let mut snapshot = PlayerSnapshot::from_session(&active.session);
                snapshot.embed_url = active.embed_url.clone();
                snapshot
            }
            None => PlayerSnapshot::default(),
        };

        snapshot.is_fullscreen = self.is_fullscreen;
        snapshot.locked = self.locked;
        snapshot.settings_open = self.settings_open;
        snapshot.volume_slider_open = self.volume_slider_open;
        snapshot.controls_visible = self.visibility.is_rendered(self.guards());
        snapshot.cast = self.cast.state();
        snapshot
    }

    fn guards(&self) -> VisibilityGuards {
        let playing = self
            .active
            .as_ref()
            .is_some_and(|active| active.session.is_playing);
        VisibilityGuards {
            active: playing || self.authority == Authority::Remote,
            settings_open: self.settings_open,
            volume_slider_open: self.volume_slider_open,
            locked: self.locked,
        }
    }

    fn show_controls(&mut self) {
        let now = self.clock.now();
        if self.visibility.show(now) {
            self.events
                .push(PlayerEvent::ControlsVisibilityChanged { visible: true });
        }
    }

    /// A selection closes the menu; the idle deadline may have lapsed while it was open
    fn close_settings(&mut self) {
        self.settings_open = false;
        self.show_controls();
    }

    fn set_playing(&mut self, playing: bool) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.session.is_playing == playing {
            return;
        }
        active.session.is_playing = playing;
        self.events.push(if playing {
            PlayerEvent::PlaybackStarted
        } else {
            PlayerEvent::PlaybackPaused
        });
        self.show_controls();
    }

    fn autoplay(&mut self) {
        if let Err(e) = self.element.play() {
            warn!("Autoplay was blocked: {}", e);
        }
    }

    // Inbound callbacks

    fn dispatch(&mut self, message: Inbound) {
        match message {
            Inbound::Engine { generation, event } => {
                if self.is_current(generation) {
                    self.on_engine_event(event);
                } else {
                    trace!("Dropping engine event from stale session {}", generation);
                }
            }
            Inbound::Element { generation, event } => {
                if self.is_current(generation) {
                    self.on_element_event(event);
                } else {
                    trace!("Dropping element event from stale session {}", generation);
                }
            }
            Inbound::Cast(event) => {
                let update = self.cast.handle_event(event);
                self.on_cast_update(update);
            }
            Inbound::Host(HostEvent::FullscreenChanged(fullscreen)) => {
                if self.is_fullscreen != fullscreen {
                    self.is_fullscreen = fullscreen;
                    self.events.push(PlayerEvent::FullscreenChanged { fullscreen });
                }
            }
        }
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }

    fn on_engine_event(&mut self, event: crate::engine::EngineEvent) {
        let language = self.host.language();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(adapter) = active.adapter.as_mut() else {
            return;
        };

        match adapter.handle_event(event, &mut active.session, &language) {
            AdapterOutcome::Ignored => {}
            AdapterOutcome::MediaAttached => {
                if self.authority == Authority::Local {
                    self.element.set_volume(active.session.volume);
                    self.element.set_muted(active.session.is_muted);
                }
            }
            AdapterOutcome::ManifestReady {
                live,
                levels,
                subtitle_tracks,
            } => {
                self.events.push(PlayerEvent::ManifestParsed {
                    live,
                    levels,
                    subtitle_tracks,
                });
                if self.authority == Authority::Local {
                    self.autoplay();
                }
            }
            AdapterOutcome::Buffering(buffering) => {
                self.events.push(PlayerEvent::BufferingChanged { buffering });
            }
            AdapterOutcome::Fatal(details) => self.fail_session(details),
        }
    }

    fn fail_session(&mut self, details: String) {
        error!("{}", PlayerError::StreamUnplayable(details.clone()));

        let mut message = None;
        if let Some(active) = self.active.as_mut() {
            active.live_edge.cancel();
            if let Some(mut adapter) = active.adapter.take() {
                adapter.teardown();
            }
            let fault = PlaybackFault::StreamUnplayable(details);
            message = Some(fault.message().to_string());
            active.session.fault = Some(fault);
            active.session.is_playing = false;
            active.session.is_buffering = false;
        }

        self.element.set_listener(None);
        self.element.pause();
        if self.visibility.reset() {
            self.events
                .push(PlayerEvent::ControlsVisibilityChanged { visible: true });
        }
        if let Some(message) = message {
            self.events.push(PlayerEvent::Error { message });
        }
    }

    fn on_element_event(&mut self, event: ElementEvent) {
        let remote = self.authority == Authority::Remote;
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let session = &mut active.session;

        match event {
            ElementEvent::TimeUpdate(seconds) => {
                if !remote && !session.is_seeking {
                    session.current_time = seconds;
                }
            }
            ElementEvent::DurationChange(duration) => {
                if !remote {
                    session.duration = duration;
                }
            }
            ElementEvent::Play => {
                if !remote {
                    self.set_playing(true);
                }
            }
            ElementEvent::Pause => {
                if !remote {
                    self.set_playing(false);
                }
            }
            ElementEvent::LoadedMetadata { width, height } => {
                session.set_aspect_ratio(width, height);
            }
            ElementEvent::EnterPictureInPicture => {
                session.in_picture_in_picture = true;
                self.events
                    .push(PlayerEvent::PictureInPictureChanged { active: true });
            }
            ElementEvent::LeavePictureInPicture => {
                session.in_picture_in_picture = false;
                self.events
                    .push(PlayerEvent::PictureInPictureChanged { active: false });
            }
        }
    }

    fn on_cast_update(&mut self, update: CastUpdate) {
        match update {
            CastUpdate::Unchanged => {}
            CastUpdate::BecameAvailable => {
                self.events.push(PlayerEvent::CastStateChanged(self.cast.state()));
            }
            CastUpdate::SessionStarted { device_name } => self.enter_remote(&device_name),
            CastUpdate::SessionEnded => self.return_to_local(),
            CastUpdate::Loaded => self.events.push(PlayerEvent::CastMediaLoaded),
            CastUpdate::LoadFailed(message) => {
                self.return_to_local();
                self.events.push(PlayerEvent::CastLoadFailed { message });
            }
            CastUpdate::Field(field) => self.apply_remote_field(field),
        }
    }

    fn enter_remote(&mut self, device_name: &str) {
        self.events.push(PlayerEvent::CastStateChanged(self.cast.state()));
        if self.authority == Authority::Remote {
            return;
        }

        info!("Handing playback to {}", device_name);
        self.authority = Authority::Remote;
        self.handoff_to_receiver();
        self.show_controls();
    }

    /// Silence the local surface and load the stream on the receiver
    fn handoff_to_receiver(&mut self) {
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return;
        };

        self.element.set_muted(true);
        self.element.set_hidden(true);
        let position = self.element.current_time();
        active.session.current_time = position;

        if let Some(update) = self.cast.load(&active.session.stream, position) {
            self.on_cast_update(update);
        }
    }

    fn return_to_local(&mut self) {
        if self.authority == Authority::Local {
            return;
        }
        info!("Returning playback to the local element");
        self.authority = Authority::Local;

        if let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) {
            self.element.set_hidden(false);
            self.element.set_volume(active.session.volume);
            self.element.set_muted(active.session.is_muted);
            active.session.is_playing = !self.element.is_paused();
            active.session.current_time = self.element.current_time();
        }

        self.events.push(PlayerEvent::CastStateChanged(self.cast.state()));
        self.show_controls();
    }

    fn apply_remote_field(&mut self, field: RemoteField) {
        if self.authority != Authority::Remote {
            return;
        }
        if let RemoteField::PlayerState(state) = field {
            self.set_playing(state.is_playing());
            return;
        }

        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return;
        };
        let session = &mut active.session;
        match field {
            RemoteField::CurrentTime(seconds) => {
                if !session.is_seeking {
                    session.current_time = seconds;
                }
            }
            RemoteField::Duration(duration) => session.duration = duration,
            RemoteField::VolumeLevel(volume) if volume.is_finite() => {
                session.volume = clamp(volume, 0.0, 1.0)
            }
            RemoteField::VolumeLevel(volume) => debug!("Ignoring remote volume {}", volume),
            RemoteField::Muted(muted) => session.is_muted = muted,
            RemoteField::PlayerState(_) => {}
        }
    }

    // Commands

    fn toggle_play_pause(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            debug!("Ignoring play/pause without a playable session");
            return Ok(());
        };

        let playing = match self.authority {
            Authority::Remote => {
                self.cast.play_or_pause();
                !active.session.is_playing
            }
            Authority::Local => {
                if self.element.is_paused() {
                    match self.element.play() {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Play request failed: {}", e);
                            false
                        }
                    }
                } else {
                    self.element.pause();
                    false
                }
            }
        };

        self.set_playing(playing);
        self.show_controls();
        Ok(())
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return Err(PlayerError::InvalidInput(format!("Invalid seek position {}", seconds)));
        }
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return Ok(());
        };

        let target = active.session.clamp_position(seconds);
        match self.authority {
            Authority::Remote => self.cast.seek(target),
            Authority::Local => self.element.set_current_time(target),
        }
        active.session.current_time = target;

        debug!("Seek to {:.1}s", target);
        self.events.push(PlayerEvent::PositionChanged { seconds: target });
        self.show_controls();
        Ok(())
    }

    fn begin_seek(&mut self) -> Result<()> {
        if let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) {
            active.session.is_seeking = true;
            active.session.scrub_time = Some(active.session.current_time);
        }
        Ok(())
    }

    fn scrub(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return Err(PlayerError::InvalidInput(format!("Invalid scrub position {}", seconds)));
        }
        if let Some(active) = self.active.as_mut() {
            let session = &mut active.session;
            if session.is_seeking {
                session.scrub_time = Some(session.clamp_position(seconds));
            }
        }
        self.show_controls();
        Ok(())
    }

    fn commit_seek(&mut self, seconds: f64) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            active.session.is_seeking = false;
            active.session.scrub_time = None;
        }
        self.seek(seconds)
    }

    fn step(&mut self, delta: f64) -> Result<()> {
        let Some(current) = self
            .active
            .as_ref()
            .filter(|active| active.is_playable())
            .map(|active| active.session.current_time)
        else {
            return Ok(());
        };
        self.seek(current + delta)
    }

    fn toggle_mute(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return Ok(());
        };

        let muted = !active.session.is_muted;
        match self.authority {
            Authority::Remote => self.cast.mute_or_unmute(),
            Authority::Local => self.element.set_muted(muted),
        }
        active.session.is_muted = muted;

        self.events.push(PlayerEvent::VolumeChanged {
            volume: active.session.volume,
            muted,
        });
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !volume.is_finite() {
            return Err(PlayerError::InvalidInput(format!("Invalid volume {}", volume)));
        }
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return Ok(());
        };

        let was_muted = active.session.is_muted;
        active.session.apply_volume(volume);
        let session = &active.session;

        match self.authority {
            Authority::Remote => {
                self.cast.set_volume_level(session.volume);
                if was_muted != session.is_muted {
                    self.cast.mute_or_unmute();
                }
            }
            Authority::Local => {
                self.element.set_volume(session.volume);
                self.element.set_muted(session.is_muted);
            }
        }

        self.last_volume = session.volume;
        self.events.push(PlayerEvent::VolumeChanged {
            volume: session.volume,
            muted: session.is_muted,
        });
        Ok(())
    }

    fn set_quality(&mut self, index: i32) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return Ok(());
        };
        if !active.session.is_valid_quality(index) {
            return Err(PlayerError::InvalidInput(format!("No quality level {}", index)));
        }

        if let Some(adapter) = active.adapter.as_mut() {
            adapter.set_level(index);
        }
        active.session.active_quality_index = index;
        active.session.data_saver = false;
        self.close_settings();

        info!("Quality set to {}", index);
        self.events.push(PlayerEvent::QualityChanged {
            index,
            data_saver: false,
        });
        Ok(())
    }

    fn toggle_data_saver(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return Ok(());
        };

        let session = &mut active.session;
        session.data_saver = !session.data_saver;
        session.active_quality_index = if session.data_saver { 0 } else { AUTO_QUALITY };

        // Before the manifest there are no levels yet; the adapter re-applies on parse
        if session.is_valid_quality(session.active_quality_index) {
            if let Some(adapter) = active.adapter.as_mut() {
                adapter.set_level(session.active_quality_index);
            }
        }
        let (index, data_saver) = (session.active_quality_index, session.data_saver);
        self.close_settings();

        info!("Data saver {}", if data_saver { "on" } else { "off" });
        self.events.push(PlayerEvent::QualityChanged { index, data_saver });
        Ok(())
    }

    fn set_subtitle_track(&mut self, index: i32) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return Ok(());
        };
        if !active.session.is_valid_subtitle(index) {
            return Err(PlayerError::InvalidInput(format!("No subtitle track {}", index)));
        }

        if let Some(adapter) = active.adapter.as_mut() {
            adapter.set_subtitle(index);
        }
        active.session.active_subtitle_index = index;
        self.close_settings();

        self.events.push(PlayerEvent::SubtitleChanged { index });
        Ok(())
    }

    fn toggle_fullscreen(&mut self) -> Result<()> {
        let result = if self.host.is_fullscreen() {
            self.host.exit_fullscreen()
        } else {
            self.host.request_fullscreen()
        };
        if let Err(e) = result {
            warn!("{}", e);
        }
        self.show_controls();
        Ok(())
    }

    fn toggle_picture_in_picture(&mut self) -> Result<()> {
        if !self.active.as_ref().is_some_and(|active| active.is_playable()) {
            return Ok(());
        }
        if !self.element.picture_in_picture_enabled() {
            warn!("{}", PlayerError::PipUnsupported);
            return Ok(());
        }

        let result = if self.element.is_picture_in_picture() {
            self.element.exit_picture_in_picture()
        } else {
            self.element.request_picture_in_picture()
        };
        if let Err(e) = result {
            warn!("Picture-in-picture request failed: {}", e);
        }
        Ok(())
    }

    fn toggle_lock(&mut self) -> Result<()> {
        self.locked = !self.locked;
        info!("Controls {}", if self.locked { "locked" } else { "unlocked" });
        self.events.push(PlayerEvent::LockChanged {
            locked: self.locked,
        });
        self.show_controls();
        Ok(())
    }

    fn jump_to_live(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|active| active.is_playable()) else {
            return Ok(());
        };
        if !active.session.is_live {
            debug!("Jump to live on a non-live stream");
            return Ok(());
        }
        let Some(edge) = active
            .adapter
            .as_ref()
            .and_then(|adapter| adapter.live_sync_position())
        else {
            warn!("{}", PlayerError::LiveSyncUnavailable);
            return Ok(());
        };

        match self.authority {
            Authority::Remote => self.cast.seek(edge),
            Authority::Local => self.element.set_current_time(edge),
        }
        active.session.current_time = edge;
        if active.session.is_behind_live {
            active.session.is_behind_live = false;
            self.events
                .push(PlayerEvent::BehindLiveChanged { behind: false });
        }

        info!("Jumped to live edge at {:.1}s", edge);
        self.events.push(PlayerEvent::PositionChanged { seconds: edge });
        self.show_controls();
        Ok(())
    }

    fn set_brightness(&mut self, brightness: f64) -> Result<()> {
        if !brightness.is_finite() {
            return Err(PlayerError::InvalidInput(format!("Invalid brightness {}", brightness)));
        }
        if let Some(active) = self.active.as_mut() {
            active.session.set_brightness(brightness);
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyInput) -> Result<()> {
        if self.locked || key.in_text_input {
            trace!("Shortcut {} suppressed", key.code);
            return Ok(());
        }
        let Some(shortcut) = ShortcutKey::from_code(&key.code) else {
            return Ok(());
        };

        match shortcut {
            ShortcutKey::PlayPause => self.toggle_play_pause(),
            ShortcutKey::Fullscreen => self.toggle_fullscreen(),
            ShortcutKey::PictureInPicture => self.toggle_picture_in_picture(),
            ShortcutKey::Mute => self.toggle_mute(),
            ShortcutKey::StepForward => self.step(self.settings.step_seconds),
            ShortcutKey::StepBackward => self.step(-self.settings.step_seconds),
        }
    }

    fn retry_cast(&mut self) -> Result<()> {
        if self.authority == Authority::Remote {
            return Ok(());
        }
        let device_name = self.cast.resume_connected()?;
        self.events.push(PlayerEvent::CastStateChanged(self.cast.state()));

        info!("Retrying cast to {}", device_name);
        self.authority = Authority::Remote;
        self.handoff_to_receiver();
        self.show_controls();
        Ok(())
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.end_session();
    }
}
