//! In-memory backends
//!
//! Headless implementations of the engine, media element, display host and
//! cast framework. Each one is a cheap clonable handle over shared state so
//! a caller can keep a copy for scripting callbacks and inspecting calls
//! after handing the boxed backend to the controller. The CLI plays streams
//! on these and the test suites use them as doubles.

use crate::cast::{
    CastEvent, CastFramework, CastOptions, LoadRequest, RemoteField, RemotePlayerState, SessionState,
};
use crate::engine::{ElementHandle, EngineEvent, EngineFactory, ManifestInfo, SegmentedEngine};
use crate::platform::{DisplayHost, ElementEvent, HostEvent, MediaElement, HLS_MIME_TYPE};
use crate::player::inbox::{CastSink, ElementSink, EngineSink, HostSink};
use crate::player::{Backends, PlayerController};
use crate::utils::error::{PlayerError, Result};
use crate::utils::{Config, ManualClock};
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;

// Engine

struct EngineRecord {
    sink: EngineSink,
    calls: Vec<String>,
    alive: bool,
    level: i32,
    subtitle_track: i32,
}

#[derive(Default)]
struct EngineRegistry {
    unsupported: bool,
    fail_attach: bool,
    manifest: Option<ManifestInfo>,
    live_sync: Option<f64>,
    instances: Vec<EngineRecord>,
}

/// Engine factory that records every instance it creates
#[derive(Clone, Default)]
pub struct HeadlessEngines {
    registry: Arc<Mutex<EngineRegistry>>,
}

impl HeadlessEngines {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform without engine support
    pub fn unsupported() -> Self {
        let engines = Self::default();
        engines.registry.lock().unsupported = true;
        engines
    }

    /// Emit this manifest right after every successful attach
    pub fn with_manifest(self, manifest: ManifestInfo) -> Self {
        self.registry.lock().manifest = Some(manifest);
        self
    }

    pub fn fail_attach(&self, fail: bool) {
        self.registry.lock().fail_attach = fail;
    }

    pub fn set_live_sync(&self, position: Option<f64>) {
        self.registry.lock().live_sync = position;
    }

    pub fn created(&self) -> usize {
        self.registry.lock().instances.len()
    }

    pub fn destroyed(&self) -> usize {
        self.registry.lock().instances.iter().filter(|i| !i.alive).count()
    }

    pub fn live_instances(&self) -> usize {
        self.registry.lock().instances.iter().filter(|i| i.alive).count()
    }

    /// Calls made on the most recent instance
    pub fn last_calls(&self) -> Vec<String> {
        self.registry
            .lock()
            .instances
            .last()
            .map(|i| i.calls.clone())
            .unwrap_or_default()
    }

    pub fn level(&self) -> Option<i32> {
        self.registry.lock().instances.last().map(|i| i.level)
    }

    pub fn subtitle_track(&self) -> Option<i32> {
        self.registry.lock().instances.last().map(|i| i.subtitle_track)
    }

    /// Raise a callback from the newest live instance
    pub fn emit(&self, event: EngineEvent) {
        let registry = self.registry.lock();
        match registry.instances.iter().rev().find(|i| i.alive) {
            Some(instance) => instance.sink.emit(event),
            None => trace!("No live engine instance for {:?}", event),
        }
    }

    /// Raise a callback from instance `index`, destroyed or not
    pub fn emit_from(&self, index: usize, event: EngineEvent) {
        if let Some(instance) = self.registry.lock().instances.get(index) {
            instance.sink.emit(event);
        }
    }
}

impl EngineFactory for HeadlessEngines {
    fn is_supported(&self) -> bool {
        !self.registry.lock().unsupported
    }

    fn create(&self, sink: EngineSink) -> Result<Box<dyn SegmentedEngine>> {
        let mut registry = self.registry.lock();
        registry.instances.push(EngineRecord {
            sink,
            calls: Vec::new(),
            alive: true,
            level: -1,
            subtitle_track: -1,
        });
        Ok(Box::new(HeadlessEngine {
            index: registry.instances.len() - 1,
            registry: Arc::clone(&self.registry),
        }))
    }
}

struct HeadlessEngine {
    index: usize,
    registry: Arc<Mutex<EngineRegistry>>,
}

impl HeadlessEngine {
    fn with_record<R>(&self, f: impl FnOnce(&mut EngineRecord) -> R) -> R {
        let mut registry = self.registry.lock();
        f(&mut registry.instances[self.index])
    }
}

impl SegmentedEngine for HeadlessEngine {
    fn load_source(&mut self, url: &str) -> Result<()> {
        self.with_record(|record| record.calls.push(format!("load_source {}", url)));
        Ok(())
    }

    fn attach_media(&mut self, element: ElementHandle) -> Result<()> {
        let mut registry = self.registry.lock();
        let fail = registry.fail_attach;
        let manifest = registry.manifest.clone();
        let record = &mut registry.instances[self.index];
        record.calls.push(format!("attach_media {}", element.0));

        if fail {
            return Err(PlayerError::EngineAttach(
                "Media source could not be opened".to_string(),
            ));
        }
        record.sink.emit(EngineEvent::MediaAttached);
        if let Some(manifest) = manifest {
            record.sink.emit(EngineEvent::ManifestParsed(manifest));
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.with_record(|record| {
            record.calls.push("destroy".to_string());
            record.alive = false;
        });
    }

    fn current_level(&self) -> i32 {
        self.with_record(|record| record.level)
    }

    fn set_current_level(&mut self, level: i32) {
        self.with_record(|record| record.level = level);
    }

    fn set_subtitle_track(&mut self, index: i32) {
        self.with_record(|record| record.subtitle_track = index);
    }

    fn live_sync_position(&self) -> Option<f64> {
        self.registry.lock().live_sync
    }
}

// Media element

struct ElementState {
    listener: Option<ElementSink>,
    source: Option<String>,
    paused: bool,
    current_time: f64,
    volume: f64,
    muted: bool,
    hidden: bool,
    native_hls: bool,
    pip_enabled: bool,
    in_pip: bool,
    block_play: bool,
}

impl ElementState {
    fn emit(&self, event: ElementEvent) {
        if let Some(listener) = &self.listener {
            listener.emit(event);
        }
    }
}

/// A media element with a simulated timeline
#[derive(Clone)]
pub struct HeadlessElement {
    handle: ElementHandle,
    state: Arc<Mutex<ElementState>>,
}

impl HeadlessElement {
    pub fn new(id: u64) -> Self {
        Self {
            handle: ElementHandle(id),
            state: Arc::new(Mutex::new(ElementState {
                listener: None,
                source: None,
                paused: true,
                current_time: 0.0,
                volume: 1.0,
                muted: false,
                hidden: false,
                native_hls: false,
                pip_enabled: true,
                in_pip: false,
                block_play: false,
            })),
        }
    }

    pub fn with_native_hls(self, native: bool) -> Self {
        self.state.lock().native_hls = native;
        self
    }

    pub fn with_picture_in_picture(self, enabled: bool) -> Self {
        self.state.lock().pip_enabled = enabled;
        self
    }

    /// Make `play()` fail the way a blocked autoplay does
    pub fn block_play(&self, block: bool) {
        self.state.lock().block_play = block;
    }

    /// Raise an arbitrary element event
    pub fn emit(&self, event: ElementEvent) {
        self.state.lock().emit(event);
    }

    /// Jump the playhead to `seconds` and report it
    pub fn play_to(&self, seconds: f64) {
        let mut state = self.state.lock();
        state.current_time = seconds;
        state.emit(ElementEvent::TimeUpdate(seconds));
    }

    /// Advance the playhead by `seconds` if playing
    pub fn advance(&self, seconds: f64) {
        let mut state = self.state.lock();
        if !state.paused {
            state.current_time += seconds;
            let now = state.current_time;
            state.emit(ElementEvent::TimeUpdate(now));
        }
    }

    pub fn position(&self) -> f64 {
        self.state.lock().current_time
    }

    pub fn paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn is_hidden(&self) -> bool {
        self.state.lock().hidden
    }

    pub fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    pub fn has_listener(&self) -> bool {
        self.state.lock().listener.is_some()
    }
}

impl MediaElement for HeadlessElement {
    fn handle(&self) -> ElementHandle {
        self.handle
    }

    fn set_listener(&mut self, sink: Option<ElementSink>) {
        self.state.lock().listener = sink;
    }

    fn can_play_type(&self, mime: &str) -> bool {
        self.state.lock().native_hls && mime == HLS_MIME_TYPE
    }

    fn set_source(&mut self, url: Option<&str>) {
        let mut state = self.state.lock();
        state.source = url.map(str::to_string);
        if url.is_none() {
            state.paused = true;
            state.current_time = 0.0;
        }
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.block_play {
            return Err(PlayerError::InvalidInput(
                "play() was blocked by the autoplay policy".to_string(),
            ));
        }
        if state.paused {
            state.paused = false;
            state.emit(ElementEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        if !state.paused {
            state.paused = true;
            state.emit(ElementEvent::Pause);
        }
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.state.lock();
        state.current_time = seconds;
        state.emit(ElementEvent::TimeUpdate(seconds));
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().muted = muted;
    }

    fn set_hidden(&mut self, hidden: bool) {
        self.state.lock().hidden = hidden;
    }

    fn picture_in_picture_enabled(&self) -> bool {
        self.state.lock().pip_enabled
    }

    fn is_picture_in_picture(&self) -> bool {
        self.state.lock().in_pip
    }

    fn request_picture_in_picture(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.pip_enabled {
            return Err(PlayerError::PipUnsupported);
        }
        if !state.in_pip {
            state.in_pip = true;
            state.emit(ElementEvent::EnterPictureInPicture);
        }
        Ok(())
    }

    fn exit_picture_in_picture(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.in_pip {
            state.in_pip = false;
            state.emit(ElementEvent::LeavePictureInPicture);
        }
        Ok(())
    }
}

// Display host

struct HostState {
    listener: Option<HostSink>,
    fullscreen: bool,
    deny_fullscreen: bool,
    language: String,
}

#[derive(Clone)]
pub struct HeadlessHost {
    state: Arc<Mutex<HostState>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HostState {
                listener: None,
                fullscreen: false,
                deny_fullscreen: false,
                language: "en-US".to_string(),
            })),
        }
    }

    pub fn with_language(self, language: &str) -> Self {
        self.state.lock().language = language.to_string();
        self
    }

    pub fn deny_fullscreen(&self, deny: bool) {
        self.state.lock().deny_fullscreen = deny;
    }

    pub fn fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        let mut state = self.state.lock();
        if state.fullscreen != fullscreen {
            state.fullscreen = fullscreen;
            if let Some(listener) = &state.listener {
                listener.emit(HostEvent::FullscreenChanged(fullscreen));
            }
        }
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayHost for HeadlessHost {
    fn set_listener(&mut self, sink: HostSink) {
        self.state.lock().listener = Some(sink);
    }

    fn is_fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        if self.state.lock().deny_fullscreen {
            return Err(PlayerError::FullscreenDenied(
                "Permissions check failed".to_string(),
            ));
        }
        self.set_fullscreen(true);
        Ok(())
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        self.set_fullscreen(false);
        Ok(())
    }

    fn language(&self) -> String {
        self.state.lock().language.clone()
    }
}

// Cast framework

#[derive(Default)]
struct CastShared {
    sink: Option<CastSink>,
    configured: Option<CastOptions>,
    device: Option<String>,
    loads: Vec<LoadRequest>,
    commands: Vec<String>,
    reject_loads: bool,
    remote_playing: bool,
    remote_muted: bool,
}

impl CastShared {
    fn emit(&self, event: CastEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }

    fn field(&self, field: RemoteField) {
        self.emit(CastEvent::RemoteFieldChanged(field));
    }

    fn player_state(&self) -> RemotePlayerState {
        if self.remote_playing {
            RemotePlayerState::Playing
        } else {
            RemotePlayerState::Paused
        }
    }
}

/// A cast framework with one scriptable receiver that echoes every
/// control action back as a remote field change
#[derive(Clone, Default)]
pub struct HeadlessCast {
    shared: Arc<Mutex<CastShared>>,
}

impl HeadlessCast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report whether the framework loaded
    pub fn announce(&self, available: bool) {
        self.shared.lock().emit(CastEvent::ApiAvailable(available));
    }

    pub fn connect(&self, device_name: &str) {
        let mut shared = self.shared.lock();
        shared.device = Some(device_name.to_string());
        shared.emit(CastEvent::SessionStateChanged(SessionState::Started));
    }

    /// Rejoin an existing session, e.g. after a page reload
    pub fn resume(&self, device_name: &str) {
        let mut shared = self.shared.lock();
        shared.device = Some(device_name.to_string());
        shared.emit(CastEvent::SessionStateChanged(SessionState::Resumed));
    }

    pub fn disconnect(&self) {
        let mut shared = self.shared.lock();
        shared.device = None;
        shared.remote_playing = false;
        shared.emit(CastEvent::SessionStateChanged(SessionState::Ended));
    }

    pub fn reject_loads(&self, reject: bool) {
        self.shared.lock().reject_loads = reject;
    }

    /// Complete the most recent load request
    pub fn complete_load(&self, success: bool) {
        let mut shared = self.shared.lock();
        let Some(request) = shared.loads.last().cloned() else {
            return;
        };

        if success {
            shared.emit(CastEvent::LoadCompleted {
                request_id: request.request_id,
                result: Ok(()),
            });
            shared.remote_playing = true;
            shared.field(RemoteField::PlayerState(RemotePlayerState::Playing));
            shared.field(RemoteField::CurrentTime(request.current_time));
        } else {
            shared.emit(CastEvent::LoadCompleted {
                request_id: request.request_id,
                result: Err("LOAD_FAILED".to_string()),
            });
        }
    }

    /// Raise a remote field change as if it came from the receiver
    pub fn remote(&self, field: RemoteField) {
        self.shared.lock().field(field);
    }

    pub fn configured(&self) -> Option<CastOptions> {
        self.shared.lock().configured.clone()
    }

    pub fn loads(&self) -> Vec<LoadRequest> {
        self.shared.lock().loads.clone()
    }

    /// Control actions forwarded to the receiver
    pub fn commands(&self) -> Vec<String> {
        self.shared.lock().commands.clone()
    }
}

impl CastFramework for HeadlessCast {
    fn discover(&mut self, sink: CastSink) {
        self.shared.lock().sink = Some(sink);
    }

    fn configure(&mut self, options: &CastOptions) -> Result<()> {
        self.shared.lock().configured = Some(options.clone());
        Ok(())
    }

    fn current_device(&self) -> Option<String> {
        self.shared.lock().device.clone()
    }

    fn load_media(&mut self, request: LoadRequest) -> Result<()> {
        let mut shared = self.shared.lock();
        if shared.device.is_none() {
            return Err(PlayerError::CastLoad("No active cast session".to_string()));
        }
        if shared.reject_loads {
            return Err(PlayerError::CastLoad("Receiver rejected the media".to_string()));
        }
        shared.loads.push(request);
        Ok(())
    }

    fn play_or_pause(&mut self) {
        let mut shared = self.shared.lock();
        shared.commands.push("play_or_pause".to_string());
        shared.remote_playing = !shared.remote_playing;
        let state = shared.player_state();
        shared.field(RemoteField::PlayerState(state));
    }

    fn seek(&mut self, seconds: f64) {
        let mut shared = self.shared.lock();
        shared.commands.push(format!("seek {}", seconds));
        shared.field(RemoteField::CurrentTime(seconds));
    }

    fn set_volume_level(&mut self, volume: f64) {
        let mut shared = self.shared.lock();
        shared.commands.push(format!("volume {}", volume));
        shared.field(RemoteField::VolumeLevel(volume));
    }

    fn mute_or_unmute(&mut self) {
        let mut shared = self.shared.lock();
        shared.commands.push("mute_or_unmute".to_string());
        shared.remote_muted = !shared.remote_muted;
        let muted = shared.remote_muted;
        shared.field(RemoteField::Muted(muted));
    }
}

/// One of each backend plus a manual clock
#[derive(Clone)]
pub struct HeadlessRig {
    pub engines: HeadlessEngines,
    pub element: HeadlessElement,
    pub host: HeadlessHost,
    pub cast: HeadlessCast,
    pub clock: ManualClock,
}

impl HeadlessRig {
    pub fn new() -> Self {
        Self {
            engines: HeadlessEngines::new(),
            element: HeadlessElement::new(1),
            host: HeadlessHost::new(),
            cast: HeadlessCast::new(),
            clock: ManualClock::new(),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            engines: Box::new(self.engines.clone()),
            element: Box::new(self.element.clone()),
            host: Box::new(self.host.clone()),
            cast: Box::new(self.cast.clone()),
        }
    }

    /// A controller on these backends, timed by the manual clock
    pub fn controller(&self, config: &Config) -> PlayerController {
        PlayerController::new(config, self.backends(), Arc::new(self.clock.clone()))
    }
}

impl Default for HeadlessRig {
    fn default() -> Self {
        Self::new()
    }
}
