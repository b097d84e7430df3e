//! Cast session bridge
//!
//! State machine over Unavailable -> Available -> Casting. Connecting is
//! implicit: the bridge only reacts to Started/Resumed and Ended. Load
//! completions are matched by request id so only the latest request counts.

use crate::cast::{
    CastEvent, CastFramework, CastOptions, LoadRequest, RemoteField, SessionState,
    ADAPTIVE_CONTENT_TYPE,
};
use crate::player::inbox::CastSink;
use crate::player::state::CastState;
use crate::stream::StreamDescriptor;
use crate::utils::error::{PlayerError, Result};
use log::{debug, info, warn};

/// Bridge phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastPhase {
    Unavailable,
    Available,
    Casting { device_name: String },
}

/// What a cast callback changed, for the controller to act on
#[derive(Debug, Clone, PartialEq)]
pub enum CastUpdate {
    Unchanged,
    BecameAvailable,
    SessionStarted { device_name: String },
    SessionEnded,
    Loaded,
    LoadFailed(String),
    Field(RemoteField),
}

pub struct CastBridge {
    framework: Box<dyn CastFramework>,
    options: CastOptions,
    phase: CastPhase,
    next_request_id: u64,
    pending_load: Option<u64>,
}

impl CastBridge {
    pub fn new(framework: Box<dyn CastFramework>, options: CastOptions) -> Self {
        Self {
            framework,
            options,
            phase: CastPhase::Unavailable,
            next_request_id: 1,
            pending_load: None,
        }
    }

    /// Start framework discovery; availability arrives later as an event
    pub fn initialize(&mut self, sink: CastSink) {
        debug!("Registering cast availability callback");
        self.framework.discover(sink);
    }

    pub fn phase(&self) -> &CastPhase {
        &self.phase
    }

    pub fn is_casting(&self) -> bool {
        matches!(self.phase, CastPhase::Casting { .. })
    }

    pub fn state(&self) -> CastState {
        match &self.phase {
            CastPhase::Unavailable => CastState::default(),
            CastPhase::Available => CastState {
                is_available: true,
                ..CastState::default()
            },
            CastPhase::Casting { device_name } => CastState {
                is_available: true,
                is_casting: true,
                device_name: device_name.clone(),
            },
        }
    }

    /// Fold a framework callback into the phase
    pub fn handle_event(&mut self, event: CastEvent) -> CastUpdate {
        match event {
            CastEvent::ApiAvailable(available) => self.on_api_available(available),
            CastEvent::SessionStateChanged(state) => self.on_session_state(state),
            CastEvent::RemoteFieldChanged(field) => {
                if self.is_casting() {
                    CastUpdate::Field(field)
                } else {
                    debug!("Ignoring remote field change outside a cast session: {:?}", field);
                    CastUpdate::Unchanged
                }
            }
            CastEvent::LoadCompleted { request_id, result } => {
                self.on_load_completed(request_id, result)
            }
        }
    }

    fn on_api_available(&mut self, available: bool) -> CastUpdate {
        if !available {
            info!("Cast framework reports casting unavailable");
            return CastUpdate::Unchanged;
        }
        if self.phase != CastPhase::Unavailable {
            return CastUpdate::Unchanged;
        }

        if let Err(e) = self.framework.configure(&self.options) {
            warn!("Failed to configure cast framework: {}", e);
            return CastUpdate::Unchanged;
        }

        info!("Cast available (receiver {})", self.options.receiver_app_id);
        self.phase = CastPhase::Available;
        CastUpdate::BecameAvailable
    }

    fn on_session_state(&mut self, state: SessionState) -> CastUpdate {
        match state {
            SessionState::Started | SessionState::Resumed => {
                if self.phase == CastPhase::Unavailable {
                    warn!("Cast session {:?} before the framework was available", state);
                }
                let device_name = self.framework.current_device().unwrap_or_default();
                info!("Casting to {}", device_name);
                self.phase = CastPhase::Casting {
                    device_name: device_name.clone(),
                };
                CastUpdate::SessionStarted { device_name }
            }
            SessionState::Ended => {
                self.pending_load = None;
                if self.is_casting() {
                    info!("Cast session ended");
                    self.phase = CastPhase::Available;
                    CastUpdate::SessionEnded
                } else {
                    CastUpdate::Unchanged
                }
            }
            other => {
                debug!("Cast session state {:?}", other);
                CastUpdate::Unchanged
            }
        }
    }

    fn on_load_completed(&mut self, request_id: u64, result: std::result::Result<(), String>) -> CastUpdate {
        if self.pending_load != Some(request_id) {
            debug!("Ignoring completion of superseded load request {}", request_id);
            return CastUpdate::Unchanged;
        }
        self.pending_load = None;

        match result {
            Ok(()) => {
                info!("Media loaded on cast receiver");
                CastUpdate::Loaded
            }
            Err(reason) => self.fail_load(reason),
        }
    }

    fn fail_load(&mut self, reason: String) -> CastUpdate {
        let err = PlayerError::CastLoad(reason);
        warn!("{}", err);
        if self.is_casting() {
            self.phase = CastPhase::Available;
        }
        CastUpdate::LoadFailed(err.to_string())
    }

    /// Send the stream to the receiver
    ///
    /// A synchronous rejection is reported the same way as a failed
    /// completion and reverts the bridge to Available.
    pub fn load(&mut self, stream: &StreamDescriptor, current_time: f64) -> Option<CastUpdate> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let request = LoadRequest {
            request_id,
            content_id: stream.source_url.clone(),
            content_type: ADAPTIVE_CONTENT_TYPE.to_string(),
            title: stream.title.clone(),
            current_time,
        };

        info!("Loading '{}' on cast receiver (request {})", stream.title, request_id);
        self.pending_load = Some(request_id);
        match self.framework.load_media(request) {
            Ok(()) => None,
            Err(e) => {
                self.pending_load = None;
                Some(self.fail_load(e.to_string()))
            }
        }
    }

    /// Re-enter Casting after a failed load if a device is still connected
    pub fn resume_connected(&mut self) -> Result<String> {
        if self.phase == CastPhase::Unavailable {
            return Err(PlayerError::InvalidInput("Cast is not available".to_string()));
        }
        let device_name = self
            .framework
            .current_device()
            .ok_or_else(|| PlayerError::InvalidInput("No cast device connected".to_string()))?;
        self.phase = CastPhase::Casting {
            device_name: device_name.clone(),
        };
        Ok(device_name)
    }

    pub fn play_or_pause(&mut self) {
        self.framework.play_or_pause();
    }

    pub fn seek(&mut self, seconds: f64) {
        self.framework.seek(seconds);
    }

    pub fn set_volume_level(&mut self, volume: f64) {
        self.framework.set_volume_level(volume);
    }

    pub fn mute_or_unmute(&mut self) {
        self.framework.mute_or_unmute();
    }
}
