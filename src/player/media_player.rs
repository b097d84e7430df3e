//! High-level media player API for Crickstream
//!
//! This module wraps the PlayerController in an async host loop: a tokio
//! interval drives the inbox and timers, commands arrive over an mpsc
//! channel from any number of [`PlayerHandle`]s, and player events fan out
//! to boxed handlers and closure subscribers.

use crate::player::controller::{Backends, PlayerCommand, PlayerController};
use crate::player::state::PlayerSnapshot;
use crate::player::{PlayerEvent, PlayerEventHandler};
use crate::stream::StreamDescriptor;
use crate::utils::error::{PlayerError, Result};
use crate::utils::{Clock, Config, SystemClock};

use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Default host loop period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Media player builder for customized configuration
pub struct MediaPlayerBuilder {
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    tick_interval: Duration,
    event_handlers: Vec<Box<dyn PlayerEventHandler>>,
}

impl MediaPlayerBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            clock: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            event_handlers: Vec::new(),
        }
    }

    /// Set player configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use a custom clock for timers
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Add an event handler
    pub fn with_event_handler(mut self, handler: Box<dyn PlayerEventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    /// Build the media player on top of `backends`
    pub fn build(self, backends: Backends) -> Result<MediaPlayer> {
        self.config.validate()?;
        if self.tick_interval.is_zero() {
            return Err(PlayerError::Config("Tick interval must be positive".to_string()));
        }

        info!("Initializing Crickstream player");
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let controller = PlayerController::new(&self.config, backends, clock);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let snapshot = Arc::new(RwLock::new(controller.snapshot()));

        Ok(MediaPlayer {
            controller,
            tick_interval: self.tick_interval,
            handlers: self.event_handlers,
            dispatcher: Arc::new(EventDispatcher::new()),
            command_tx,
            command_rx: Some(command_rx),
            snapshot,
        })
    }
}

impl Default for MediaPlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// High-level media player
pub struct MediaPlayer {
    controller: PlayerController,
    tick_interval: Duration,
    handlers: Vec<Box<dyn PlayerEventHandler>>,
    dispatcher: Arc<EventDispatcher>,
    command_tx: mpsc::UnboundedSender<PlayerCommand>,
    command_rx: Option<mpsc::UnboundedReceiver<PlayerCommand>>,
    /// Latest snapshot, published after every step
    snapshot: Arc<RwLock<PlayerSnapshot>>,
}

impl MediaPlayer {
    /// Handle for driving the player from other tasks
    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.command_tx.clone(),
            snapshot: Arc::clone(&self.snapshot),
        }
    }

    pub fn controller(&self) -> &PlayerController {
        &self.controller
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.read().clone()
    }

    /// Subscribe to events
    pub fn subscribe_events<F>(&self, callback: F) -> EventSubscription
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(callback)
    }

    /// Run one command synchronously
    pub fn execute(&mut self, command: PlayerCommand) -> Result<()> {
        let result = self.controller.execute(command);
        self.publish();
        result
    }

    /// One host-loop iteration
    pub fn tick(&mut self) {
        self.controller.tick();
        self.publish();
    }

    fn publish(&mut self) {
        for event in self.controller.drain_events() {
            debug!("Player event: {:?}", event);
            for handler in self.handlers.iter_mut() {
                handler.handle_event(&event);
            }
            self.dispatcher.dispatch(&event);
        }
        *self.snapshot.write() = self.controller.snapshot();
    }

    /// Drive the player until a Shutdown command arrives
    pub async fn run(&mut self) -> Result<()> {
        let mut commands = self
            .command_rx
            .take()
            .ok_or_else(|| PlayerError::InvalidInput("Player loop already ran".to_string()))?;

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Player loop started ({:?} tick)", self.tick_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick(),
                command = commands.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => {
                        match self.execute(command) {
                            Err(e) if e.is_optional_feature() => debug!("Command degraded: {}", e),
                            Err(e) => warn!("Command failed: {}", e),
                            Ok(()) => {}
                        }
                    }
                },
            }
        }

        self.controller.unmount();
        self.publish();
        info!("Player loop stopped");
        Ok(())
    }
}

/// Cloneable command sender with a view of the latest snapshot
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
    snapshot: Arc<RwLock<PlayerSnapshot>>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| PlayerError::InvalidInput("Player has shut down".to_string()))
    }

    /// Mount a stream; fire-and-forget from the catalog's point of view
    pub fn load(&self, stream: Arc<StreamDescriptor>, start_unmuted: bool) -> Result<()> {
        self.send(PlayerCommand::Load {
            stream,
            start_unmuted,
        })
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown)
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.read().clone()
    }
}

type Subscriber = Box<dyn Fn(&PlayerEvent) + Send + Sync>;

/// Event dispatcher
struct EventDispatcher {
    subscribers: Arc<RwLock<Vec<(u64, Subscriber)>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    fn subscribe<F>(&self, callback: F) -> EventSubscription
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push((id, Box::new(callback)));

        EventSubscription {
            id,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    fn dispatch(&self, event: &PlayerEvent) {
        for (_, callback) in self.subscribers.read().iter() {
            callback(event);
        }
    }
}

/// Event subscription handle; dropping it unsubscribes
pub struct EventSubscription {
    id: u64,
    subscribers: Arc<RwLock<Vec<(u64, Subscriber)>>>,
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.subscribers.write().retain(|(id, _)| *id != self.id);
    }
}
