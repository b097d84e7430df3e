//! Single-threaded event inbox
//!
//! Every external callback (engine, media element, cast framework, display
//! host) is turned into an [`Inbound`] message and queued here; the
//! controller drains the queue on the UI thread and runs each message to
//! completion. Engine and element sinks carry the session generation they
//! were created for so that events from a torn-down session are dropped.

use crate::cast::CastEvent;
use crate::engine::EngineEvent;
use crate::platform::{ElementEvent, HostEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;
use std::fmt;

/// Session counter; bumped on every stream change
pub type Generation = u64;

/// A queued callback
#[derive(Debug, Clone)]
pub enum Inbound {
    Engine { generation: Generation, event: EngineEvent },
    Element { generation: Generation, event: ElementEvent },
    Cast(CastEvent),
    Host(HostEvent),
}

/// Callback endpoint handed to an external collaborator
pub struct EventSink<E> {
    tx: Sender<Inbound>,
    generation: Generation,
    wrap: fn(Generation, E) -> Inbound,
}

impl<E> EventSink<E> {
    /// Queue an event; silently dropped once the player is gone
    pub fn emit(&self, event: E) {
        if self.tx.send((self.wrap)(self.generation, event)).is_err() {
            trace!("Player inbox closed, dropping event");
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            generation: self.generation,
            wrap: self.wrap,
        }
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("generation", &self.generation)
            .finish()
    }
}

pub type EngineSink = EventSink<EngineEvent>;
pub type ElementSink = EventSink<ElementEvent>;
pub type CastSink = EventSink<CastEvent>;
pub type HostSink = EventSink<HostEvent>;

/// The queue itself
pub struct Inbox {
    tx: Sender<Inbound>,
    rx: Receiver<Inbound>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn engine_sink(&self, generation: Generation) -> EngineSink {
        EventSink {
            tx: self.tx.clone(),
            generation,
            wrap: |generation, event| Inbound::Engine { generation, event },
        }
    }

    pub fn element_sink(&self, generation: Generation) -> ElementSink {
        EventSink {
            tx: self.tx.clone(),
            generation,
            wrap: |generation, event| Inbound::Element { generation, event },
        }
    }

    /// Cast events are process-wide and not tied to a session
    pub fn cast_sink(&self) -> CastSink {
        EventSink {
            tx: self.tx.clone(),
            generation: 0,
            wrap: |_, event| Inbound::Cast(event),
        }
    }

    pub fn host_sink(&self) -> HostSink {
        EventSink {
            tx: self.tx.clone(),
            generation: 0,
            wrap: |_, event| Inbound::Host(event),
        }
    }

    /// Next queued message, if any
    pub fn try_next(&self) -> Option<Inbound> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}
