//! Live edge tracking
//!
//! Polls the engine's live-sync position on a fixed interval and flags the
//! session as behind live when playback trails the edge by more than the
//! configured threshold.

use crate::player::state::PlaybackSession;
use crate::utils::error::PlayerError;
use log::{debug, trace};
use std::time::{Duration, Instant};

pub struct LiveEdgeTracker {
    interval: Duration,
    threshold: f64,
    next_due: Option<Instant>,
}

impl LiveEdgeTracker {
    pub fn new(interval: Duration, threshold: f64) -> Self {
        Self {
            interval,
            threshold,
            next_due: None,
        }
    }

    /// Arm the poll; the first tick fires one interval from `now`
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Run a tick if one is due. Missed ticks collapse into one.
    ///
    /// Returns whether `is_behind_live` changed.
    pub fn poll<F>(&mut self, now: Instant, session: &mut PlaybackSession, probe: F) -> bool
    where
        F: FnOnce() -> Option<f64>,
    {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                self.tick(session, probe)
            }
            _ => false,
        }
    }

    /// One evaluation against the current live-sync position
    pub fn tick<F>(&self, session: &mut PlaybackSession, probe: F) -> bool
    where
        F: FnOnce() -> Option<f64>,
    {
        let before = session.is_behind_live;

        if !session.is_live {
            session.is_behind_live = false;
        } else if session.is_playing {
            match probe() {
                Some(edge) => {
                    let lag = edge - session.current_time;
                    trace!("Live lag {:.1}s", lag);
                    session.is_behind_live = lag > self.threshold;
                }
                None => debug!("{}", PlayerError::LiveSyncUnavailable),
            }
        }

        before != session.is_behind_live
    }
}
