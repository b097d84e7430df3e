//! Controls visibility state machine
//!
//! Visible/Hidden with a single idle deadline. Every show clears and
//! re-arms the deadline; the hide condition is re-validated when the
//! deadline fires, not when it is armed.

use log::trace;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Conditions checked when the idle deadline fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityGuards {
    /// Playing locally or casting
    pub active: bool,
    pub settings_open: bool,
    pub volume_slider_open: bool,
    pub locked: bool,
}

impl VisibilityGuards {
    pub fn allows_hide(&self) -> bool {
        self.active && !self.settings_open && !self.volume_slider_open && !self.locked
    }
}

#[derive(Debug, Clone)]
pub struct ControlsVisibility {
    state: Visibility,
    delay: Duration,
    deadline: Option<Instant>,
    last_activity: Option<Instant>,
}

impl ControlsVisibility {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: Visibility::Visible,
            delay,
            deadline: None,
            last_activity: None,
        }
    }

    pub fn state(&self) -> Visibility {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Force Visible and restart the idle deadline.
    ///
    /// Returns whether the state changed.
    pub fn show(&mut self, now: Instant) -> bool {
        self.deadline = Some(now + self.delay);
        self.last_activity = Some(now);
        self.set_state(Visibility::Visible)
    }

    /// Fire the deadline if it has passed
    pub fn poll(&mut self, now: Instant, guards: VisibilityGuards) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.try_hide(guards)
            }
            _ => false,
        }
    }

    /// Pointer left the surface: apply the hide condition immediately
    pub fn pointer_left(&mut self, guards: VisibilityGuards) -> bool {
        self.deadline = None;
        self.try_hide(guards)
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Back to the initial state with no deadline armed
    pub fn reset(&mut self) -> bool {
        self.deadline = None;
        self.last_activity = None;
        self.set_state(Visibility::Visible)
    }

    /// Whether the chrome is rendered; a paused local player always shows it
    pub fn is_rendered(&self, guards: VisibilityGuards) -> bool {
        self.state == Visibility::Visible || !guards.active
    }

    fn try_hide(&mut self, guards: VisibilityGuards) -> bool {
        if guards.allows_hide() {
            self.set_state(Visibility::Hidden)
        } else {
            trace!("Keeping controls visible: {:?}", guards);
            false
        }
    }

    fn set_state(&mut self, state: Visibility) -> bool {
        let changed = self.state != state;
        self.state = state;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_secs(3);

    fn playing() -> VisibilityGuards {
        VisibilityGuards {
            active: true,
            ..VisibilityGuards::default()
        }
    }

    #[test]
    fn test_hides_after_idle_delay() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::new(DELAY);
        controls.show(start);

        assert!(!controls.poll(start + Duration::from_millis(2999), playing()));
        assert_eq!(controls.state(), Visibility::Visible);

        assert!(controls.poll(start + DELAY, playing()));
        assert_eq!(controls.state(), Visibility::Hidden);
        assert!(controls.deadline().is_none());
    }

    #[test]
    fn test_pointer_activity_restarts_timer() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::new(DELAY);
        controls.show(start);
        controls.show(start + Duration::from_secs(2));

        assert!(!controls.poll(start + Duration::from_secs(4), playing()));
        assert_eq!(controls.state(), Visibility::Visible);
        assert!(controls.poll(start + Duration::from_secs(5), playing()));
    }

    #[test]
    fn test_open_menu_suppresses_hide_at_fire_time() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::new(DELAY);
        controls.show(start);

        let guards = VisibilityGuards {
            settings_open: true,
            ..playing()
        };
        assert!(!controls.poll(start + Duration::from_secs(10), guards));
        assert_eq!(controls.state(), Visibility::Visible);

        let guards = VisibilityGuards {
            volume_slider_open: true,
            ..playing()
        };
        controls.show(start + Duration::from_secs(10));
        assert!(!controls.poll(start + Duration::from_secs(20), guards));
    }

    #[test]
    fn test_paused_or_locked_never_hides() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::new(DELAY);
        controls.show(start);
        assert!(!controls.poll(start + DELAY, VisibilityGuards::default()));

        controls.show(start);
        let locked = VisibilityGuards {
            locked: true,
            ..playing()
        };
        assert!(!controls.poll(start + DELAY, locked));
    }

    #[test]
    fn test_pointer_leave_hides_immediately() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::new(DELAY);
        controls.show(start);

        assert!(controls.pointer_left(playing()));
        assert_eq!(controls.state(), Visibility::Hidden);
        assert!(controls.deadline().is_none());
    }

    #[test]
    fn test_rendered_when_paused() {
        let mut controls = ControlsVisibility::new(DELAY);
        controls.pointer_left(playing());
        assert!(!controls.is_rendered(playing()));
        assert!(controls.is_rendered(VisibilityGuards::default()));

        assert!(controls.reset());
        assert!(controls.is_rendered(playing()));
    }
}
