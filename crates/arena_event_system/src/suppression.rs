//! Pause and single-step control for scripted subscribers.
//!
//! While paused, events reach subscribers only as long as the step budget
//! is positive. Each delivered Tick spends one step, so `add_steps(n)` lets
//! a frozen bot run exactly `n` more ticks.

use std::cell::Cell;
use tracing::{debug, info};

/// Budget value meaning "not stepping".
pub const INACTIVE_STEP_BUDGET: i32 = -1;

/// Global pause flag and step budget.
#[derive(Debug)]
pub struct SuppressionState {
    paused: Cell<bool>,
    step_budget: Cell<i32>,
}

impl SuppressionState {
    pub fn new() -> Self {
        Self {
            paused: Cell::new(false),
            step_budget: Cell::new(INACTIVE_STEP_BUDGET),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.set(paused);
        if paused {
            info!("⏸️ Scripted subscribers paused");
        } else {
            info!("▶️ Scripted subscribers resumed");
        }
    }

    pub fn toggle_pause(&self) {
        self.set_paused(!self.paused.get());
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    #[inline]
    pub fn step_budget(&self) -> i32 {
        self.step_budget.get()
    }

    /// Lets paused subscribers receive the next `steps` ticks.
    ///
    /// Ignored unless paused, so resuming and stepping together cannot leave
    /// a bot running extra steps as the simulation resumes.
    pub fn add_steps(&self, steps: i32) {
        if self.paused.get() {
            self.step_budget.set(steps);
            info!("⏭️ Stepping scripted subscribers {} tick(s)", steps);
        } else {
            debug!("Ignoring request for {} step(s): not paused", steps);
        }
    }

    /// Whether an event with `live_subscribers` listeners should be skipped.
    pub fn should_suppress(&self, live_subscribers: usize) -> bool {
        if live_subscribers == 0 {
            return true;
        }
        self.paused.get() && self.step_budget.get() <= 0
    }

    /// Spends one step for a delivered Tick. The budget is only consulted
    /// while paused, so it only moves while paused.
    pub fn consume_tick(&self) {
        if self.paused.get() {
            self.step_budget.set(self.step_budget.get() - 1);
        }
    }
}

impl Default for SuppressionState {
    fn default() -> Self {
        Self::new()
    }
}
