//! Health Bookkeeping
//!
//! Health drains by one point per fixed interval while the run is live and
//! moves by fixed amounts on gate outcomes. It is clamped to `[0, max]`.
//! Reaching zero reports depletion exactly once; after that, and after the
//! tracker is locked at the end of a run, every change is a no-op.

use serde::{Serialize, Deserialize};

/// Effect of one health change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChange {
    /// Health before
    pub old: i32,
    /// Health after
    pub new: i32,
    /// True only for the change that first reached zero
    pub depleted: bool,
}

impl HealthChange {
    fn unchanged(value: i32) -> Self {
        Self { old: value, new: value, depleted: false }
    }

    /// Whether health actually moved.
    #[inline]
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// Clamped health with passive drain and a one-shot depletion latch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthTracker {
    max: i32,
    current: i32,
    drain_interval_ticks: u32,
    drain_timer: u32,
    depleted: bool,
    locked: bool,
}

impl HealthTracker {
    /// Full health, draining one point every `drain_interval_ticks`.
    pub fn new(max: i32, drain_interval_ticks: u32) -> Self {
        let max = max.max(1);
        Self {
            max,
            current: max,
            drain_interval_ticks: drain_interval_ticks.max(1),
            drain_timer: 0,
            depleted: false,
            locked: false,
        }
    }

    /// Current health.
    #[inline]
    pub fn current(&self) -> i32 {
        self.current
    }

    /// Maximum health.
    #[inline]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Fraction of max health remaining (for display).
    pub fn percentage(&self) -> f32 {
        self.current as f32 / self.max as f32
    }

    /// Whether health has reached zero.
    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.depleted
    }

    /// Whether further changes are ignored.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Stop accepting changes (run ended).
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Heal, never exceeding max.
    pub fn add(&mut self, amount: i32) -> HealthChange {
        if self.locked {
            return HealthChange::unchanged(self.current);
        }
        let old = self.current;
        self.current = old.saturating_add(amount.max(0)).min(self.max);
        HealthChange { old, new: self.current, depleted: false }
    }

    /// Damage, never going below zero. Locks the tracker on depletion.
    pub fn reduce(&mut self, amount: i32) -> HealthChange {
        if self.locked {
            return HealthChange::unchanged(self.current);
        }
        let old = self.current;
        self.current = old.saturating_sub(amount.max(0)).max(0);

        let depleted = self.current == 0 && !self.depleted;
        if depleted {
            self.depleted = true;
            self.locked = true;
        }
        HealthChange { old, new: self.current, depleted }
    }

    /// Advance the passive drain by one tick.
    pub fn tick_passive(&mut self) -> Option<HealthChange> {
        if self.locked {
            return None;
        }
        self.drain_timer += 1;
        if self.drain_timer < self.drain_interval_ticks {
            return None;
        }
        self.drain_timer = 0;
        Some(self.reduce(1))
    }
}

// =============================================================================
// TESTS
// =============================================================================
