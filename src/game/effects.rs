//! Timed Effects
//!
//! Slowdowns, camera shake, status text and popups are tasks that count down
//! once per tick instead of suspending. Each kind holds at most one task;
//! starting a new one cancels the running one. Every task is tracked by a
//! handle so callers can tell which instance expired or was cancelled.
//!
//! Two clocks drive them:
//!
//! | effect   | clock    | notes                                   |
//! |----------|----------|-----------------------------------------|
//! | slowdown | scaled   | frozen while a popup is up              |
//! | status   | scaled   |                                         |
//! | shake    | unscaled | keeps jittering under a popup           |
//! | popup    | unscaled | pauses the scaled clock while visible   |

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::core::hash::StateHasher;
use crate::core::rng::DeterministicRng;
use crate::game::popup::PopupKind;

/// Identifies one started task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskHandle(pub u32);

/// Which clock advances a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeDomain {
    /// Game time; stops while paused.
    Scaled,
    /// Wall time; runs while paused.
    Unscaled,
}

/// Kind of timed effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EffectKind {
    /// Forward speed multiplier
    Slowdown = 0,
    /// Camera jitter
    Shake = 1,
    /// Status line text
    Status = 2,
    /// Explanatory popup
    Popup = 3,
}

impl EffectKind {
    /// Clock this kind runs on.
    pub fn domain(self) -> TimeDomain {
        match self {
            EffectKind::Slowdown | EffectKind::Status => TimeDomain::Scaled,
            EffectKind::Shake | EffectKind::Popup => TimeDomain::Unscaled,
        }
    }
}

/// Tone of a status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTone {
    /// Green
    Positive,
    /// Red
    Negative,
    /// Default color
    Neutral,
}

/// Countdown shared by all effect kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedTask {
    /// Handle of this instance
    pub handle: TaskHandle,
    /// Ticks still to run
    pub remaining_ticks: u32,
}

impl TimedTask {
    /// Advance one tick. Returns true once the task has run out.
    #[inline]
    fn step(&mut self) -> bool {
        if self.remaining_ticks == 0 {
            return true;
        }
        self.remaining_ticks -= 1;
        false
    }
}

/// Active slowdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slowdown {
    /// Countdown
    pub task: TimedTask,
    /// Speed multiplier while active
    pub factor: Fixed,
}

/// Active camera shake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shake {
    /// Countdown
    pub task: TimedTask,
    /// Max offset per axis
    pub magnitude: Fixed,
    /// Offset for the current tick
    pub offset: (Fixed, Fixed),
}

/// Visible status message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Countdown
    pub task: TimedTask,
    /// Text
    pub text: String,
    /// Color tag
    pub tone: StatusTone,
}

/// Visible popup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupDisplay {
    /// Countdown
    pub task: TimedTask,
    /// Which popup
    pub kind: PopupKind,
}

/// A task that was replaced or cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancelled {
    /// Kind
    pub kind: EffectKind,
    /// Handle of the cancelled instance
    pub handle: TaskHandle,
}

/// All timed effects of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEffects {
    next_handle: u32,
    slowdown: Option<Slowdown>,
    shake: Option<Shake>,
    status: Option<StatusMessage>,
    popup: Option<PopupDisplay>,
}

impl TimedEffects {
    /// No effects running.
    pub fn new() -> Self {
        Self::default()
    }

    fn new_task(&mut self, ticks: u32) -> TimedTask {
        let handle = TaskHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        TimedTask { handle, remaining_ticks: ticks }
    }

    /// Start a slowdown, replacing any running one.
    pub fn start_slowdown(&mut self, factor: Fixed, ticks: u32) -> (TaskHandle, Option<Cancelled>) {
        let task = self.new_task(ticks);
        let replaced = self.slowdown.replace(Slowdown { task, factor });
        debug!(handle = task.handle.0, ticks, "slowdown started");
        (task.handle, replaced.map(|s| cancelled(EffectKind::Slowdown, s.task)))
    }

    /// Start a camera shake, replacing any running one.
    pub fn start_shake(&mut self, magnitude: Fixed, ticks: u32) -> (TaskHandle, Option<Cancelled>) {
        let task = self.new_task(ticks);
        let replaced = self.shake.replace(Shake { task, magnitude, offset: (0, 0) });
        (task.handle, replaced.map(|s| cancelled(EffectKind::Shake, s.task)))
    }

    /// Show a status message, replacing any visible one.
    pub fn show_status(
        &mut self,
        text: impl Into<String>,
        tone: StatusTone,
        ticks: u32,
    ) -> (TaskHandle, Option<Cancelled>) {
        let task = self.new_task(ticks);
        let replaced = self.status.replace(StatusMessage { task, text: text.into(), tone });
        (task.handle, replaced.map(|s| cancelled(EffectKind::Status, s.task)))
    }

    /// Show a popup, replacing any visible one.
    pub fn show_popup(&mut self, kind: PopupKind, ticks: u32) -> (TaskHandle, Option<Cancelled>) {
        let task = self.new_task(ticks);
        let replaced = self.popup.replace(PopupDisplay { task, kind });
        (task.handle, replaced.map(|p| cancelled(EffectKind::Popup, p.task)))
    }

    /// Advance unscaled effects (popup, shake). Returns the kinds that expired.
    pub fn advance_unscaled(&mut self, rng: &mut DeterministicRng) -> Vec<EffectKind> {
        let mut expired = Vec::new();

        if let Some(popup) = self.popup.as_mut() {
            if popup.task.step() {
                self.popup = None;
                expired.push(EffectKind::Popup);
            }
        }

        if let Some(shake) = self.shake.as_mut() {
            if shake.task.step() {
                self.shake = None;
                expired.push(EffectKind::Shake);
            } else {
                shake.offset = (rng.next_signed(shake.magnitude), rng.next_signed(shake.magnitude));
            }
        }

        expired
    }

    /// Advance scaled effects (slowdown, status). Returns the kinds that expired.
    pub fn advance_scaled(&mut self) -> Vec<EffectKind> {
        let mut expired = Vec::new();

        if let Some(slowdown) = self.slowdown.as_mut() {
            if slowdown.task.step() {
                self.slowdown = None;
                expired.push(EffectKind::Slowdown);
            }
        }

        if let Some(status) = self.status.as_mut() {
            if status.task.step() {
                self.status = None;
                expired.push(EffectKind::Status);
            }
        }

        expired
    }

    /// Cancel everything (run ended).
    pub fn cancel_all(&mut self) -> Vec<Cancelled> {
        let mut out = Vec::new();
        if let Some(s) = self.slowdown.take() {
            out.push(cancelled(EffectKind::Slowdown, s.task));
        }
        if let Some(s) = self.shake.take() {
            out.push(cancelled(EffectKind::Shake, s.task));
        }
        if let Some(s) = self.status.take() {
            out.push(cancelled(EffectKind::Status, s.task));
        }
        if let Some(p) = self.popup.take() {
            out.push(cancelled(EffectKind::Popup, p.task));
        }
        out
    }

    /// Forward speed multiplier.
    #[inline]
    pub fn speed_multiplier(&self) -> Fixed {
        self.slowdown.map(|s| s.factor).unwrap_or(FIXED_ONE)
    }

    /// Whether the scaled clock is paused by a popup.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.popup.is_some()
    }

    /// Camera offset for the current tick.
    #[inline]
    pub fn shake_offset(&self) -> (Fixed, Fixed) {
        self.shake.map(|s| s.offset).unwrap_or((0, 0))
    }

    /// Handle of the running task of `kind`, if any.
    pub fn active_handle(&self, kind: EffectKind) -> Option<TaskHandle> {
        match kind {
            EffectKind::Slowdown => self.slowdown.map(|s| s.task.handle),
            EffectKind::Shake => self.shake.map(|s| s.task.handle),
            EffectKind::Status => self.status.as_ref().map(|s| s.task.handle),
            EffectKind::Popup => self.popup.map(|p| p.task.handle),
        }
    }

    /// Visible status message.
    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Visible popup.
    pub fn popup(&self) -> Option<&PopupDisplay> {
        self.popup.as_ref()
    }

    /// Hash running tasks.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.next_handle);
        hasher.update_opt_u32(self.slowdown.map(|s| s.task.remaining_ticks));
        hasher.update_fixed(self.speed_multiplier());
        hasher.update_opt_u32(self.shake.map(|s| s.task.remaining_ticks));
        let (dx, dy) = self.shake_offset();
        hasher.update_fixed(dx);
        hasher.update_fixed(dy);
        hasher.update_opt_u32(self.status.as_ref().map(|s| s.task.remaining_ticks));
        hasher.update_opt_u32(self.popup.map(|p| p.task.remaining_ticks));
    }
}

fn cancelled(kind: EffectKind, task: TimedTask) -> Cancelled {
    Cancelled { kind, handle: task.handle }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_slowdown_runs_for_its_duration() {
        let mut effects = TimedEffects::new();
        let factor = to_fixed(0.4);
        effects.start_slowdown(factor, 3);

        for _ in 0..3 {
            assert!(effects.advance_scaled().is_empty());
            assert_eq!(effects.speed_multiplier(), factor);
        }
        assert_eq!(effects.advance_scaled(), vec![EffectKind::Slowdown]);
        assert_eq!(effects.speed_multiplier(), FIXED_ONE);
    }

    #[test]
    fn test_new_slowdown_replaces_old() {
        let mut effects = TimedEffects::new();
        let (first, none) = effects.start_slowdown(to_fixed(0.4), 90);
        assert!(none.is_none());

        effects.advance_scaled();
        let (second, replaced) = effects.start_slowdown(to_fixed(0.4), 90);
        assert_ne!(first, second);
        assert_eq!(replaced, Some(Cancelled { kind: EffectKind::Slowdown, handle: first }));
        assert_eq!(effects.active_handle(EffectKind::Slowdown), Some(second));

        // Full duration from the restart, no stacking
        for _ in 0..90 {
            assert!(effects.advance_scaled().is_empty());
        }
        assert_eq!(effects.advance_scaled(), vec![EffectKind::Slowdown]);
    }

    #[test]
    fn test_popup_pauses_and_unscaled_clock_hides_it() {
        let mut effects = TimedEffects::new();
        let mut rng = DeterministicRng::new(1);
        effects.show_popup(PopupKind::ShapeMismatch, 2);
        assert!(effects.is_paused());

        assert!(effects.advance_unscaled(&mut rng).is_empty());
        assert!(effects.advance_unscaled(&mut rng).is_empty());
        assert_eq!(effects.advance_unscaled(&mut rng), vec![EffectKind::Popup]);
        assert!(!effects.is_paused());
    }

    #[test]
    fn test_shake_jitters_within_magnitude_then_recenters() {
        let mut effects = TimedEffects::new();
        let mut rng = DeterministicRng::new(42);
        let magnitude = to_fixed(0.3);
        effects.start_shake(magnitude, 4);

        for _ in 0..4 {
            assert!(effects.advance_unscaled(&mut rng).is_empty());
            let (dx, dy) = effects.shake_offset();
            assert!(dx.abs() <= magnitude && dy.abs() <= magnitude);
        }
        assert_eq!(effects.advance_unscaled(&mut rng), vec![EffectKind::Shake]);
        assert_eq!(effects.shake_offset(), (0, 0));
    }

    #[test]
    fn test_status_replaced_and_expires() {
        let mut effects = TimedEffects::new();
        effects.show_status("Match +10", StatusTone::Positive, 60);
        let (_, replaced) = effects.show_status("Wrong Match! -20", StatusTone::Negative, 1);
        assert!(replaced.is_some());
        assert_eq!(effects.status().unwrap().text, "Wrong Match! -20");

        assert!(effects.advance_scaled().is_empty());
        assert_eq!(effects.advance_scaled(), vec![EffectKind::Status]);
        assert!(effects.status().is_none());
    }

    #[test]
    fn test_cancel_all() {
        let mut effects = TimedEffects::new();
        effects.start_slowdown(to_fixed(0.4), 90);
        effects.start_shake(to_fixed(0.3), 12);
        effects.show_popup(PopupKind::ColorMismatch, 90);

        let cancelled = effects.cancel_all();
        assert_eq!(cancelled.len(), 3);
        assert!(!effects.is_paused());
        assert_eq!(effects.speed_multiplier(), FIXED_ONE);
        assert!(effects.cancel_all().is_empty());
    }

    #[test]
    fn test_domains() {
        assert_eq!(EffectKind::Slowdown.domain(), TimeDomain::Scaled);
        assert_eq!(EffectKind::Popup.domain(), TimeDomain::Unscaled);
    }
}
