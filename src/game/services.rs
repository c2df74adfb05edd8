//! Collaborator services.
//!
//! The rules engine never reaches for global state. Everything it reports to
//! (HUD, popups, progression, analytics) is handed to it through these
//! traits, so a session, a replay and a test can each plug in their own.

use crate::analytics::AnalyticsSink;
use crate::game::effects::StatusTone;
use crate::game::health::HealthChange;
use crate::game::popup::PopupKind;

/// Health bar and status line.
pub trait HealthSink {
    /// Heal by `amount`.
    fn add_health(&mut self, amount: i32) -> HealthChange;

    /// Damage by `amount`.
    fn reduce_health(&mut self, amount: i32) -> HealthChange;

    /// Current health.
    fn health(&self) -> i32;

    /// Show a status line for `duration_ticks`.
    fn show_status(&mut self, message: &str, tone: StatusTone, duration_ticks: u32);
}

/// One-shot explanatory popups. Each method returns whether the popup
/// actually fired.
pub trait PopupSink {
    /// Wrong shape.
    fn show_shape_mismatch(&mut self) -> bool;

    /// Wrong color.
    fn show_color_mismatch(&mut self) -> bool;

    /// Wrong shape and color.
    fn show_both_mismatch(&mut self) -> bool;

    /// Dispatch on kind.
    fn show_for(&mut self, kind: PopupKind) -> bool {
        match kind {
            PopupKind::ShapeMismatch => self.show_shape_mismatch(),
            PopupKind::ColorMismatch => self.show_color_mismatch(),
            PopupKind::BothMismatch => self.show_both_mismatch(),
        }
    }
}

/// Level progression.
pub trait ProgressionSink {
    /// Mark the current level as completed.
    fn complete_level(&mut self);

    /// Level being played (1-based).
    fn current_level(&self) -> u32;
}

/// Borrowed collaborators for one tick.
pub struct Services<'a> {
    /// Popup latches
    pub popups: &'a mut dyn PopupSink,
    /// Analytics sink
    pub analytics: &'a mut dyn AnalyticsSink,
    /// Level progression
    pub progression: &'a mut dyn ProgressionSink,
}

impl<'a> Services<'a> {
    /// Bundle collaborators.
    pub fn new(
        popups: &'a mut dyn PopupSink,
        analytics: &'a mut dyn AnalyticsSink,
        progression: &'a mut dyn ProgressionSink,
    ) -> Self {
        Self { popups, analytics, progression }
    }
}
