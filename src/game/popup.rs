//! Mismatch Popups
//!
//! Each kind of mismatch explains itself once per process. The latches live
//! on the session so they survive restarts and level changes, and are reset
//! only by an explicit call.

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::game::services::PopupSink;

/// Explanatory popup shown after a mismatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PopupKind {
    /// Wrong shape, right color
    ShapeMismatch = 0,
    /// Right shape, wrong color
    ColorMismatch = 1,
    /// Both wrong
    BothMismatch = 2,
}

impl PopupKind {
    /// Popup heading.
    pub fn title(self) -> &'static str {
        match self {
            PopupKind::ShapeMismatch => "Shape Mismatch",
            PopupKind::ColorMismatch => "Color Mismatch",
            PopupKind::BothMismatch => "Shape & Color Mismatch",
        }
    }

    /// Popup body.
    pub fn message(self) -> &'static str {
        match self {
            PopupKind::ShapeMismatch => "Transform to match the obstacle shape!",
            PopupKind::ColorMismatch => "Use SPACEBAR to change color!",
            PopupKind::BothMismatch => "Correct shape and use SPACEBAR\nto change color!",
        }
    }
}

/// One-shot latches for the three popup kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupLatches {
    shape_shown: bool,
    color_shown: bool,
    both_shown: bool,
}

impl PopupLatches {
    /// All popups armed.
    pub fn new() -> Self {
        Self::default()
    }

    fn latch(&mut self, kind: PopupKind) -> &mut bool {
        match kind {
            PopupKind::ShapeMismatch => &mut self.shape_shown,
            PopupKind::ColorMismatch => &mut self.color_shown,
            PopupKind::BothMismatch => &mut self.both_shown,
        }
    }

    /// Fire `kind` if it has never fired. Returns whether it fired now.
    pub fn try_show(&mut self, kind: PopupKind) -> bool {
        let latch = self.latch(kind);
        if *latch {
            debug!(?kind, "popup already shown, skipping");
            return false;
        }
        *latch = true;
        info!(?kind, title = kind.title(), "showing popup");
        true
    }

    /// Whether `kind` has fired.
    pub fn has_shown(&self, kind: PopupKind) -> bool {
        match kind {
            PopupKind::ShapeMismatch => self.shape_shown,
            PopupKind::ColorMismatch => self.color_shown,
            PopupKind::BothMismatch => self.both_shown,
        }
    }

    /// Re-arm every popup.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl PopupSink for PopupLatches {
    fn show_shape_mismatch(&mut self) -> bool {
        self.try_show(PopupKind::ShapeMismatch)
    }

    fn show_color_mismatch(&mut self) -> bool {
        self.try_show(PopupKind::ColorMismatch)
    }

    fn show_both_mismatch(&mut self) -> bool {
        self.try_show(PopupKind::BothMismatch)
    }
}
