//! Input Frames
//!
//! Inputs are edge-triggered: a set bit means the key went down this frame.
//! Holding a key does nothing after the first frame, which matches the
//! one-lane-per-press movement.

use serde::{Serialize, Deserialize};

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Actions pressed during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct InputFrame {
    /// Action flags (packed bits):
    /// - Bit 0: move left
    /// - Bit 1: move right
    /// - Bit 2: toggle color
    /// - Bit 3: restart (terminal phases only)
    /// - Bit 4: next level (after completion only)
    /// - Bit 5-7: Reserved
    pub flags: u8,
}

impl InputFrame {
    /// Move left flag bit
    pub const FLAG_LEFT: u8 = 0x01;

    /// Move right flag bit
    pub const FLAG_RIGHT: u8 = 0x02;

    /// Color toggle flag bit
    pub const FLAG_COLOR: u8 = 0x04;

    /// Restart flag bit
    pub const FLAG_RESTART: u8 = 0x08;

    /// Next level flag bit
    pub const FLAG_NEXT: u8 = 0x10;

    /// Empty frame.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Frame with the given raw flags.
    pub const fn from_flags(flags: u8) -> Self {
        Self { flags }
    }

    /// Left pressed.
    pub const fn left() -> Self {
        Self::from_flags(Self::FLAG_LEFT)
    }

    /// Right pressed.
    pub const fn right() -> Self {
        Self::from_flags(Self::FLAG_RIGHT)
    }

    /// Color toggle pressed.
    pub const fn color() -> Self {
        Self::from_flags(Self::FLAG_COLOR)
    }

    /// Restart pressed.
    pub const fn restart() -> Self {
        Self::from_flags(Self::FLAG_RESTART)
    }

    /// Next level pressed.
    pub const fn next() -> Self {
        Self::from_flags(Self::FLAG_NEXT)
    }

    /// Combine two frames.
    pub const fn with(self, other: InputFrame) -> Self {
        Self::from_flags(self.flags | other.flags)
    }

    /// Lane step for this frame: -1, 0 or +1. Left wins over right.
    #[inline]
    pub fn lane_step(&self) -> i8 {
        if self.flags & Self::FLAG_LEFT != 0 {
            -1
        } else if self.flags & Self::FLAG_RIGHT != 0 {
            1
        } else {
            0
        }
    }

    /// Check if color toggle was pressed.
    #[inline]
    pub fn color_pressed(&self) -> bool {
        self.flags & Self::FLAG_COLOR != 0
    }

    /// Check if restart was pressed.
    #[inline]
    pub fn restart_pressed(&self) -> bool {
        self.flags & Self::FLAG_RESTART != 0
    }

    /// Check if next level was pressed.
    #[inline]
    pub fn next_pressed(&self) -> bool {
        self.flags & Self::FLAG_NEXT != 0
    }

    /// Check if this is an idle frame.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.flags == 0
    }
}

/// Input tagged with the step it was applied on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedInput {
    /// Step index (0-based, counted from the start of the run)
    pub step: u32,
    /// The input frame
    pub frame: InputFrame,
}

// =============================================================================
// INPUT LOG
// =============================================================================

/// Sparse recording of one run's inputs.
///
/// Idle frames are not stored; any step without an entry replays as idle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLog {
    entries: Vec<RecordedInput>,
    /// Number of steps the run lasted
    pub step_count: u32,
}

impl InputLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the input applied on `step`.
    pub fn record(&mut self, step: u32, frame: InputFrame) {
        self.step_count = self.step_count.max(step + 1);
        if !frame.is_idle() {
            self.entries.push(RecordedInput { step, frame });
        }
    }

    /// Input applied on `step`.
    pub fn get_input_at(&self, step: u32) -> InputFrame {
        let idx = self.entries.partition_point(|e| e.step < step);
        match self.entries.get(idx) {
            Some(entry) if entry.step == step => entry.frame,
            _ => InputFrame::new(),
        }
    }

    /// Stored (non-idle) entries.
    pub fn entries(&self) -> &[RecordedInput] {
        &self.entries
    }

    /// Iterate every step, idle ones included.
    pub fn replay_iter(&self) -> impl Iterator<Item = (u32, InputFrame)> + '_ {
        let mut entries = self.entries.iter().peekable();
        (0..self.step_count).map(move |step| {
            match entries.next_if(|e| e.step == step) {
                Some(entry) => (step, entry.frame),
                None => (step, InputFrame::new()),
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
