//! Player Color

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

/// Colors a player or obstacle can carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayerColor {
    /// Starting color
    #[default]
    Black = 0,
    /// Reached with one toggle
    Red = 1,
}

/// Index into a fixed palette that cycles on each toggle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorState {
    palette: Vec<PlayerColor>,
    index: usize,
}

impl ColorState {
    /// Start at the first palette entry.
    ///
    /// An empty palette disables toggling; the player stays Black.
    pub fn new(palette: Vec<PlayerColor>) -> Self {
        if palette.is_empty() {
            warn!("empty color palette, color toggling disabled");
        }
        Self { palette, index: 0 }
    }

    /// Current color.
    #[inline]
    pub fn current(&self) -> PlayerColor {
        self.palette.get(self.index).copied().unwrap_or_default()
    }

    /// Current palette index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance to the next palette entry, wrapping around.
    pub fn toggle(&mut self) -> PlayerColor {
        if !self.palette.is_empty() {
            self.index = (self.index + 1) % self.palette.len();
            debug!(index = self.index, color = ?self.current(), "player color changed");
        }
        self.current()
    }
}

impl Default for ColorState {
    fn default() -> Self {
        Self::new(vec![PlayerColor::Black, PlayerColor::Red])
    }
}
