//! Shape Stack Resolution
//!
//! Pickups carry one of three base symbols. On stacking levels the player's
//! shape is the last two symbols collected, so the reachable shapes are the
//! three singles plus the nine ordered pairs.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::game::error::GameError;

/// Maximum number of symbols held by a [`ShapeStack`].
pub const STACK_CAPACITY: usize = 2;

// =============================================================================
// SHAPE SYMBOL
// =============================================================================

/// Base shape carried by a pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ShapeSymbol {
    /// C
    Circle = 0,
    /// T
    Triangle = 1,
    /// S
    Square = 2,
}

impl ShapeSymbol {
    /// All symbols in index order.
    pub const ALL: [ShapeSymbol; 3] = [ShapeSymbol::Circle, ShapeSymbol::Triangle, ShapeSymbol::Square];

    /// Symbol for a pickup's shape index (0-2).
    pub fn from_index(index: i64) -> Result<Self, GameError> {
        match index {
            0 => Ok(ShapeSymbol::Circle),
            1 => Ok(ShapeSymbol::Triangle),
            2 => Ok(ShapeSymbol::Square),
            _ => Err(GameError::OutOfRangeIndex {
                what: "shape",
                index,
                len: Self::ALL.len(),
            }),
        }
    }

    /// Single-letter abbreviation used in stack keys.
    #[inline]
    pub fn letter(self) -> char {
        match self {
            ShapeSymbol::Circle => 'C',
            ShapeSymbol::Triangle => 'T',
            ShapeSymbol::Square => 'S',
        }
    }
}

// =============================================================================
// COMPOSITE SHAPE
// =============================================================================

/// The player's effective shape, derived from the shape stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompositeShape {
    /// Single circle. Also the fallback for unknown keys.
    #[default]
    Circle = 0,
    /// Single triangle
    Triangle = 1,
    /// Single square
    Square = 2,
    /// Circle then circle
    CC = 3,
    /// Circle then triangle
    CT = 4,
    /// Circle then square
    CS = 5,
    /// Triangle then circle
    TC = 6,
    /// Triangle then triangle
    TT = 7,
    /// Triangle then square
    TS = 8,
    /// Square then circle
    SC = 9,
    /// Square then triangle
    ST = 10,
    /// Square then square
    SS = 11,
}

impl CompositeShape {
    /// All composite shapes in index order.
    pub const ALL: [CompositeShape; 12] = [
        CompositeShape::Circle,
        CompositeShape::Triangle,
        CompositeShape::Square,
        CompositeShape::CC,
        CompositeShape::CT,
        CompositeShape::CS,
        CompositeShape::TC,
        CompositeShape::TT,
        CompositeShape::TS,
        CompositeShape::SC,
        CompositeShape::ST,
        CompositeShape::SS,
    ];

    /// Stack key for this shape ("C", "CT", ...).
    pub fn key(self) -> &'static str {
        match self {
            CompositeShape::Circle => "C",
            CompositeShape::Triangle => "T",
            CompositeShape::Square => "S",
            CompositeShape::CC => "CC",
            CompositeShape::CT => "CT",
            CompositeShape::CS => "CS",
            CompositeShape::TC => "TC",
            CompositeShape::TT => "TT",
            CompositeShape::TS => "TS",
            CompositeShape::SC => "SC",
            CompositeShape::ST => "ST",
            CompositeShape::SS => "SS",
        }
    }

    /// Look up a stack key. Full names of the single shapes are accepted too.
    pub fn from_key(key: &str) -> Result<Self, GameError> {
        let shape = match key {
            "C" | "Circle" => CompositeShape::Circle,
            "T" | "Triangle" => CompositeShape::Triangle,
            "S" | "Square" => CompositeShape::Square,
            "CC" => CompositeShape::CC,
            "CT" => CompositeShape::CT,
            "CS" => CompositeShape::CS,
            "TC" => CompositeShape::TC,
            "TT" => CompositeShape::TT,
            "TS" => CompositeShape::TS,
            "SC" => CompositeShape::SC,
            "ST" => CompositeShape::ST,
            "SS" => CompositeShape::SS,
            _ => return Err(GameError::UnknownCompositeKey(key.to_string())),
        };
        Ok(shape)
    }

    /// Look up a stack key, falling back to [`CompositeShape::Circle`].
    ///
    /// The fallback hides typos in data, so every use of it is logged.
    pub fn from_key_or_default(key: &str) -> Self {
        match Self::from_key(key) {
            Ok(shape) => shape,
            Err(err) => {
                warn!(%err, "falling back to default shape");
                CompositeShape::default()
            }
        }
    }

    /// The single-symbol shape.
    #[inline]
    pub fn single(symbol: ShapeSymbol) -> Self {
        match symbol {
            ShapeSymbol::Circle => CompositeShape::Circle,
            ShapeSymbol::Triangle => CompositeShape::Triangle,
            ShapeSymbol::Square => CompositeShape::Square,
        }
    }

    /// The two-symbol shape, oldest symbol first.
    #[inline]
    pub fn pair(first: ShapeSymbol, second: ShapeSymbol) -> Self {
        // Pairs are laid out row-major after the three singles.
        Self::ALL[3 + first as usize * 3 + second as usize]
    }

    /// Resolve a stack's contents. An empty stack is the initial Circle.
    pub fn from_symbols(symbols: &[ShapeSymbol]) -> Self {
        match symbols {
            [] => CompositeShape::Circle,
            [only] => Self::single(*only),
            [first, second] => Self::pair(*first, *second),
            _ => {
                let key: String = symbols.iter().map(|s| s.letter()).collect();
                Self::from_key_or_default(&key)
            }
        }
    }

    /// Whether this shape is built from two symbols.
    #[inline]
    pub fn is_stacked(self) -> bool {
        self as u8 >= 3
    }
}

// =============================================================================
// SHAPE STACK
// =============================================================================

/// FIFO of the most recent pickups, at most [`STACK_CAPACITY`] long.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeStack {
    symbols: Vec<ShapeSymbol>,
}

impl ShapeStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { symbols: Vec::with_capacity(STACK_CAPACITY) }
    }

    /// Create a stack from symbols, keeping only the newest ones.
    pub fn from_symbols(symbols: &[ShapeSymbol]) -> Self {
        let mut stack = Self::new();
        for symbol in symbols {
            stack.push(*symbol);
        }
        stack
    }

    /// Append a symbol, returning the evicted oldest one if the stack was full.
    pub fn push(&mut self, symbol: ShapeSymbol) -> Option<ShapeSymbol> {
        let evicted = if self.symbols.len() >= STACK_CAPACITY {
            Some(self.symbols.remove(0))
        } else {
            None
        };
        self.symbols.push(symbol);
        evicted
    }

    /// Symbols, oldest first.
    #[inline]
    pub fn as_slice(&self) -> &[ShapeSymbol] {
        &self.symbols
    }

    /// Number of symbols held.
    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the stack is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Concatenated key, e.g. "CT".
    pub fn key(&self) -> String {
        self.symbols.iter().map(|s| s.letter()).collect()
    }

    /// Composite shape for the current contents.
    #[inline]
    pub fn composite(&self) -> CompositeShape {
        CompositeShape::from_symbols(&self.symbols)
    }

    /// Remove all symbols.
    pub fn clear(&mut self) {
        self.symbols.clear();
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// How pickups change the player's shape on a level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackMode {
    /// The latest pickup replaces the shape.
    #[default]
    Single,
    /// The last two pickups combine into a composite shape.
    Stacked,
}

/// Owns the player's shape stack and current composite shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeResolver {
    mode: StackMode,
    stack: ShapeStack,
    current: CompositeShape,
}

impl ShapeResolver {
    /// Resolver in its level-start state.
    ///
    /// Stacked levels start as a double circle (CC); single levels as Circle.
    pub fn new(mode: StackMode) -> Self {
        match mode {
            StackMode::Single => Self {
                mode,
                stack: ShapeStack::new(),
                current: CompositeShape::Circle,
            },
            StackMode::Stacked => Self::from_stack(ShapeStack::from_symbols(&[
                ShapeSymbol::Circle,
                ShapeSymbol::Circle,
            ])),
        }
    }

    /// Stacked resolver starting from an explicit stack.
    pub fn from_stack(stack: ShapeStack) -> Self {
        let current = stack.composite();
        Self { mode: StackMode::Stacked, stack, current }
    }

    /// Apply a pickup and return the new composite shape.
    pub fn push(&mut self, symbol: ShapeSymbol) -> CompositeShape {
        match self.mode {
            StackMode::Stacked => {
                let evicted = self.stack.push(symbol);
                self.current = self.stack.composite();
                debug!(
                    stack = %self.stack.key(),
                    ?evicted,
                    shape = ?self.current,
                    "shape stack updated"
                );
            }
            StackMode::Single => {
                self.current = CompositeShape::single(symbol);
                debug!(shape = ?self.current, "shape replaced");
            }
        }
        self.current
    }

    /// Return to the level-start state for `mode`.
    pub fn reset(&mut self, mode: StackMode) {
        *self = Self::new(mode);
    }

    /// Current composite shape.
    #[inline]
    pub fn current(&self) -> CompositeShape {
        self.current
    }

    /// Current stacking mode.
    #[inline]
    pub fn mode(&self) -> StackMode {
        self.mode
    }

    /// The underlying stack (empty in single mode).
    #[inline]
    pub fn stack(&self) -> &ShapeStack {
        &self.stack
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    use ShapeSymbol::{Circle as C, Square as S, Triangle as T};

    #[test]
    fn test_push_sequence_evicts_oldest() {
        let mut resolver = ShapeResolver::from_stack(ShapeStack::new());

        assert_eq!(resolver.push(C), CompositeShape::Circle);
        assert_eq!(resolver.stack().as_slice(), &[C]);

        assert_eq!(resolver.push(T), CompositeShape::CT);
        assert_eq!(resolver.stack().as_slice(), &[C, T]);

        assert_eq!(resolver.push(S), CompositeShape::TS);
        assert_eq!(resolver.stack().as_slice(), &[T, S]);
    }

    #[test]
    fn test_stacked_level_starts_as_double_circle() {
        let resolver = ShapeResolver::new(StackMode::Stacked);
        assert_eq!(resolver.current(), CompositeShape::CC);
        assert_eq!(resolver.stack().key(), "CC");
    }

    #[test]
    fn test_single_mode_bypasses_stack() {
        let mut resolver = ShapeResolver::new(StackMode::Single);
        assert_eq!(resolver.current(), CompositeShape::Circle);

        assert_eq!(resolver.push(T), CompositeShape::Triangle);
        assert_eq!(resolver.push(S), CompositeShape::Square);
        assert!(resolver.stack().is_empty());
    }

    #[test]
    fn test_reset_restores_level_start() {
        let mut resolver = ShapeResolver::new(StackMode::Stacked);
        resolver.push(S);
        resolver.push(T);
        assert_eq!(resolver.current(), CompositeShape::ST);

        resolver.reset(StackMode::Stacked);
        assert_eq!(resolver.current(), CompositeShape::CC);

        resolver.reset(StackMode::Single);
        assert_eq!(resolver.mode(), StackMode::Single);
        assert_eq!(resolver.current(), CompositeShape::Circle);
    }

    #[test]
    fn test_all_keys_round_trip_and_are_distinct() {
        let mut seen = BTreeSet::new();
        for shape in CompositeShape::ALL {
            assert_eq!(CompositeShape::from_key(shape.key()).unwrap(), shape);
            assert!(seen.insert(shape.key()));
        }
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn test_pair_layout() {
        assert_eq!(CompositeShape::pair(C, C), CompositeShape::CC);
        assert_eq!(CompositeShape::pair(T, C), CompositeShape::TC);
        assert_eq!(CompositeShape::pair(S, T), CompositeShape::ST);
        assert_eq!(CompositeShape::pair(S, S), CompositeShape::SS);
    }

    #[test]
    fn test_unknown_key_defaults_to_circle() {
        assert!(matches!(
            CompositeShape::from_key("CX"),
            Err(GameError::UnknownCompositeKey(_))
        ));
        assert_eq!(CompositeShape::from_key_or_default("CX"), CompositeShape::Circle);
        assert_eq!(CompositeShape::from_key_or_default(""), CompositeShape::Circle);
    }

    #[test]
    fn test_full_names_accepted() {
        assert_eq!(CompositeShape::from_key("Triangle").unwrap(), CompositeShape::Triangle);
        assert_eq!(CompositeShape::from_key("Square").unwrap(), CompositeShape::Square);
    }

    #[test]
    fn test_symbol_from_index() {
        assert_eq!(ShapeSymbol::from_index(1).unwrap(), T);
        assert!(matches!(
            ShapeSymbol::from_index(3),
            Err(GameError::OutOfRangeIndex { what: "shape", index: 3, len: 3 })
        ));
        assert!(ShapeSymbol::from_index(-1).is_err());
    }

    fn symbol() -> impl Strategy<Value = ShapeSymbol> {
        prop_oneof![Just(C), Just(T), Just(S)]
    }

    proptest! {
        #[test]
        fn prop_stack_never_exceeds_capacity(pushes in prop::collection::vec(symbol(), 0..40)) {
            let mut stack = ShapeStack::new();
            for symbol in &pushes {
                stack.push(*symbol);
                prop_assert!(stack.len() <= STACK_CAPACITY);
            }
            let tail_start = pushes.len().saturating_sub(STACK_CAPACITY);
            prop_assert_eq!(stack.as_slice(), &pushes[tail_start..]);
        }

        #[test]
        fn prop_stack_lookup_is_total(pushes in prop::collection::vec(symbol(), 1..10)) {
            let stack = ShapeStack::from_symbols(&pushes);
            let shape = stack.composite();
            prop_assert_eq!(shape.key(), stack.key());
        }
    }
}
