//! Q16.16 Fixed-Point Arithmetic
//!
//! Positions and speeds along the track are fixed-point so a run replays
//! bit-for-bit from the same inputs. Floats only appear at the edges:
//! configuration loading and analytics/display output.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A level is a few hundred units long, so the range is ample.

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

// =============================================================================
// CONVERSIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// ```
/// use morph_runner::core::fixed::{to_fixed, FIXED_ONE};
/// const TWO_AND_A_HALF: i32 = to_fixed(2.5);
/// assert_eq!(TWO_AND_A_HALF, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert a runtime float (config values) to fixed-point.
///
/// Only used while building a run from configuration, never in the tick loop.
#[inline]
pub fn from_f32(f: f32) -> Fixed {
    (f as f64 * FIXED_ONE as f64).round() as Fixed
}

/// Convert fixed-point to float for display and analytics.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Multiply two fixed-point numbers.
///
/// Uses an i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Distance covered in one tick at `speed` units per second.
#[inline]
pub fn per_tick(speed: Fixed, tick_rate: u32) -> Fixed {
    if tick_rate == 0 {
        return 0;
    }
    speed / tick_rate as Fixed
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed(1.0), FIXED_ONE);
        assert_eq!(to_fixed(0.5), 32768);
        assert_eq!(to_fixed(-2.0), -2 * FIXED_ONE);
    }

    #[test]
    fn test_from_f32_matches_const_conversion() {
        assert_eq!(from_f32(0.4), 26214);
        assert_eq!(from_f32(3.0), to_fixed(3.0));
        assert_eq!(from_f32(-2.0), to_fixed(-2.0));
    }

    #[test]
    fn test_fixed_mul() {
        assert_eq!(fixed_mul(to_fixed(2.0), to_fixed(3.0)), to_fixed(6.0));
        assert_eq!(fixed_mul(to_fixed(0.5), to_fixed(0.5)), to_fixed(0.25));
        assert_eq!(fixed_mul(to_fixed(-2.0), to_fixed(3.0)), to_fixed(-6.0));
    }

    #[test]
    fn test_per_tick() {
        // 3 units/s at 60 Hz = 0.05 units per tick
        assert_eq!(per_tick(to_fixed(3.0), 60), 3276);
        assert_eq!(per_tick(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(to_fixed(0.5)), 0.5);
        assert_eq!(to_float(to_fixed(-12.0)), -12.0);
    }
}
