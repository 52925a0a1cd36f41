//! Exact decimal values.
//!
//! `Decimal` is a scaled 64-bit integer: the numeric value is
//! `unscaled * 10^(-scale)`. Values are canonicalized on construction so two
//! numerically equal decimals (`1.5` and `1.50`) have one representation and
//! therefore one key encoding.

use std::cmp::Ordering;
use std::fmt;

/// Largest representable scale. Eighteen fractional digits is the most an
/// `i64` unscaled value can meaningfully carry.
pub const MAX_SCALE: u8 = 18;

/// An exact decimal number: `unscaled * 10^(-scale)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Decimal {
    unscaled: i64,
    scale: u8,
}

impl Decimal {
    /// Create a canonical decimal. Returns `None` if `scale` exceeds
    /// [`MAX_SCALE`].
    pub fn new(mut unscaled: i64, mut scale: u8) -> Option<Self> {
        if scale > MAX_SCALE {
            return None;
        }
        if unscaled == 0 {
            scale = 0;
        }
        while scale > 0 && unscaled % 10 == 0 {
            unscaled /= 10;
            scale -= 1;
        }
        Some(Self { unscaled, scale })
    }

    /// A decimal holding an integer value.
    pub fn from_int(value: i64) -> Self {
        Self {
            unscaled: value,
            scale: 0,
        }
    }

    pub const fn unscaled(self) -> i64 {
        self.unscaled
    }

    pub const fn scale(self) -> u8 {
        self.scale
    }

    pub const fn is_zero(self) -> bool {
        self.unscaled == 0
    }

    /// Approximate conversion for spatial binding. Exactness is not required
    /// there; determinism is, and this is a pure function of the value.
    pub fn to_f64(self) -> f64 {
        self.unscaled as f64 / 10f64.powi(i32::from(self.scale))
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        // Rescale to the common scale in 128 bits; 10^18 * i64 cannot
        // overflow an i128.
        let a = i128::from(self.unscaled) * 10i128.pow(u32::from(other.scale));
        let b = i128::from(other.unscaled) * 10i128.pow(u32::from(self.scale));
        a.cmp(&b)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let mag = self.unscaled.unsigned_abs();
        let pow = 10u64.pow(u32::from(self.scale));
        let int = mag / pow;
        let frac = mag % pow;
        write!(
            f,
            "{sign}{int}.{frac:0width$}",
            width = usize::from(self.scale)
        )
    }
}
