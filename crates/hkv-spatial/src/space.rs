//! Z-order coordinate space.
//!
//! A `Space` maps points of an N-dimensional integer grid onto a single
//! scalar by bit interleaving (the z-order / Morton family). Z-values are
//! left-justified so they compare lexicographically: bit 63 is always zero,
//! bits 62 down to 6 hold the interleaved coordinate bits, and the low six
//! bits hold the bit length. Interleaving is round-robin starting at
//! dimension 0, so the mapping is deliberately non-symmetric: `(3, 4)` and
//! `(4, 3)` shuffle to different z-values.

use hkv_error::{HkvError, Result};

/// Maximum dimensionality of a space.
pub const MAX_DIMENSIONS: usize = 6;

/// Maximum interleaved bits a z-value can carry.
pub const MAX_Z_BITS: u32 = 57;

const LENGTH_BITS: u32 = 6;

/// An N-dimensional integer coordinate space with inclusive bounds.
#[derive(Debug, Clone)]
pub struct Space {
    lo: Vec<i64>,
    hi: Vec<i64>,
    /// Bits needed per dimension to cover `hi - lo + 1` values.
    x_bits: Vec<u32>,
    /// Dimension index per z bit position.
    interleave: Vec<usize>,
    z_bits: u32,
}

impl Space {
    /// Build a space over inclusive per-dimension bounds. The summed bit
    /// widths must fit a z-value.
    pub fn new(lo: Vec<i64>, hi: Vec<i64>) -> Result<Self> {
        let dimensions = lo.len();
        if dimensions == 0 || dimensions > MAX_DIMENSIONS {
            return Err(HkvError::definition(format!(
                "space: {dimensions} dimensions (1..={MAX_DIMENSIONS})"
            )));
        }
        if hi.len() != dimensions {
            return Err(HkvError::definition(format!(
                "space: {} hi bounds for {dimensions} dimensions",
                hi.len()
            )));
        }
        let mut x_bits = Vec::with_capacity(dimensions);
        let mut z_bits = 0u32;
        for d in 0..dimensions {
            if lo[d] >= hi[d] {
                return Err(HkvError::definition(format!(
                    "space: dimension {d} bounds {}..{}",
                    lo[d], hi[d]
                )));
            }
            // Spans can exceed i64; widen before counting bits.
            let span = (i128::from(hi[d]) - i128::from(lo[d])) as u128;
            let bits = 128 - span.leading_zeros();
            x_bits.push(bits);
            z_bits += bits;
        }
        if z_bits > MAX_Z_BITS {
            return Err(HkvError::definition(format!(
                "space: {z_bits} interleaved bits exceed {MAX_Z_BITS}"
            )));
        }

        // Round-robin interleave, skipping dimensions whose bits are spent,
        // so uneven widths still consume every coordinate bit exactly once.
        let mut interleave = Vec::with_capacity(z_bits as usize);
        let mut remaining = x_bits.clone();
        let mut d = 0usize;
        while interleave.len() < z_bits as usize {
            if remaining[d] > 0 {
                interleave.push(d);
                remaining[d] -= 1;
            }
            d = (d + 1) % dimensions;
        }

        Ok(Self {
            lo,
            hi,
            x_bits,
            interleave,
            z_bits,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.lo.len()
    }

    pub fn z_bits(&self) -> u32 {
        self.z_bits
    }

    /// Bits needed for one coordinate of dimension `d`.
    pub fn x_bits(&self, d: usize) -> u32 {
        self.x_bits[d]
    }

    /// Interleave a point into a z-value at full resolution. Coordinates are
    /// absolute (bounds-relative shifting happens here) and are clamped to
    /// the declared bounds.
    pub fn shuffle(&self, point: &[i64]) -> Result<u64> {
        if point.len() != self.dimensions() {
            return Err(HkvError::shape(format!(
                "space: {} coordinates for {} dimensions",
                point.len(),
                self.dimensions()
            )));
        }
        let mut z = 0u64;
        let mut consumed = vec![0u32; self.dimensions()];
        for (z_pos, &d) in self.interleave.iter().enumerate() {
            let x = (point[d].clamp(self.lo[d], self.hi[d]) - self.lo[d]) as u64;
            let x_bit = consumed[d];
            consumed[d] += 1;
            let bit = (x >> (self.x_bits[d] - 1 - x_bit)) & 1;
            z |= bit << (62 - z_pos);
        }
        Ok(z | u64::from(self.z_bits))
    }

    /// Recover the point a full-resolution z-value was shuffled from.
    pub fn unshuffle(&self, z: u64, point: &mut [i64]) -> Result<()> {
        if point.len() != self.dimensions() {
            return Err(HkvError::shape(format!(
                "space: {} coordinates for {} dimensions",
                point.len(),
                self.dimensions()
            )));
        }
        let length = (z & ((1 << LENGTH_BITS) - 1)) as u32;
        if length != self.z_bits {
            return Err(HkvError::corrupt(format!(
                "z-value length {length}, space has {} bits",
                self.z_bits
            )));
        }
        point.fill(0);
        let mut consumed = vec![0u32; self.dimensions()];
        for (z_pos, &d) in self.interleave.iter().enumerate() {
            let bit = (z >> (62 - z_pos)) & 1;
            let x_bit = consumed[d];
            consumed[d] += 1;
            point[d] |= ((bit as i64) << (self.x_bits[d] - 1 - x_bit)) as i64;
        }
        for d in 0..self.dimensions() {
            point[d] += self.lo[d];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit_square() -> Space {
        Space::new(vec![0, 0], vec![999, 999]).unwrap()
    }

    #[test]
    fn bit_widths_follow_cardinality() {
        let s = unit_square();
        assert_eq!(s.x_bits(0), 10);
        assert_eq!(s.x_bits(1), 10);
        assert_eq!(s.z_bits(), 20);
    }

    #[test]
    fn shuffle_is_deterministic_and_asymmetric() {
        let s = unit_square();
        let a = s.shuffle(&[3, 4]).unwrap();
        let b = s.shuffle(&[3, 4]).unwrap();
        let c = s.shuffle(&[4, 3]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn z_layout_is_left_justified_with_length_suffix() {
        let s = unit_square();
        let z = s.shuffle(&[999, 999]).unwrap();
        assert_eq!(z & 0x3f, 20); // length
        assert_eq!(z >> 63, 0); // top bit clear
        // All interleaved bits sit in bits 62..=43.
        assert_eq!(z >> (63 - 20) << (63 - 20), z & !0x3f);
    }

    #[test]
    fn zero_point_is_length_only() {
        let s = unit_square();
        assert_eq!(s.shuffle(&[0, 0]).unwrap(), 20);
    }

    #[test]
    fn unshuffle_inverts_shuffle() {
        let s = unit_square();
        let mut point = [0i64; 2];
        for p in [[0, 0], [3, 4], [4, 3], [999, 0], [123, 456]] {
            let z = s.shuffle(&p).unwrap();
            s.unshuffle(z, &mut point).unwrap();
            assert_eq!(point, p);
        }
    }

    #[test]
    fn coordinates_clamp_to_bounds() {
        let s = unit_square();
        assert_eq!(s.shuffle(&[2000, -5]).unwrap(), s.shuffle(&[999, 0]).unwrap());
    }

    #[test]
    fn uneven_bit_widths_interleave_fully() {
        let s = Space::new(vec![0, 0], vec![3, 255]).unwrap(); // 2 + 8 bits
        assert_eq!(s.z_bits(), 10);
        let mut point = [0i64; 2];
        let z = s.shuffle(&[2, 200]).unwrap();
        s.unshuffle(z, &mut point).unwrap();
        assert_eq!(point, [2, 200]);
    }

    #[test]
    fn bounds_offset_applies() {
        let s = Space::new(vec![-90, -180], vec![90, 180]).unwrap();
        let mut point = [0i64; 2];
        let z = s.shuffle(&[-45, 170]).unwrap();
        s.unshuffle(z, &mut point).unwrap();
        assert_eq!(point, [-45, 170]);
    }

    #[test]
    fn rejects_oversized_spaces() {
        let r = Space::new(vec![0, 0], vec![i64::MAX - 1, i64::MAX - 1]);
        assert!(matches!(r, Err(HkvError::InvalidDefinition { .. })));
    }

    #[test]
    fn spans_wider_than_i64_are_rejected_not_panicked() {
        let r = Space::new(vec![-2, 0], vec![i64::MAX, 1]);
        assert!(matches!(r, Err(HkvError::InvalidDefinition { .. })));
        let r = Space::new(vec![i64::MIN, 0], vec![i64::MAX, 1]);
        assert!(matches!(r, Err(HkvError::InvalidDefinition { .. })));
    }

    proptest! {
        #[test]
        fn shuffle_round_trip(x in 0i64..1000, y in 0i64..1000) {
            let s = unit_square();
            let z = s.shuffle(&[x, y]).unwrap();
            let mut point = [0i64; 2];
            s.unshuffle(z, &mut point).unwrap();
            prop_assert_eq!(point, [x, y]);
        }

        #[test]
        fn z_order_is_injective_on_the_grid(
            x1 in 0i64..1000, y1 in 0i64..1000,
            x2 in 0i64..1000, y2 in 0i64..1000,
        ) {
            let s = unit_square();
            let za = s.shuffle(&[x1, y1]).unwrap();
            let zb = s.shuffle(&[x2, y2]).unwrap();
            prop_assert_eq!(za == zb, (x1, y1) == (x2, y2));
        }
    }
}
