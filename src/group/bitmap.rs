//! Occupancy bitmaps for a single group.
//!
//! A group never holds more than 64 slots, so its bitmap is one machine word
//! and rank/select reduce to a masked `count_ones` and a few bit tricks.

use std::fmt;

/// Number of bytes an encoded bitmap of `bits` slots occupies.
#[inline]
pub const fn encoded_len(bits: usize) -> usize {
    (bits + 7) / 8
}

/// Mask with the lowest `bits` bits set.
#[inline]
pub const fn low_mask(bits: usize) -> u64 {
    if bits >= u64::BITS as usize {
        !0
    } else {
        (1u64 << bits) - 1
    }
}

/// One bit per slot of a group, bit `p` set when position `p` is assigned.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Bitmap(u64);

impl Bitmap {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn test(self, pos: usize) -> bool {
        self.0 & (1 << pos) != 0
    }

    #[inline]
    pub fn set(&mut self, pos: usize) {
        self.0 |= 1 << pos;
    }

    #[inline]
    pub fn clear(&mut self, pos: usize) {
        self.0 &= !(1 << pos);
    }

    #[inline]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Number of set bits strictly below `pos`.
    ///
    /// This is the offset of position `pos` in the group's value buffer.
    #[inline]
    pub const fn pos_to_offset(self, pos: usize) -> usize {
        (self.0 & low_mask(pos)).count_ones() as usize
    }

    /// Position of the set bit whose rank is `offset`.
    ///
    /// Returns 64 if fewer than `offset + 1` bits are set.
    #[inline]
    pub fn offset_to_pos(self, offset: usize) -> usize {
        let mut word = self.0;
        for _ in 0..offset {
            // drop the lowest set bit
            word &= word.wrapping_sub(1);
        }

        word.trailing_zeros() as usize
    }

    /// Iterates the set positions in ascending order.
    #[inline]
    pub const fn ones(self) -> Ones {
        Ones(self.0)
    }

    /// Writes the bitmap as `encoded_len(bits)` bytes, byte `k` holding
    /// positions `8k..8k + 8` with the lowest position in the lowest bit.
    #[inline]
    pub fn to_bytes(self, bits: usize) -> ([u8; 8], usize) {
        (self.0.to_le_bytes(), encoded_len(bits))
    }

    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut word = [0u8; 8];
        word[..bytes.len()].copy_from_slice(bytes);
        Self(u64::from_le_bytes(word))
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({:#b})", self.0)
    }
}

/// Iterator over the set positions of a [`Bitmap`].
#[derive(Clone, Debug)]
pub struct Ones(u64);

impl Iterator for Ones {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }

        let pos = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(pos)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.0.count_ones() as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for Ones {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_rank() {
        let mut bitmap = Bitmap::new();
        for pos in [0, 3, 7, 8, 31, 47] {
            bitmap.set(pos);
        }

        assert_eq!(bitmap.count(), 6);
        assert_eq!(bitmap.pos_to_offset(0), 0);
        assert_eq!(bitmap.pos_to_offset(3), 1);
        assert_eq!(bitmap.pos_to_offset(4), 2);
        assert_eq!(bitmap.pos_to_offset(8), 3);
        assert_eq!(bitmap.pos_to_offset(9), 4);
        assert_eq!(bitmap.pos_to_offset(48), 6);

        let positions: Vec<_> = (0..6).map(|o| bitmap.offset_to_pos(o)).collect();
        assert_eq!(positions, [0, 3, 7, 8, 31, 47]);
        assert_eq!(bitmap.ones().collect::<Vec<_>>(), positions);
    }

    #[test]
    fn full_word() {
        let bitmap = Bitmap::from_bits(!0);
        assert_eq!(bitmap.pos_to_offset(64), 64);
        assert_eq!(bitmap.offset_to_pos(63), 63);
        assert_eq!(Bitmap::new().offset_to_pos(0), 64);
    }

    #[test]
    fn clear_bit() {
        let mut bitmap = Bitmap::from_bits(0b1010);
        bitmap.clear(3);
        bitmap.clear(2);
        assert_eq!(bitmap.bits(), 0b10);
        assert!(bitmap.test(1));
        assert!(!bitmap.test(3));
    }

    #[test]
    fn byte_encoding() {
        let bitmap = Bitmap::from_bits(0x0000_8001_0000_0201);
        let (bytes, len) = bitmap.to_bytes(48);

        assert_eq!(len, 6);
        assert_eq!(&bytes[..len], &[0x01, 0x02, 0x00, 0x00, 0x01, 0x80]);
        assert_eq!(Bitmap::from_bytes(&bytes[..len]), bitmap);
    }
}
