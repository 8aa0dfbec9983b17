use std::{
    cmp::Ordering,
    fmt,
    io::{Read, Write},
    mem,
    ops::Range,
};

use bytemuck::Pod;

use crate::{
    default_value::DefaultValue,
    error::{Error, Result},
    serialize::{read_be, write_be},
};

use super::{encoded_len, low_mask, Bitmap, GroupBuffer};

/// Number of slots in a group unless another size is requested.
pub const DEFAULT_GROUP_SIZE: usize = 48;

/// A fixed-capacity run of `G` slots storing only its assigned values.
///
/// Assigned values live in an exact-size buffer in ascending position order;
/// the bitmap maps a position to its offset in that buffer. The bitmap's
/// popcount is the buffer's length, so a group is two words.
pub struct SparseGroup<T, const G: usize = DEFAULT_GROUP_SIZE> {
    buffer: GroupBuffer<T>,
    bitmap: Bitmap,
}

impl<T, const G: usize> SparseGroup<T, G> {
    const VALID_SIZE: () = assert!(G > 0 && G <= 64, "group size must be in 1..=64");

    #[inline]
    pub const fn new() -> Self {
        let () = Self::VALID_SIZE;

        Self {
            buffer: GroupBuffer::new(),
            bitmap: Bitmap::new(),
        }
    }

    /// Number of slots, assigned or not.
    #[inline]
    pub const fn capacity(&self) -> usize {
        G
    }

    #[inline]
    pub const fn num_nonempty(&self) -> usize {
        self.bitmap.count()
    }

    #[inline]
    pub const fn bitmap(&self) -> Bitmap {
        self.bitmap
    }

    /// Assigned values in ascending position order.
    #[inline]
    pub fn values(&self) -> &[T] {
        // SAFETY: the buffer holds one value per set bit.
        unsafe { self.buffer.as_slice(self.num_nonempty()) }
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        let len = self.num_nonempty();
        // SAFETY: the buffer holds one value per set bit.
        unsafe { self.buffer.as_mut_slice(len) }
    }

    #[inline]
    pub fn test(&self, pos: usize) -> bool {
        debug_assert!(pos < G);
        self.bitmap.test(pos)
    }

    #[inline]
    pub fn pos_to_offset(&self, pos: usize) -> usize {
        self.bitmap.pos_to_offset(pos)
    }

    #[inline]
    pub fn offset_to_pos(&self, offset: usize) -> usize {
        debug_assert!(offset < self.num_nonempty());
        self.bitmap.offset_to_pos(offset)
    }

    #[inline]
    pub fn try_get(&self, pos: usize) -> Option<&T> {
        if self.test(pos) {
            Some(&self.values()[self.pos_to_offset(pos)])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut T> {
        if self.test(pos) {
            let offset = self.pos_to_offset(pos);
            Some(&mut self.values_mut()[offset])
        } else {
            None
        }
    }

    /// # Safety
    /// - `pos` must be assigned.
    #[inline]
    pub unsafe fn get_unchecked(&self, pos: usize) -> &T {
        debug_assert!(self.test(pos));
        let offset = self.pos_to_offset(pos);
        unsafe { self.values().get_unchecked(offset) }
    }

    /// Assigns `value` to `pos`, replacing any previous value in place.
    pub fn set(&mut self, pos: usize, value: T) -> &mut T {
        let offset = self.pos_to_offset(pos);

        if self.test(pos) {
            self.values_mut()[offset] = value;
        } else {
            let len = self.num_nonempty();
            // SAFETY: the buffer holds one value per set bit; the bit is set
            // right after, matching the new length.
            unsafe { self.buffer.insert(len, offset, value) };
            self.bitmap.set(pos);
        }

        &mut self.values_mut()[offset]
    }

    /// Returns the value at `pos`, assigning `T::default()` first if the slot
    /// was unassigned.
    pub fn mutating_get(&mut self, pos: usize) -> &mut T
    where
        T: Default,
    {
        if !self.test(pos) {
            return self.set(pos, T::default());
        }

        let offset = self.pos_to_offset(pos);
        &mut self.values_mut()[offset]
    }

    /// Unassigns `pos`, returning its value. Does nothing if already
    /// unassigned.
    pub fn erase(&mut self, pos: usize) -> Option<T> {
        if !self.test(pos) {
            return None;
        }

        let len = self.num_nonempty();
        let offset = self.pos_to_offset(pos);
        // SAFETY: the buffer holds one value per set bit; the bit is cleared
        // right after, matching the new length.
        let value = unsafe { self.buffer.remove(len, offset) };
        self.bitmap.clear(pos);
        Some(value)
    }

    /// Unassigns every position in `range`, one at a time.
    pub fn erase_range(&mut self, range: Range<usize>) {
        debug_assert!(range.end <= G);

        for pos in range {
            self.erase(pos);
        }
    }

    /// Drops every value, releasing the storage.
    #[inline]
    pub fn clear(&mut self) {
        let len = self.num_nonempty();
        self.bitmap = Bitmap::new();
        // SAFETY: the buffer held one value per set bit.
        unsafe { self.buffer.clear(len) };
    }

    /// Detaches the assigned values, leaving the group cleared.
    #[inline]
    pub fn take_values(&mut self) -> Vec<T> {
        let len = self.num_nonempty();
        self.bitmap = Bitmap::new();
        // SAFETY: the buffer held one value per set bit.
        unsafe { mem::take(&mut self.buffer).into_vec(len) }
    }

    /// Iterates every position, yielding the default value for unassigned
    /// ones.
    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_
    where
        T: DefaultValue,
    {
        let default = T::default_ref();
        (0..G).map(move |pos| self.try_get(pos).unwrap_or(default))
    }

    /// Writes the occupancy as a 2-byte big-endian number followed by the
    /// bitmap bytes.
    pub fn write_metadata<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_be(writer, self.num_nonempty() as u64, 2)?;

        let (bytes, len) = self.bitmap.to_bytes(G);
        writer.write_all(&bytes[..len])?;

        Ok(())
    }

    /// Reads what [`write_metadata`](Self::write_metadata) wrote.
    ///
    /// Storage for the assigned positions is allocated and filled with
    /// `T::default()`; the values are expected to be overwritten by a
    /// following data pass. On error the group is left cleared.
    pub fn read_metadata<R: Read>(&mut self, reader: &mut R) -> Result<()>
    where
        T: Default,
    {
        self.clear();

        let occupancy = read_be(reader, 2)? as u16;

        let mut bytes = [0u8; 8];
        reader.read_exact(&mut bytes[..encoded_len(G)])?;
        let bitmap = Bitmap::from_bytes(&bytes[..encoded_len(G)]);

        if bitmap.count() != occupancy as usize || bitmap.bits() & !low_mask(G) != 0 {
            return Err(Error::InvalidGroup {
                occupancy,
                bitmap: bitmap.bits(),
            });
        }

        let values = (0..occupancy).map(|_| T::default()).collect();
        self.buffer = GroupBuffer::from_vec(values);
        self.bitmap = bitmap;

        Ok(())
    }

    /// Writes the raw bytes of every assigned value in position order.
    pub fn write_pod_data<W: Write>(&self, writer: &mut W) -> Result<()>
    where
        T: Pod,
    {
        for value in self.values() {
            writer.write_all(bytemuck::bytes_of(value))?;
        }

        Ok(())
    }

    /// Overwrites every assigned value with raw bytes read in position order.
    pub fn read_pod_data<R: Read>(&mut self, reader: &mut R) -> Result<()>
    where
        T: Pod,
    {
        for value in self.values_mut() {
            reader.read_exact(bytemuck::bytes_of_mut(value))?;
        }

        Ok(())
    }
}

impl<T: DefaultValue, const G: usize> SparseGroup<T, G> {
    /// Returns the value at `pos`, or the shared default if unassigned.
    #[inline]
    pub fn get(&self, pos: usize) -> &T {
        match self.try_get(pos) {
            Some(value) => value,
            None => T::default_ref(),
        }
    }
}

impl<T, const G: usize> Default for SparseGroup<T, G> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const G: usize> Clone for SparseGroup<T, G> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            buffer: GroupBuffer::from_vec(self.values().to_vec()),
            bitmap: self.bitmap,
        }
    }
}

impl<T, const G: usize> Drop for SparseGroup<T, G> {
    #[inline]
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, const G: usize> fmt::Debug for SparseGroup<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.bitmap.ones().zip(self.values()))
            .finish()
    }
}

impl<T: PartialEq, const G: usize> PartialEq for SparseGroup<T, G> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        // equal bitmaps put defaults at the same positions, so only the
        // assigned values remain to compare
        self.num_nonempty() == other.num_nonempty()
            && self.bitmap == other.bitmap
            && self.values() == other.values()
    }
}

impl<T: Eq, const G: usize> Eq for SparseGroup<T, G> {}

/// Groups order lexicographically by their dense sequence of values. Groups
/// with equal sequences fall back to comparing bitmaps, so an explicitly
/// assigned default never compares equal to an unassigned slot.
impl<T: PartialOrd + DefaultValue, const G: usize> PartialOrd for SparseGroup<T, G> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.iter().partial_cmp(other.iter()) {
            Some(Ordering::Equal) => Some(self.bitmap.bits().cmp(&other.bitmap.bits())),
            ordering => ordering,
        }
    }
}

impl<T: Ord + DefaultValue, const G: usize> Ord for SparseGroup<T, G> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter()
            .cmp(other.iter())
            .then_with(|| self.bitmap.bits().cmp(&other.bitmap.bits()))
    }
}
