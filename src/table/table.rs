use std::{
    cmp::Ordering,
    fmt,
    io::{Read, Write},
    mem,
    ops::{Index, Range},
};

use bytemuck::Pod;

use crate::{
    default_value::DefaultValue,
    error::{Error, Result},
    group::{SparseGroup, DEFAULT_GROUP_SIZE},
    serialize::{read_u32_or_u64, write_u32_or_u64, ValueSerializer, MAGIC_NUMBER},
};

use super::{CursorMut, Drain, ElementMut, Indexed, Iter, NonEmpty, NonEmptyMut, NonEmptyPos};

/// A fixed-size array over `[0, len)` that stores only its assigned slots.
///
/// Slots are grouped `G` at a time; group `k` covers indices
/// `k * G..(k + 1) * G`. Reading an unassigned slot yields a shared default
/// value and never allocates.
///
/// Iterators borrow the table, so any assignment, erasure, resize or clear
/// ends every outstanding traversal.
#[derive(Clone)]
pub struct SparseTable<T, const G: usize = DEFAULT_GROUP_SIZE> {
    groups: Vec<SparseGroup<T, G>>,
    size: usize,
    num_nonempty: usize,
}

impl<T, const G: usize> SparseTable<T, G> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            groups: Vec::new(),
            size: 0,
            num_nonempty: 0,
        }
    }

    /// Creates a table of `len` unassigned slots.
    #[inline]
    pub fn with_len(len: usize) -> Self {
        let mut table = Self::new();
        table.resize(len);
        table
    }

    #[inline]
    const fn num_groups(len: usize) -> usize {
        if len == 0 {
            0
        } else {
            (len - 1) / G + 1
        }
    }

    #[inline]
    #[track_caller]
    fn check_index(&self, index: usize) {
        assert!(
            index < self.size,
            "index {index} out of range for sparse table of length {}",
            self.size
        );
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the table has no slots at all.
    ///
    /// A table of unassigned slots is not empty; see
    /// [`num_nonempty`](Self::num_nonempty).
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of assigned slots.
    #[inline]
    pub const fn num_nonempty(&self) -> usize {
        self.num_nonempty
    }

    #[inline]
    pub fn groups(&self) -> &[SparseGroup<T, G>] {
        &self.groups
    }

    #[inline]
    #[track_caller]
    pub fn test(&self, index: usize) -> bool {
        self.check_index(index);
        self.groups[index / G].test(index % G)
    }

    #[inline]
    #[track_caller]
    pub fn try_get(&self, index: usize) -> Option<&T> {
        self.check_index(index);
        self.groups[index / G].try_get(index % G)
    }

    #[inline]
    #[track_caller]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.check_index(index);
        self.groups[index / G].get_mut(index % G)
    }

    /// # Safety
    /// - `index` must be in bounds and assigned.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.size);

        // SAFETY: `index < size` puts the group in bounds, and the caller
        // guarantees the slot is assigned.
        unsafe {
            self.groups
                .get_unchecked(index / G)
                .get_unchecked(index % G)
        }
    }

    /// Assigns `value` to `index`, returning a reference to the stored value.
    #[inline]
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) -> &mut T {
        self.check_index(index);

        let group = &mut self.groups[index / G];
        if !group.test(index % G) {
            self.num_nonempty += 1;
        }

        group.set(index % G, value)
    }

    /// Returns the value at `index`, assigning `T::default()` first if the
    /// slot was unassigned.
    #[inline]
    #[track_caller]
    pub fn mutating_get(&mut self, index: usize) -> &mut T
    where
        T: Default,
    {
        self.check_index(index);

        let group = &mut self.groups[index / G];
        if !group.test(index % G) {
            self.num_nonempty += 1;
        }

        group.mutating_get(index % G)
    }

    /// Unassigns `index`, returning its value if it had one.
    #[inline]
    #[track_caller]
    pub fn erase(&mut self, index: usize) -> Option<T> {
        self.check_index(index);

        let value = self.groups[index / G].erase(index % G);
        if value.is_some() {
            self.num_nonempty -= 1;
        }

        value
    }

    #[track_caller]
    pub fn erase_range(&mut self, range: Range<usize>) {
        assert!(
            range.start <= range.end && range.end <= self.size,
            "range {range:?} out of range for sparse table of length {}",
            self.size
        );

        for index in range {
            self.erase(index);
        }
    }

    /// Unassigns every slot, keeping the length.
    pub fn clear(&mut self) {
        for group in self.groups.iter_mut() {
            group.clear();
        }

        self.num_nonempty = 0;
    }

    /// Changes the length to `new_len`.
    ///
    /// Growing appends unassigned slots. Shrinking drops every value at or
    /// past `new_len`; growing again later does not bring them back.
    pub fn resize(&mut self, new_len: usize) {
        let old_len = self.size;
        self.groups
            .resize_with(Self::num_groups(new_len), SparseGroup::new);

        if new_len < old_len {
            let tail = new_len % G;
            if tail > 0 {
                if let Some(last) = self.groups.last_mut() {
                    last.erase_range(tail..G);
                }
            }

            self.num_nonempty = self.groups.iter().map(SparseGroup::num_nonempty).sum();

            #[cfg(feature = "tracing")]
            tracing::debug!(
                old_len,
                new_len,
                num_nonempty = self.num_nonempty,
                "shrank sparse table"
            );
        }

        self.size = new_len;
    }

    /// Exchanges the contents of two tables.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.groups, &mut other.groups);
        mem::swap(&mut self.size, &mut other.size);
        mem::swap(&mut self.num_nonempty, &mut other.num_nonempty);
    }

    /// Number of assigned slots before `index`.
    #[track_caller]
    pub fn rank(&self, index: usize) -> usize {
        assert!(index <= self.size, "rank index {index} past table end");

        let group = index / G;
        let before: usize = self.groups[..group]
            .iter()
            .map(SparseGroup::num_nonempty)
            .sum();

        match self.groups.get(group) {
            Some(last) => before + last.pos_to_offset(index % G),
            None => before,
        }
    }

    /// Index of the assigned slot with rank `k`, in ascending index order.
    pub fn select(&self, mut k: usize) -> Option<usize> {
        for (index, group) in self.groups.iter().enumerate() {
            if k < group.num_nonempty() {
                return Some(index * G + group.offset_to_pos(k));
            }

            k -= group.num_nonempty();
        }

        None
    }

    /// Non-empty traversal starting at the assigned slot `index`.
    #[track_caller]
    pub fn get_iter(&self, index: usize) -> NonEmpty<'_, T, G> {
        assert!(self.test(index), "index {index} is not assigned");

        let group = index / G;
        let offset = self.groups[group].pos_to_offset(index % G);
        NonEmpty::new(&self.groups, NonEmptyPos { group, offset })
    }

    /// Logical index of a non-empty traversal position.
    #[track_caller]
    pub fn get_pos(&self, pos: NonEmptyPos) -> usize {
        pos.group * G + self.groups[pos.group].offset_to_pos(pos.offset)
    }

    /// Iterates the assigned values in ascending index order.
    #[inline]
    pub fn nonempty(&self) -> NonEmpty<'_, T, G> {
        NonEmpty::new(&self.groups, NonEmptyPos::default())
    }

    #[inline]
    pub fn nonempty_mut(&mut self) -> NonEmptyMut<'_, T, G> {
        NonEmptyMut::new(&mut self.groups)
    }

    /// Iterates `(index, value)` for every assigned slot.
    #[inline]
    pub fn indexed(&self) -> Indexed<'_, T, G> {
        Indexed::new(&self.groups)
    }

    /// Moves every assigned value out in ascending index order, releasing
    /// each group's storage as the traversal passes it.
    #[inline]
    pub fn drain(&mut self) -> Drain<'_, T, G> {
        Drain::new(&mut self.groups, &mut self.num_nonempty)
    }

    /// Write access to the slot at `index` that assigns only when written.
    #[inline]
    #[track_caller]
    pub fn element(&mut self, index: usize) -> ElementMut<'_, T, G> {
        self.check_index(index);
        ElementMut::new(self, index)
    }

    /// A positional cursor starting at `index`, which may equal the length.
    #[inline]
    #[track_caller]
    pub fn cursor_mut(&mut self, index: usize) -> CursorMut<'_, T, G> {
        assert!(index <= self.size, "cursor index {index} past table end");
        CursorMut::new(self, index)
    }

    /// Writes the table header and every group header.
    ///
    /// Layout: magic, length and assigned count, each as a 4-byte big-endian
    /// number (or `0xFFFFFFFF` and an 8-byte number when too large), then
    /// each group's occupancy and bitmap.
    pub fn write_metadata<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_u32_or_u64(writer, MAGIC_NUMBER)?;
        write_u32_or_u64(writer, self.size as u64)?;
        write_u32_or_u64(writer, self.num_nonempty as u64)?;

        for group in self.groups.iter() {
            group.write_metadata(writer)?;
        }

        Ok(())
    }

    /// Replaces the table with the layout read from `reader`.
    ///
    /// Assigned slots hold `T::default()` until a data pass overwrites them.
    /// On error the table is left empty.
    pub fn read_metadata<R: Read>(&mut self, reader: &mut R) -> Result<()>
    where
        T: Default,
    {
        let decoded = Self::decode_metadata(reader);
        self.replace_or_reset(decoded)
    }

    fn decode_metadata<R: Read>(reader: &mut R) -> Result<Self>
    where
        T: Default,
    {
        let magic = read_u32_or_u64(reader)?;
        if magic != MAGIC_NUMBER {
            return Err(Error::BadMagic(magic));
        }

        let size = to_usize(read_u32_or_u64(reader)?)?;
        let declared = read_u32_or_u64(reader)?;

        // groups are pushed as they are read so a truncated stream fails
        // before a bogus length is allocated for
        let mut groups = Vec::new();
        for _ in 0..Self::num_groups(size) {
            let mut group = SparseGroup::new();
            group.read_metadata(reader)?;
            groups.push(group);
        }

        if let Some(last) = groups.last() {
            let tail = size % G;
            if tail > 0 && last.bitmap().bits() >> tail != 0 {
                return Err(Error::InvalidGroup {
                    occupancy: last.num_nonempty() as u16,
                    bitmap: last.bitmap().bits(),
                });
            }
        }

        let actual: usize = groups.iter().map(SparseGroup::num_nonempty).sum();
        if declared != actual as u64 {
            return Err(Error::OccupancyMismatch {
                declared,
                actual: actual as u64,
            });
        }

        Ok(Self {
            groups,
            size,
            num_nonempty: actual,
        })
    }

    fn replace_or_reset(&mut self, decoded: Result<Self>) -> Result<()> {
        match decoded {
            Ok(table) => {
                *self = table;

                #[cfg(feature = "tracing")]
                tracing::trace!(
                    len = self.size,
                    num_nonempty = self.num_nonempty,
                    "decoded sparse table metadata"
                );

                Ok(())
            }
            Err(err) => {
                self.reset();

                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "failed to decode sparse table");

                Err(err)
            }
        }
    }

    #[inline]
    fn reset(&mut self) {
        *self = Self::new();
    }

    /// Writes the raw bytes of every assigned value in ascending index order.
    pub fn write_pod_data<W: Write>(&self, writer: &mut W) -> Result<()>
    where
        T: Pod,
    {
        for group in self.groups.iter() {
            group.write_pod_data(writer)?;
        }

        Ok(())
    }

    /// Fills the assigned slots from raw bytes written by
    /// [`write_pod_data`](Self::write_pod_data). On error the table is left
    /// empty.
    pub fn read_pod_data<R: Read>(&mut self, reader: &mut R) -> Result<()>
    where
        T: Pod,
    {
        let result = self
            .groups
            .iter_mut()
            .try_for_each(|group| group.read_pod_data(reader));

        self.reset_on_error(result)
    }

    /// Writes the metadata followed by every assigned value through
    /// `serializer`.
    pub fn serialize<S, W>(&self, serializer: &mut S, writer: &mut W) -> Result<()>
    where
        S: ValueSerializer<T>,
        W: Write,
    {
        self.write_metadata(writer)?;

        for value in self.nonempty() {
            serializer.write_value(writer, value)?;
        }

        Ok(())
    }

    /// Reads what [`serialize`](Self::serialize) wrote. On error the table is
    /// left empty.
    pub fn unserialize<S, R>(&mut self, serializer: &mut S, reader: &mut R) -> Result<()>
    where
        S: ValueSerializer<T>,
        R: Read,
        T: Default,
    {
        self.read_metadata(reader)?;

        let result = self
            .nonempty_mut()
            .try_for_each(|value| serializer.read_value(reader, value))
            .map_err(Error::from);

        self.reset_on_error(result)
    }

    fn reset_on_error(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = result {
            return self.replace_or_reset(Err(err));
        }

        Ok(())
    }
}

impl<T: DefaultValue, const G: usize> SparseTable<T, G> {
    /// Returns the value at `index`, or the shared default if unassigned.
    #[inline]
    #[track_caller]
    pub fn get(&self, index: usize) -> &T {
        self.check_index(index);
        self.groups[index / G].get(index % G)
    }

    /// Iterates every slot in index order, yielding the shared default for
    /// unassigned ones.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T, G> {
        Iter::new(self)
    }
}

#[inline]
fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::SizeOverflow(value))
}

impl<T, const G: usize> Default for SparseTable<T, G> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DefaultValue, const G: usize> Index<usize> for SparseTable<T, G> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: usize) -> &Self::Output {
        self.get(index)
    }
}

impl<T: fmt::Debug, const G: usize> fmt::Debug for SparseTable<T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseTable")
            .field("len", &self.size)
            .field("num_nonempty", &self.num_nonempty)
            .field("values", &DebugValues(self))
            .finish()
    }
}

struct DebugValues<'a, T, const G: usize>(&'a SparseTable<T, G>);

impl<T: fmt::Debug, const G: usize> fmt::Debug for DebugValues<'_, T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.indexed()).finish()
    }
}

impl<T: PartialEq, const G: usize> PartialEq for SparseTable<T, G> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.num_nonempty == other.num_nonempty
            && self.groups == other.groups
    }
}

impl<T: Eq, const G: usize> Eq for SparseTable<T, G> {}

impl<T, const G: usize> SparseTable<T, G> {
    fn cmp_bitmaps(&self, other: &Self) -> Ordering {
        let bitmaps = |table: &Self| {
            table
                .groups
                .iter()
                .map(|group| group.bitmap().bits())
                .collect::<Vec<_>>()
        };

        bitmaps(self).cmp(&bitmaps(other))
    }
}

/// Tables order lexicographically by their dense sequence of values, with
/// occupancy bitmaps breaking ties between equal sequences.
impl<T: PartialOrd + DefaultValue, const G: usize> PartialOrd for SparseTable<T, G> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.iter().partial_cmp(other.iter()) {
            Some(Ordering::Equal) => Some(self.cmp_bitmaps(other)),
            ordering => ordering,
        }
    }
}

impl<T: Ord + DefaultValue, const G: usize> Ord for SparseTable<T, G> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter()
            .cmp(other.iter())
            .then_with(|| self.cmp_bitmaps(other))
    }
}
