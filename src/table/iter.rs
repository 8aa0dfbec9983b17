use std::{
    fmt,
    iter::{Enumerate, FusedIterator},
    slice, vec,
};

use crate::{
    default_value::DefaultValue,
    group::{Bitmap, Ones, SparseGroup},
};

use super::SparseTable;

/// Iterator over every slot of a [`SparseTable`], yielding the shared
/// default for unassigned ones.
///
/// Created by [`SparseTable::iter`].
pub struct Iter<'a, T, const G: usize> {
    table: &'a SparseTable<T, G>,
    default: &'a T,
    front: usize,
    back: usize,
}

impl<'a, T: DefaultValue, const G: usize> Iter<'a, T, G> {
    #[inline]
    pub(crate) fn new(table: &'a SparseTable<T, G>) -> Self {
        Self {
            table,
            default: T::default_ref(),
            front: 0,
            back: table.len(),
        }
    }

    /// Index of the next slot yielded from the front.
    #[inline]
    pub fn position(&self) -> usize {
        self.front
    }
}

impl<'a, T: DefaultValue, const G: usize> Iterator for Iter<'a, T, G> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        let value = self.table.try_get(self.front).unwrap_or(self.default);
        self.front += 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.front = self.front.saturating_add(n).min(self.back);
        self.next()
    }
}

impl<'a, T: DefaultValue, const G: usize> DoubleEndedIterator for Iter<'a, T, G> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        self.back -= 1;
        Some(self.table.try_get(self.back).unwrap_or(self.default))
    }

    #[inline]
    fn nth_back(&mut self, n: usize) -> Option<Self::Item> {
        self.back = self.back.saturating_sub(n).max(self.front);
        self.next_back()
    }
}

impl<T: DefaultValue, const G: usize> ExactSizeIterator for Iter<'_, T, G> {}
impl<T: DefaultValue, const G: usize> FusedIterator for Iter<'_, T, G> {}

impl<T, const G: usize> Clone for Iter<'_, T, G> {
    #[inline]
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<T, const G: usize> fmt::Debug for Iter<'_, T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("front", &self.front)
            .field("back", &self.back)
            .finish()
    }
}

/// Position of an assigned value: the group holding it and its offset among
/// that group's assigned values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyPos {
    pub group: usize,
    pub offset: usize,
}

/// Iterator over the assigned values of a [`SparseTable`] in ascending index
/// order.
///
/// Created by [`SparseTable::nonempty`] and [`SparseTable::get_iter`].
pub struct NonEmpty<'a, T, const G: usize> {
    groups: &'a [SparseGroup<T, G>],
    front: NonEmptyPos,
    // exclusive
    back: NonEmptyPos,
}

impl<'a, T, const G: usize> NonEmpty<'a, T, G> {
    #[inline]
    pub(crate) fn new(groups: &'a [SparseGroup<T, G>], front: NonEmptyPos) -> Self {
        let mut iter = Self {
            groups,
            front,
            back: NonEmptyPos {
                group: groups.len(),
                offset: 0,
            },
        };

        iter.skip_exhausted();
        iter
    }

    /// Moves the front past groups with no values left.
    #[inline]
    fn skip_exhausted(&mut self) {
        while self.front.group < self.groups.len()
            && self.front.offset == self.groups[self.front.group].num_nonempty()
        {
            self.front.group += 1;
            self.front.offset = 0;
        }
    }

    #[inline]
    fn is_finished(&self) -> bool {
        self.front >= self.back
    }

    /// Position of the next value yielded from the front.
    #[inline]
    pub fn pos(&self) -> Option<NonEmptyPos> {
        if self.is_finished() {
            None
        } else {
            Some(self.front)
        }
    }

    /// Table index of the next value yielded from the front.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        let pos = self.pos()?;
        Some(pos.group * G + self.groups[pos.group].offset_to_pos(pos.offset))
    }
}

impl<'a, T, const G: usize> Iterator for NonEmpty<'a, T, G> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }

        let groups = self.groups;
        let value = &groups[self.front.group].values()[self.front.offset];

        self.front.offset += 1;
        self.skip_exhausted();

        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_finished() {
            (0, Some(0))
        } else {
            (1, None)
        }
    }
}

impl<'a, T, const G: usize> DoubleEndedIterator for NonEmpty<'a, T, G> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }

        let groups = self.groups;
        while self.back.offset == 0 {
            self.back.group -= 1;
            self.back.offset = groups[self.back.group].num_nonempty();
        }

        self.back.offset -= 1;
        Some(&groups[self.back.group].values()[self.back.offset])
    }
}

impl<T, const G: usize> FusedIterator for NonEmpty<'_, T, G> {}

impl<T, const G: usize> Clone for NonEmpty<'_, T, G> {
    #[inline]
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<T, const G: usize> fmt::Debug for NonEmpty<'_, T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonEmpty")
            .field("front", &self.front)
            .field("back", &self.back)
            .finish()
    }
}

/// Mutable iterator over the assigned values of a [`SparseTable`].
///
/// Created by [`SparseTable::nonempty_mut`].
pub struct NonEmptyMut<'a, T, const G: usize> {
    groups: slice::IterMut<'a, SparseGroup<T, G>>,
    front: slice::IterMut<'a, T>,
    back: slice::IterMut<'a, T>,
}

impl<'a, T, const G: usize> NonEmptyMut<'a, T, G> {
    #[inline]
    pub(crate) fn new(groups: &'a mut [SparseGroup<T, G>]) -> Self {
        Self {
            groups: groups.iter_mut(),
            front: Default::default(),
            back: Default::default(),
        }
    }
}

impl<'a, T, const G: usize> Iterator for NonEmptyMut<'a, T, G> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.front.next() {
                return Some(value);
            }

            match self.groups.next() {
                Some(group) => self.front = group.values_mut().iter_mut(),
                None => return self.back.next(),
            }
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let loaded = self.front.len() + self.back.len();
        if self.groups.len() == 0 {
            (loaded, Some(loaded))
        } else {
            (loaded, None)
        }
    }
}

impl<'a, T, const G: usize> DoubleEndedIterator for NonEmptyMut<'a, T, G> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.back.next_back() {
                return Some(value);
            }

            match self.groups.next_back() {
                Some(group) => self.back = group.values_mut().iter_mut(),
                None => return self.front.next_back(),
            }
        }
    }
}

impl<T, const G: usize> FusedIterator for NonEmptyMut<'_, T, G> {}

impl<T: fmt::Debug, const G: usize> fmt::Debug for NonEmptyMut<'_, T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonEmptyMut")
            .field("front", &self.front)
            .field("back", &self.back)
            .finish_non_exhaustive()
    }
}

/// Iterator over `(index, value)` for every assigned slot of a
/// [`SparseTable`].
///
/// Created by [`SparseTable::indexed`].
pub struct Indexed<'a, T, const G: usize> {
    groups: Enumerate<slice::Iter<'a, SparseGroup<T, G>>>,
    base: usize,
    ones: Ones,
    values: slice::Iter<'a, T>,
}

impl<'a, T, const G: usize> Indexed<'a, T, G> {
    #[inline]
    pub(crate) fn new(groups: &'a [SparseGroup<T, G>]) -> Self {
        Self {
            groups: groups.iter().enumerate(),
            base: 0,
            ones: Bitmap::new().ones(),
            values: Default::default(),
        }
    }
}

impl<'a, T, const G: usize> Iterator for Indexed<'a, T, G> {
    type Item = (usize, &'a T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pos) = self.ones.next() {
                let value = self.values.next()?;
                return Some((self.base + pos, value));
            }

            let (index, group) = self.groups.next()?;
            self.base = index * G;
            self.ones = group.bitmap().ones();
            self.values = group.values().iter();
        }
    }
}

impl<T, const G: usize> FusedIterator for Indexed<'_, T, G> {}

impl<T, const G: usize> Clone for Indexed<'_, T, G> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
            base: self.base,
            ones: self.ones.clone(),
            values: self.values.clone(),
        }
    }
}

/// Draining iterator moving every assigned value out of a [`SparseTable`].
///
/// Each group is emptied as the iterator reaches it. Groups not reached
/// when the iterator is dropped are cleared then, so the table always ends
/// up with no assigned slots.
///
/// Created by [`SparseTable::drain`].
pub struct Drain<'a, T, const G: usize> {
    groups: slice::IterMut<'a, SparseGroup<T, G>>,
    current: vec::IntoIter<T>,
    // assigned values still held by `groups`
    num_nonempty: &'a mut usize,
}

impl<'a, T, const G: usize> Drain<'a, T, G> {
    #[inline]
    pub(crate) fn new(groups: &'a mut [SparseGroup<T, G>], num_nonempty: &'a mut usize) -> Self {
        Self {
            groups: groups.iter_mut(),
            current: Vec::new().into_iter(),
            num_nonempty,
        }
    }
}

impl<'a, T, const G: usize> Iterator for Drain<'a, T, G> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.current.next() {
                return Some(value);
            }

            let group = self.groups.next()?;
            *self.num_nonempty -= group.num_nonempty();
            self.current = group.take_values().into_iter();
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.current.len() + *self.num_nonempty;
        (len, Some(len))
    }
}

impl<T, const G: usize> ExactSizeIterator for Drain<'_, T, G> {}
impl<T, const G: usize> FusedIterator for Drain<'_, T, G> {}

impl<T, const G: usize> Drop for Drain<'_, T, G> {
    fn drop(&mut self) {
        #[cfg(feature = "tracing")]
        {
            let remaining = self.current.len() + *self.num_nonempty;
            if remaining > 0 {
                tracing::trace!(remaining, "dropping unconsumed sparse table values");
            }
        }

        for group in self.groups.by_ref() {
            group.clear();
        }

        *self.num_nonempty = 0;
    }
}

impl<T: fmt::Debug, const G: usize> fmt::Debug for Drain<'_, T, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drain")
            .field("current", &self.current.as_slice())
            .field("remaining", &*self.num_nonempty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = SparseTable<u32>;

    fn sample() -> Table {
        let mut table = Table::with_len(200);
        for index in [0, 47, 48, 150, 199] {
            table.set(index, index as u32);
        }
        table
    }

    #[test]
    fn dense_iter_yields_defaults() {
        let mut table = Table::with_len(5);
        table.set(1, 10);
        table.set(3, 30);

        let values: Vec<_> = table.iter().copied().collect();
        assert_eq!(values, [0, 10, 0, 30, 0]);

        let reversed: Vec<_> = table.iter().rev().copied().collect();
        assert_eq!(reversed, [0, 30, 0, 10, 0]);
        assert_eq!(table.iter().len(), 5);
    }

    #[test]
    fn dense_iter_jumps() {
        let table = sample();
        let mut iter = table.iter();

        assert_eq!(iter.nth(150), Some(&150));
        assert_eq!(iter.position(), 151);
        assert_eq!(iter.nth_back(0), Some(&199));
        assert_eq!(iter.len(), 48);
        assert_eq!(iter.nth(1000), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn nonempty_skips_unassigned() {
        let table = sample();
        let values: Vec<_> = table.nonempty().copied().collect();
        assert_eq!(values, [0, 47, 48, 150, 199]);

        let reversed: Vec<_> = table.nonempty().rev().copied().collect();
        assert_eq!(reversed, [199, 150, 48, 47, 0]);
    }

    #[test]
    fn nonempty_meets_in_the_middle() {
        let table = sample();
        let mut iter = table.nonempty();

        assert_eq!(iter.next(), Some(&0));
        assert_eq!(iter.next_back(), Some(&199));
        assert_eq!(iter.next_back(), Some(&150));
        assert_eq!(iter.next(), Some(&47));
        assert_eq!(iter.index(), Some(48));
        assert_eq!(iter.next_back(), Some(&48));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
        assert_eq!(iter.pos(), None);
    }

    #[test]
    fn nonempty_on_empty_table() {
        let table = Table::with_len(500);
        assert_eq!(table.nonempty().next(), None);
        assert_eq!(table.nonempty().next_back(), None);
        assert_eq!(Table::new().nonempty().next(), None);
    }

    #[test]
    fn nonempty_mut_updates_in_place() {
        let mut table = sample();
        for value in table.nonempty_mut() {
            *value += 1;
        }

        let mut iter = table.nonempty_mut();
        *iter.next_back().unwrap() = 0;
        drop(iter);

        let values: Vec<_> = table.nonempty().copied().collect();
        assert_eq!(values, [1, 48, 49, 151, 0]);
        assert_eq!(table.num_nonempty(), 5);
    }

    #[test]
    fn indexed_pairs() {
        let table = sample();
        let pairs: Vec<_> = table.indexed().map(|(i, v)| (i, *v)).collect();
        assert_eq!(
            pairs,
            [(0, 0), (47, 47), (48, 48), (150, 150), (199, 199)]
        );
    }

    #[test]
    fn drain_empties_table() {
        let mut table = sample();
        let mut drain = table.drain();
        assert_eq!(drain.len(), 5);
        assert_eq!(drain.next(), Some(0));
        assert_eq!(drain.len(), 4);

        let rest: Vec<_> = drain.collect();
        assert_eq!(rest, [47, 48, 150, 199]);
        assert_eq!(table.num_nonempty(), 0);
        assert_eq!(table.len(), 200);
        assert!(table.groups().iter().all(|g| g.values().is_empty()));
    }

    #[test]
    fn dropped_drain_clears_rest() {
        let mut table = sample();
        assert_eq!(table.drain().next(), Some(0));

        assert_eq!(table.num_nonempty(), 0);
        assert!(!table.test(199));
    }
}
