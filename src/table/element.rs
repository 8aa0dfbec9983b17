use crate::default_value::DefaultValue;

use super::SparseTable;

/// Write access to one slot of a [`SparseTable`].
///
/// Reading never assigns the slot; only [`set`](Self::set) and
/// [`into_mut`](Self::into_mut) do.
///
/// Created by [`SparseTable::element`] and [`CursorMut::element`].
#[derive(Debug)]
pub struct ElementMut<'a, T, const G: usize> {
    table: &'a mut SparseTable<T, G>,
    index: usize,
}

impl<'a, T, const G: usize> ElementMut<'a, T, G> {
    #[inline]
    pub(crate) fn new(table: &'a mut SparseTable<T, G>, index: usize) -> Self {
        Self { table, index }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn test(&self) -> bool {
        self.table.test(self.index)
    }

    #[inline]
    pub fn try_get(&self) -> Option<&T> {
        self.table.try_get(self.index)
    }

    /// Assigns `value`, returning a reference to the stored value.
    #[inline]
    pub fn set(self, value: T) -> &'a mut T {
        self.table.set(self.index, value)
    }

    /// Converts into a mutable reference, assigning `T::default()` if the
    /// slot was unassigned.
    #[inline]
    pub fn into_mut(self) -> &'a mut T
    where
        T: Default,
    {
        self.table.mutating_get(self.index)
    }

    #[inline]
    pub fn erase(self) -> Option<T> {
        self.table.erase(self.index)
    }
}

impl<T: DefaultValue, const G: usize> ElementMut<'_, T, G> {
    #[inline]
    pub fn get(&self) -> &T {
        self.table.get(self.index)
    }

    /// A copy of the current value, the default if unassigned.
    #[inline]
    pub fn value(&self) -> T
    where
        T: Clone,
    {
        self.get().clone()
    }
}

/// A position in a [`SparseTable`] that can move freely over `[0, len]` and
/// read or write the slot it points at.
///
/// Moving is constant time. Position `len` is the end; every slot access
/// there panics.
///
/// Created by [`SparseTable::cursor_mut`].
#[derive(Debug)]
pub struct CursorMut<'a, T, const G: usize> {
    table: &'a mut SparseTable<T, G>,
    index: usize,
}

impl<'a, T, const G: usize> CursorMut<'a, T, G> {
    #[inline]
    pub(crate) fn new(table: &'a mut SparseTable<T, G>, index: usize) -> Self {
        Self { table, index }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.index == self.table.len()
    }

    #[inline]
    #[track_caller]
    pub fn move_next(&mut self) {
        assert!(!self.is_end(), "cursor moved past table end");
        self.index += 1;
    }

    #[inline]
    #[track_caller]
    pub fn move_prev(&mut self) {
        assert!(self.index > 0, "cursor moved before table start");
        self.index -= 1;
    }

    #[inline]
    #[track_caller]
    pub fn seek(&mut self, index: usize) {
        assert!(index <= self.table.len(), "cursor index {index} past table end");
        self.index = index;
    }

    /// Moves the cursor `delta` slots, backwards when negative.
    #[inline]
    #[track_caller]
    pub fn offset(&mut self, delta: isize) {
        match self.index.checked_add_signed(delta) {
            Some(index) => self.seek(index),
            None => panic!("cursor moved before table start"),
        }
    }

    /// Signed number of slots from the cursor to `index`.
    #[inline]
    pub fn distance_to(&self, index: usize) -> isize {
        index as isize - self.index as isize
    }

    #[inline]
    pub fn test(&self) -> bool {
        self.table.test(self.index)
    }

    #[inline]
    pub fn try_get(&self) -> Option<&T> {
        self.table.try_get(self.index)
    }

    #[inline]
    pub fn set(&mut self, value: T) -> &mut T {
        self.table.set(self.index, value)
    }

    #[inline]
    pub fn mutating_get(&mut self) -> &mut T
    where
        T: Default,
    {
        self.table.mutating_get(self.index)
    }

    #[inline]
    pub fn erase(&mut self) -> Option<T> {
        self.table.erase(self.index)
    }

    /// Write access to the slot under the cursor.
    #[inline]
    pub fn element(&mut self) -> ElementMut<'_, T, G> {
        self.table.element(self.index)
    }
}

impl<T: DefaultValue, const G: usize> CursorMut<'_, T, G> {
    #[inline]
    pub fn get(&self) -> &T {
        self.table.get(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_reads_without_assigning() {
        let mut table = SparseTable::<String>::with_len(10);

        let element = table.element(3);
        assert_eq!(element.index(), 3);
        assert!(!element.test());
        assert_eq!(element.get(), "");
        assert_eq!(element.value(), "");
        assert_eq!(element.try_get(), None);
        assert_eq!(table.num_nonempty(), 0);

        table.element(3).set("three".to_owned()).push('!');
        assert_eq!(table[3], "three!");
        assert_eq!(table.num_nonempty(), 1);
    }

    #[test]
    fn element_into_mut_and_erase() {
        let mut table = SparseTable::<u8>::with_len(10);

        *table.element(4).into_mut() += 2;
        assert!(table.test(4));
        assert_eq!(table[4], 2);

        assert_eq!(table.element(4).erase(), Some(2));
        assert_eq!(table.element(4).erase(), None);
        assert_eq!(table.num_nonempty(), 0);
    }

    #[test]
    fn cursor_walks_and_writes() {
        let mut table = SparseTable::<u32>::with_len(100);
        let mut cursor = table.cursor_mut(0);

        while !cursor.is_end() {
            if cursor.index() % 10 == 0 {
                cursor.set(cursor.index() as u32);
            }
            cursor.move_next();
        }

        cursor.offset(-50);
        assert_eq!(cursor.index(), 50);
        assert_eq!(*cursor.get(), 50);
        assert_eq!(cursor.distance_to(20), -30);

        cursor.seek(55);
        assert!(!cursor.test());
        *cursor.mutating_get() = 5;
        cursor.move_prev();
        assert_eq!(cursor.erase(), None);
        cursor.seek(60);
        assert_eq!(cursor.element().erase(), Some(60));

        assert_eq!(table.num_nonempty(), 10);
        assert_eq!(table[55], 5);
    }

    #[test]
    #[should_panic(expected = "past table end")]
    fn cursor_cannot_pass_end() {
        let mut table = SparseTable::<u32>::with_len(2);
        let mut cursor = table.cursor_mut(2);
        cursor.move_next();
    }
}
