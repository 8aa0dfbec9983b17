use std::{
    alloc::{self, Layout},
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
    slice,
};

/// Exact-size heap storage for the assigned values of a group.
///
/// The buffer stores only its pointer. The length is owned by the caller,
/// which derives it from the group's occupancy bitmap and passes it to every
/// call. Capacity always equals that length: every insertion and removal
/// reallocates to the new size, so an idle group never holds spare slots.
///
/// The buffer has no `Drop`; its owner must call [`clear`](Self::clear).
pub struct GroupBuffer<T> {
    data: NonNull<T>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for GroupBuffer<T> {}
unsafe impl<T: Sync> Sync for GroupBuffer<T> {}

impl<T> GroupBuffer<T> {
    /// Types without drop glue are shifted inside a `realloc`ed block, others
    /// are moved into a freshly allocated block.
    const RELOCATE_IN_PLACE: bool = !mem::needs_drop::<T>();

    #[inline]
    pub const fn new() -> Self {
        Self {
            data: NonNull::dangling(),
            _marker: PhantomData,
        }
    }

    /// Takes ownership of `values`; the buffer's length is `values.len()`.
    #[inline]
    pub fn from_vec(values: Vec<T>) -> Self {
        let values = values.into_boxed_slice();
        let data = Box::into_raw(values) as *mut T;

        Self {
            // SAFETY: `Box::into_raw` never returns null.
            data: unsafe { NonNull::new_unchecked(data) },
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// - `len` must be the buffer's length.
    #[inline]
    pub unsafe fn into_vec(self, len: usize) -> Vec<T> {
        // SAFETY: the block was allocated by the global allocator with
        // `Layout::array::<T>(len)`, which is what a `Vec` of capacity `len`
        // owns.
        unsafe { Vec::from_raw_parts(self.data.as_ptr(), len, len) }
    }

    /// # Safety
    /// - `len` must be the buffer's length.
    #[inline]
    pub unsafe fn as_slice(&self, len: usize) -> &[T] {
        // SAFETY: `data` is valid for `len` initialized values.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), len) }
    }

    /// # Safety
    /// - `len` must be the buffer's length.
    #[inline]
    pub unsafe fn as_mut_slice(&mut self, len: usize) -> &mut [T] {
        // SAFETY: `data` is valid for `len` initialized values.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), len) }
    }

    /// Inserts `value` at `index`, shifting later values one slot right. The
    /// length becomes `len + 1`.
    ///
    /// # Safety
    /// - `len` must be the buffer's length.
    pub unsafe fn insert(&mut self, len: usize, index: usize, value: T) {
        assert!(index <= len, "insertion offset out of bounds");

        if Self::RELOCATE_IN_PLACE {
            // SAFETY: the block holds `len` slots.
            unsafe { self.realloc_exact(len, len + 1) };

            let base = self.data.as_ptr();
            // SAFETY: the block now holds `len + 1` slots, the first `len`
            // initialized.
            unsafe {
                ptr::copy(base.add(index), base.add(index + 1), len - index);
                ptr::write(base.add(index), value);
            }
        } else {
            let new = Self::allocate(len + 1);
            let old = self.data.as_ptr();

            // SAFETY: `new` holds `len + 1` uninitialized slots, `old` holds
            // `len` initialized values which are moved out before release.
            unsafe {
                ptr::copy_nonoverlapping(old, new.as_ptr(), index);
                ptr::copy_nonoverlapping(
                    old.add(index),
                    new.as_ptr().add(index + 1),
                    len - index,
                );
                ptr::write(new.as_ptr().add(index), value);
                Self::deallocate(self.data, len);
            }

            self.data = new;
        }
    }

    /// Removes the value at `index`, shifting later values one slot left. The
    /// length becomes `len - 1`.
    ///
    /// # Safety
    /// - `len` must be the buffer's length.
    pub unsafe fn remove(&mut self, len: usize, index: usize) -> T {
        assert!(index < len, "removal offset out of bounds");

        let old = self.data.as_ptr();

        // SAFETY: `index < len`, the slot is initialized and is treated as
        // moved-from below.
        let value = unsafe { ptr::read(old.add(index)) };

        if Self::RELOCATE_IN_PLACE {
            // SAFETY: both ranges lie within the `len` slots of the block.
            unsafe {
                ptr::copy(old.add(index + 1), old.add(index), len - index - 1);
                self.realloc_exact(len, len - 1);
            }
        } else {
            let new = Self::allocate(len - 1);

            // SAFETY: `new` holds `len - 1` uninitialized slots; every
            // remaining value of `old` is moved exactly once.
            unsafe {
                ptr::copy_nonoverlapping(old, new.as_ptr(), index);
                ptr::copy_nonoverlapping(
                    old.add(index + 1),
                    new.as_ptr().add(index),
                    len - index - 1,
                );
                Self::deallocate(self.data, len);
            }

            self.data = new;
        }

        value
    }

    /// Drops every value and releases the storage. The length becomes 0.
    ///
    /// # Safety
    /// - `len` must be the buffer's length.
    #[inline]
    pub unsafe fn clear(&mut self, len: usize) {
        let data = mem::replace(&mut self.data, NonNull::dangling());

        // SAFETY: `data` owned `len` initialized values; `self` no longer
        // refers to them.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(data.as_ptr(), len));
            Self::deallocate(data, len);
        }
    }

    /// # Safety
    /// - the block must hold `old_len` slots.
    /// - slots at or past `new_len` must not hold live values.
    /// - only the first `min(old_len, new_len)` slots are preserved.
    unsafe fn realloc_exact(&mut self, old_len: usize, new_len: usize) {
        let old_layout = array_layout::<T>(old_len);
        let new_layout = array_layout::<T>(new_len);

        let data = match (old_layout.size(), new_layout.size()) {
            (0, 0) => return,
            (0, _) => {
                self.data = Self::allocate(new_len);
                return;
            }
            (_, 0) => {
                unsafe { Self::deallocate(self.data, old_len) };
                self.data = NonNull::dangling();
                return;
            }
            // SAFETY:
            // - the block was allocated by the global allocator with `old_layout`.
            // - `new_layout.size()` is not zero.
            _ => unsafe {
                alloc::realloc(self.data.as_ptr() as *mut u8, old_layout, new_layout.size())
            },
        };

        self.data =
            NonNull::new(data as *mut T).unwrap_or_else(|| alloc::handle_alloc_error(new_layout));
    }

    fn allocate(len: usize) -> NonNull<T> {
        let layout = array_layout::<T>(len);
        if layout.size() == 0 {
            return NonNull::dangling();
        }

        // SAFETY: `layout` is not zero-sized.
        let data = unsafe { alloc::alloc(layout) };
        NonNull::new(data as *mut T).unwrap_or_else(|| alloc::handle_alloc_error(layout))
    }

    /// # Safety
    /// - `data` must have been allocated by this buffer for `len` slots.
    /// - the slots must no longer hold live values.
    unsafe fn deallocate(data: NonNull<T>, len: usize) {
        let layout = array_layout::<T>(len);
        if layout.size() != 0 {
            // SAFETY: allocated with the same layout.
            unsafe { alloc::dealloc(data.as_ptr() as *mut u8, layout) }
        }
    }
}

#[inline]
fn array_layout<T>(len: usize) -> Layout {
    match Layout::array::<T>(len) {
        Ok(layout) => layout,
        Err(_) => panic!("group buffer layout overflow for {len} values"),
    }
}

impl<T> Default for GroupBuffer<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
