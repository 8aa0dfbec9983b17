//! The shared value returned for unassigned slots.
//!
//! Every table reading an unassigned slot of type `T` gets a reference to the
//! same lazily constructed `T::default()`, so all unassigned slots of a type
//! compare equal without each table carrying its own copy.
//!
//! Instances are kept per thread. A `!Sync` default such as `Rc<_>` or
//! `Cell<_>` must never be reachable from two threads, and a reference to it
//! cannot leave the thread that created it.

use std::{
    any::{Any, TypeId},
    cell::RefCell,
};

use crate::hash_map::TypeIdMap;

thread_local! {
    static DEFAULTS: RefCell<TypeIdMap<&'static dyn Any>> = RefCell::new(TypeIdMap::default());
}

/// Value types that can be read from unassigned slots.
pub trait DefaultValue: Default + 'static {
    /// Returns this thread's shared default instance of `Self`.
    ///
    /// Hot loops should call this once and keep the reference, as the
    /// table's iterators do.
    #[inline]
    fn default_ref() -> &'static Self {
        default_value::<Self>()
    }
}

impl<T: Default + 'static> DefaultValue for T {}

/// Returns this thread's shared default instance of `T`, constructing it on
/// first use.
pub fn default_value<T: Default + 'static>() -> &'static T {
    let value = DEFAULTS
        .try_with(|defaults| {
            let cached = defaults.borrow().get(&TypeId::of::<T>()).copied();

            match cached {
                Some(value) => value,
                None => {
                    // built before borrowing mutably, `T::default` may read
                    // other defaults
                    let value: &'static dyn Any = Box::leak(Box::new(T::default()));
                    *defaults
                        .borrow_mut()
                        .entry(TypeId::of::<T>())
                        .or_insert(value)
                }
            }
        })
        // the registry is gone during thread teardown
        .unwrap_or_else(|_| -> &'static dyn Any { Box::leak(Box::new(T::default())) });

    match value.downcast_ref::<T>() {
        Some(value) => value,
        None => unreachable!("default registry entry has the wrong type"),
    }
}
