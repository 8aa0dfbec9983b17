#![deny(unsafe_op_in_unsafe_fn)]

//! A memory-efficient sparse array.
//!
//! A [`SparseTable`] has a fixed length, but only its assigned slots take up
//! memory. Slots are split into groups of 48 (configurable through the `G`
//! parameter). Each group is two words, an occupancy bitmap and a pointer to
//! an exact-size buffer of its assigned values, so with 64-bit pointers an
//! unassigned slot costs under three bits.
//!
//! ```
//! use sparse_table::SparseTable;
//!
//! let mut table = SparseTable::<u32>::with_len(1000);
//! table.set(500, 7);
//!
//! assert_eq!(table[500], 7);
//! assert_eq!(table[499], 0);
//! assert_eq!(table.num_nonempty(), 1);
//! ```

pub mod default_value;
pub mod error;
pub mod group;
pub mod hash_map;
pub mod serialize;
pub mod table;

pub use default_value::DefaultValue;
pub use error::{Error, Result};
pub use group::{SparseGroup, DEFAULT_GROUP_SIZE};
pub use serialize::{PodSerializer, ValueSerializer};
pub use table::SparseTable;

pub mod prelude {
    //! `use sparse_table::prelude::*;` imports the most commonly used types and traits.

    pub use crate::default_value::DefaultValue;
    pub use crate::group::SparseGroup;
    pub use crate::serialize::{PodSerializer, ValueSerializer};
    pub use crate::table::{CursorMut, ElementMut, NonEmptyPos, SparseTable};
}
