//! Binary encoding shared by groups and tables.
//!
//! Metadata (sizes, occupancies, bitmaps) is written in a fixed big-endian
//! layout; assigned values follow in a separate data pass, either as raw
//! bytes or through a [`ValueSerializer`].

mod codec;
mod value;

pub use codec::*;
pub use value::*;
