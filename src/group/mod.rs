mod bitmap;
mod buffer;
mod group;

pub use bitmap::*;
pub use buffer::*;
pub use group::*;
