mod element;
mod iter;
mod table;

pub use element::*;
pub use iter::*;
pub use table::*;
