//! Error types for sparse table serialization.

use thiserror::Error;

/// Errors reported while encoding or decoding a table.
///
/// Index and capacity violations are programmer errors and panic instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The stream did not start with the table magic number.
    #[error("bad magic number: {0:#x}")]
    BadMagic(u64),

    /// A group header whose bitmap disagrees with its occupancy, or that marks
    /// positions past the group capacity.
    #[error("invalid group header: occupancy {occupancy}, bitmap {bitmap:#x}")]
    InvalidGroup {
        /// Occupancy read from the stream.
        occupancy: u16,
        /// Bitmap read from the stream.
        bitmap: u64,
    },

    /// The table header disagrees with the sum of its group occupancies.
    #[error("table declares {declared} assigned slots, groups hold {actual}")]
    OccupancyMismatch {
        /// Count read from the table header.
        declared: u64,
        /// Count obtained by summing the decoded groups.
        actual: u64,
    },

    /// An encoded size does not fit in `usize` on this target.
    #[error("encoded size {0} does not fit in usize")]
    SizeOverflow(u64),

    /// An I/O error occurred while reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for table serialization.
pub type Result<T> = std::result::Result<T, Error>;
