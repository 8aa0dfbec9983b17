use std::io::{self, Read, Write};

/// First field of every encoded table.
pub const MAGIC_NUMBER: u64 = 0x2468_7531;

/// A 4-byte size field holding this value announces an 8-byte field.
const WIDE_SENTINEL: u64 = 0xFFFF_FFFF;

/// Writes the low `len` bytes of `value`, most significant first.
#[inline]
pub fn write_be<W: Write>(writer: &mut W, value: u64, len: usize) -> io::Result<()> {
    debug_assert!(len <= 8);
    writer.write_all(&value.to_be_bytes()[8 - len..])
}

/// Reads a `len`-byte big-endian number.
#[inline]
pub fn read_be<R: Read>(reader: &mut R, len: usize) -> io::Result<u64> {
    debug_assert!(len <= 8);
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes[8 - len..])?;
    Ok(u64::from_be_bytes(bytes))
}

/// Writes `value` in 4 bytes when it is below `0xFFFFFFFF`, otherwise the
/// 4-byte sentinel followed by the full 8-byte value.
///
/// `0xFFFFFFFF` itself takes the wide form, so every value reads back
/// unchanged.
pub fn write_u32_or_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    if value < WIDE_SENTINEL {
        write_be(writer, value, 4)
    } else {
        write_be(writer, WIDE_SENTINEL, 4)?;
        write_be(writer, value, 8)
    }
}

pub fn read_u32_or_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let narrow = read_be(reader, 4)?;
    if narrow < WIDE_SENTINEL {
        Ok(narrow)
    } else {
        read_be(reader, 8)
    }
}
