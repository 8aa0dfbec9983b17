use std::io::{self, Read, Write};

use bytemuck::Pod;

/// Writes and reads individual assigned values during a data pass.
///
/// Values are visited in ascending index order. When reading, each call
/// overwrites a slot that already holds a placeholder value.
pub trait ValueSerializer<T> {
    fn write_value<W: Write>(&mut self, writer: &mut W, value: &T) -> io::Result<()>;

    fn read_value<R: Read>(&mut self, reader: &mut R, value: &mut T) -> io::Result<()>;
}

/// Copies values as their raw in-memory bytes.
///
/// Only plain-old-data types qualify; the bytes use the native endianness of
/// the writing machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct PodSerializer;

impl<T: Pod> ValueSerializer<T> for PodSerializer {
    #[inline]
    fn write_value<W: Write>(&mut self, writer: &mut W, value: &T) -> io::Result<()> {
        writer.write_all(bytemuck::bytes_of(value))
    }

    #[inline]
    fn read_value<R: Read>(&mut self, reader: &mut R, value: &mut T) -> io::Result<()> {
        reader.read_exact(bytemuck::bytes_of_mut(value))
    }
}
