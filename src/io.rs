
//! Low level binary writing. All multi-byte values are written as big endian,
//! as required by the file format.

pub use ::std::io::{Write, Seek};
use ::std::io::SeekFrom;
use lebe::prelude::*;
use crate::error::{Error, Result, UnitResult};


/// Extension trait for writing binary primitives to a byte stream.
pub trait Data: Sized {

    /// Number of bytes this would consume in an xcf file.
    const BYTE_SIZE: usize = ::std::mem::size_of::<Self>();

    /// Write this value to the byte stream, big endian.
    fn write(self, write: &mut impl Write) -> UnitResult;

    /// Write all values in the slice to the byte stream, big endian.
    fn write_slice(write: &mut impl Write, slice: &[Self]) -> UnitResult;
}

macro_rules! implement_data_for_primitive {
    ($kind: ident) => {
        impl Data for $kind {
            fn write(self, write: &mut impl Write) -> UnitResult {
                write.write_as_big_endian(&self)?;
                Ok(())
            }

            fn write_slice(write: &mut impl Write, slice: &[Self]) -> UnitResult {
                write.write_as_big_endian(slice)?;
                Ok(())
            }
        }
    };
}

implement_data_for_primitive!(u8);
implement_data_for_primitive!(u16);
implement_data_for_primitive!(u32);
implement_data_for_primitive!(i32);
implement_data_for_primitive!(u64);
implement_data_for_primitive!(f32);


/// Number of bytes used for the self-referential file offsets inside an xcf file.
/// Decided once per file, from the declared file version.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PointerSize {

    /// Four-byte offsets, written by versions up to 10.
    FourBytes,

    /// Eight-byte offsets, written by versions 11 and up.
    EightBytes,
}

impl PointerSize {

    /// Number of bytes a single pointer consumes in the file.
    pub fn byte_size(self) -> usize {
        match self {
            PointerSize::FourBytes => u32::BYTE_SIZE,
            PointerSize::EightBytes => u64::BYTE_SIZE,
        }
    }
}


/// Wraps a seekable byte stream and remembers
/// the pointer width of the file being produced.
///
/// The file format contains multiple tables of pointers to contents that is
/// written only later. These tables are reserved as zeroed slots and then
/// patched one slot at a time, each patch bracketed by a seek away from and
/// back to the end of the stream.
#[derive(Debug)]
pub struct PointerWrite<W> {
    inner: W,
    pointer_size: PointerSize,
}

impl<W: Write + Seek> PointerWrite<W> {

    /// Wrap a byte stream. The stream is expected to be empty and at position zero.
    pub fn new(inner: W, pointer_size: PointerSize) -> Self {
        Self { inner, pointer_size }
    }

    /// The pointer width of the file being produced.
    pub fn pointer_size(&self) -> PointerSize {
        self.pointer_size
    }

    // the pointer width depends on the declared file version, which can
    // still change until the first bytes are written
    pub(crate) fn set_pointer_size(&mut self, pointer_size: PointerSize) {
        self.pointer_size = pointer_size;
    }

    /// The current byte position inside the stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Jump to an absolute byte position.
    pub fn seek_to(&mut self, position: u64) -> UnitResult {
        self.inner.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Jump forward by the specified number of bytes.
    /// Seeking beyond the end of the stream is allowed,
    /// the skipped bytes then read as zeroes.
    pub fn skip(&mut self, byte_count: u64) -> UnitResult {
        self.inner.seek(SeekFrom::Current(byte_count as i64))?;
        Ok(())
    }

    /// Jump to the end of the stream and return that position.
    pub fn seek_to_end(&mut self) -> Result<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }

    /// Write a file offset with the pointer width of this file.
    /// Offsets that do not fit the pointer width are an error, not truncated.
    pub fn pointer(&mut self, value: u64) -> UnitResult {
        match self.pointer_size {
            PointerSize::FourBytes => {
                if value > u64::from(u32::MAX) {
                    return Err(Error::invalid("file offset larger than the 4 byte pointer range"));
                }

                (value as u32).write(self)
            },

            PointerSize::EightBytes => value.write(self),
        }
    }

    /// Reserve a table of `count` zeroed pointer slots, followed by a null
    /// terminator, and return the position of the first slot. The slots are
    /// filled in later with `patch_pointer_table`.
    pub fn reserve_pointer_table(&mut self, count: usize) -> Result<u64> {
        let start = self.position()?;
        self.skip((count * self.pointer_size.byte_size()) as u64)?;
        self.pointer(0)?;
        Ok(start)
    }

    /// Overwrite slot `index` of a previously reserved table with the current
    /// end position of the stream. Leaves the stream positioned at its end.
    pub fn patch_pointer_table(&mut self, table_start: u64, index: usize) -> UnitResult {
        let target = self.position()?;
        self.seek_to(table_start + (index * self.pointer_size.byte_size()) as u64)?;
        self.pointer(target)?;
        self.seek_to_end()?;
        Ok(())
    }

    /// Flush the stream and return it.
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for PointerWrite<W> {
    fn write(&mut self, buffer: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buffer)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
