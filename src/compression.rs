
//! Contains the compression attribute definition
//! and the zlib compressor for tile data.

use std::fmt;
use crate::error::Result;

/// A byte vector.
pub type ByteVec = Vec<u8>;

/// A byte slice.
pub type Bytes<'s> = &'s [u8];


/// Specifies which compression method to use for all tile data in a file.
/// Use uncompressed data for fastest writing speeds,
/// or zlib compression for much smaller files.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Compression {

    /// Store uncompressed tile bytes.
    /// Produces large files that can be written very quickly.
    Uncompressed,

    /// The run-length encoding of the file format.
    /// This writer does not produce it, requesting it is refused
    /// when the image header is written.
    RunLength,

    /// Pass every tile through a zlib stream. This compression
    /// method is lossless and requires file version 8.
    Zlib,
}

impl Compression {

    /// The number this compression method is represented with in the file.
    pub fn value(self) -> u8 {
        match self {
            Compression::Uncompressed => 0,
            Compression::RunLength => 1,
            Compression::Zlib => 2,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            Compression::Uncompressed => "no",
            Compression::RunLength => "rle",
            Compression::Zlib => "zlib",
        }
    }

    /// Look up the compression method for a number found in a file. `None` means unknown.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Compression::Uncompressed),
            1 => Some(Compression::RunLength),
            2 => Some(Compression::Zlib),
            _ => None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} compression", self.name())
    }
}


pub(crate) mod zlib {
    use super::*;

    /// Level 6 is what the reference zlib library uses by default.
    /// Pinned explicitly so that identical sessions produce identical bytes.
    const LEVEL: u8 = 6;

    /// Compress the bytes of a single tile into a zlib stream.
    /// The stream carries no length prefix, readers delimit it
    /// by decompressing until the expected tile size is reached.
    pub fn compress_bytes(bytes: Bytes<'_>) -> Result<ByteVec> {
        Ok(miniz_oxide::deflate::compress_to_vec_zlib(bytes, LEVEL))
    }
}
