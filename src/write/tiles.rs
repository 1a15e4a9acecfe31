
//! Emit the pixel hierarchy of a layer or channel: the tile pointer table,
//! and each 64 by 64 tile converted to big endian and optionally
//! passed through zlib.

use lebe::prelude::*;

use super::ImageWriter;
use crate::compression::{zlib, ByteVec, Compression};
use crate::error::{Error, UnitResult};
use crate::io::{Write, Seek, Data};
use crate::math::compute_tile_count;
use crate::meta::attributes::Precision;


/// The fixed tile edge length. Tiles in the last column and row
/// may be smaller.
pub(crate) const TILE_SIZE: u32 = 64;


impl<W: Write + Seek> ImageWriter<W> {

    /// Write the hierarchy of the child whose header was just written:
    /// dimensions, the pointer to the single detail level, the reserved
    /// tile pointer table, and all tile payloads in row-major order.
    pub(super) fn write_hierarchy(&mut self, data: &[u8], data_channels: usize) -> UnitResult {
        let size = self.child.size;
        let channel_count = self.child.pixel_type.channel_count();
        let sample_size = self.precision.bytes_per_sample();
        let bytes_per_pixel = channel_count * sample_size;

        if data_channels == 0 || data_channels > 4 {
            return Err(Error::invalid(format!("{} channels per pixel", data_channels)));
        }

        if data.len() as u64 != size.area() * (data_channels * sample_size) as u64 {
            return Err(Error::invalid(format!(
                "pixel buffer of {} bytes for {} x {} pixels with {} channels of {} bytes each",
                data.len(), size.width(), size.height(), data_channels, sample_size
            )));
        }

        // bring the buffer to the channel count of the declared pixel type
        let adapted;
        let pixels: &[u8] = {
            if data_channels == channel_count { data }
            else {
                adapted = adapt_channel_count(data, data_channels, channel_count, self.precision);
                &adapted
            }
        };

        size.width().write(&mut self.sink)?;
        size.height().write(&mut self.sink)?;
        (bytes_per_pixel as u32).write(&mut self.sink)?;

        // the single detail level directly follows these two pointers.
        // the list of smaller levels is left empty, readers ignore it
        let position = self.sink.position()?;
        let pointer_size = self.sink.pointer_size().byte_size() as u64;
        self.sink.pointer(position + 2 * pointer_size)?;
        self.sink.pointer(0)?;

        size.width().write(&mut self.sink)?;
        size.height().write(&mut self.sink)?;

        let tile_count = compute_tile_count(size.width(), TILE_SIZE)
            * compute_tile_count(size.height(), TILE_SIZE);

        let tile_table = self.sink.reserve_pointer_table(tile_count as usize)?;

        // the tile buffer is reused for all tiles of this hierarchy
        let mut tile = ByteVec::with_capacity((TILE_SIZE * TILE_SIZE) as usize * bytes_per_pixel);
        let mut tile_index = 0_usize;

        for y in (0 .. size.height()).step_by(TILE_SIZE as usize) {
            let tile_height = TILE_SIZE.min(size.height() - y);

            for x in (0 .. size.width()).step_by(TILE_SIZE as usize) {
                let tile_width = TILE_SIZE.min(size.width() - x);

                self.sink.patch_pointer_table(tile_table, tile_index)?;
                tile_index += 1;

                tile.clear();
                for tile_y in 0 .. tile_height {
                    let row_start = ((y + tile_y) as usize * size.width() as usize + x as usize) * bytes_per_pixel;
                    let row = &pixels[row_start .. row_start + tile_width as usize * bytes_per_pixel];
                    convert_row_to_big_endian(row, sample_size, &mut tile)?;
                }

                match self.compression {
                    Compression::Zlib => {
                        let compressed = zlib::compress_bytes(&tile)?;
                        u8::write_slice(&mut self.sink, &compressed)?;
                    },

                    Compression::Uncompressed => {
                        u8::write_slice(&mut self.sink, &tile)?;
                    },

                    Compression::RunLength => {
                        return Err(Error::unsupported("rle compression"));
                    },
                }
            }
        }

        Ok(())
    }
}


/// Convert one row of native-endian samples to big endian,
/// appending the bytes to the tile buffer.
fn convert_row_to_big_endian(row: &[u8], sample_size: usize, tile: &mut ByteVec) -> UnitResult {
    let mut samples = row;

    match sample_size {
        1 => tile.extend_from_slice(row),

        2 => while !samples.is_empty() {
            u16::read_from_native_endian(&mut samples)?.write(tile)?;
        },

        4 => while !samples.is_empty() {
            u32::read_from_native_endian(&mut samples)?.write(tile)?;
        },

        8 => while !samples.is_empty() {
            u64::read_from_native_endian(&mut samples)?.write(tile)?;
        },

        other => return Err(Error::unsupported(format!("channel size of {} bytes", other))),
    }

    Ok(())
}


/// Create a copy of the pixel buffer with the channels of every pixel
/// dropped or added so that the buffer matches the declared channel count.
/// Added channels are zero, except that an added last channel of an
/// alpha pixel type becomes fully opaque.
fn adapt_channel_count(data: &[u8], data_channels: usize, channel_count: usize, precision: Precision) -> ByteVec {
    let sample_size = precision.bytes_per_sample();
    let data_bytes_per_pixel = data_channels * sample_size;
    let bytes_per_pixel = channel_count * sample_size;
    let pixel_count = data.len() / data_bytes_per_pixel.max(1);

    let mut adapted = vec![ 0_u8; pixel_count * bytes_per_pixel ];

    let pixels = data.chunks_exact(data_bytes_per_pixel)
        .zip(adapted.chunks_exact_mut(bytes_per_pixel));

    if channel_count < data_channels {
        // drop the trailing extra channels of every pixel
        for (source, target) in pixels {
            target.copy_from_slice(&source[.. bytes_per_pixel]);
        }
    }
    else {
        // pixel types with an alpha channel have it as their last channel
        let opaque_alpha = {
            if channel_count == 2 || channel_count == 4 { Some(precision.opaque_alpha_sample()) }
            else { None }
        };

        for (source, target) in pixels {
            target[.. data_bytes_per_pixel].copy_from_slice(source);

            if let Some(alpha) = &opaque_alpha {
                target[bytes_per_pixel - sample_size ..].copy_from_slice(alpha);
            }
        }
    }

    adapted
}
