
//! Emit the image header and the header of each layer and channel,
//! including their property lists.
//!
//! The image header reserves one pointer table for the layers and one for
//! the channels; each child header starts by patching its own slot. Every
//! child header ends with a pointer to the pixel hierarchy that directly
//! follows it.

use super::{ImageWriter, State};
use crate::compression::Compression;
use crate::error::{Error, UnitResult};
use crate::io::{Write, Seek, Data};
use crate::meta::{magic_number, property_end};
use crate::meta::attributes::{LayerMode, Precision, PropertyId};


impl<W: Write + Seek> ImageWriter<W> {

    /// Write the file magic, the image fields, the image property list,
    /// and the reserved layer and channel pointer tables.
    pub(super) fn write_image_header(&mut self) -> UnitResult {
        if self.state != State::Image {
            return Err(Error::invalid("the image header has already been written"));
        }

        if self.compression == Compression::RunLength {
            return Err(Error::unsupported("rle compression is not supported"));
        }

        self.requirements.require_if(
            self.precision != Precision::I8Gamma, 7,
            "image precision other than 8 bit gamma"
        )?;

        self.requirements.require_if(
            self.precision > Precision::I8Gamma, 12,
            "image encoding other than 8 bit integer"
        )?;

        self.requirements.require_if(
            self.compression == Compression::Zlib, 8,
            "zlib compression"
        )?;

        self.requirements.require_if(
            self.estimated_byte_size() >= 1_u64 << 32, 11,
            "an image size bigger than 4GB"
        )?;

        // the pointer width is fixed from here on
        self.sink.set_pointer_size(self.requirements.pointer_size());

        magic_number::write(&mut self.sink, self.requirements.wire_version())?;

        self.size.width().write(&mut self.sink)?;
        self.size.height().write(&mut self.sink)?;
        self.base_type.value().write(&mut self.sink)?;
        self.precision.value().write(&mut self.sink)?;

        PropertyId::Compression.write(&mut self.sink, 1)?;
        self.compression.value().write(&mut self.sink)?;

        self.parasites.write(&mut self.sink)?;
        property_end::write(&mut self.sink)?;

        self.layer_table = self.sink.reserve_pointer_table(self.layer_count as usize)?;
        self.channel_table = self.sink.reserve_pointer_table(self.channel_count as usize)?;

        self.state = State::Main;
        Ok(())
    }

    /// A lower bound on the encoded size of the image described so far.
    /// With zlib compression the encoded size cannot be predicted,
    /// the estimate is zero then.
    fn estimated_byte_size(&self) -> u64 {
        match self.compression {
            Compression::Uncompressed => {
                let sample = self.precision.bytes_per_sample() as u64;
                let layer_channels = self.base_type.with_alpha().channel_count() as u64;

                self.size.area() * sample * layer_channels * u64::from(self.layer_count)
                    + self.size.area() * sample * u64::from(self.channel_count)
            },

            _ => 0,
        }
    }

    /// Write the header of the layer in progress and patch
    /// its slot in the layer pointer table.
    pub(super) fn write_layer_header(&mut self) -> UnitResult {
        if self.state != State::Layer {
            return Err(Error::invalid("there is no layer header to be written"));
        }

        self.sink.patch_pointer_table(self.layer_table, self.child.index as usize)?;

        // the bottommost layer may omit its alpha channel to get smaller files
        if self.omit_base_alpha && self.next_layer == self.layer_count {
            self.child.pixel_type = self.child.pixel_type.without_alpha();
        }

        self.child.size.width().write(&mut self.sink)?;
        self.child.size.height().write(&mut self.sink)?;
        self.child.pixel_type.value().write(&mut self.sink)?;
        self.child.name.write_size_prefixed(&mut self.sink)?;

        PropertyId::Opacity.write(&mut self.sink, 4)?;
        quantized(self.child.opacity).write(&mut self.sink)?;

        // an unset mode becomes the normal mode of the era of the declared version
        let mode = self.child.mode.unwrap_or({
            if self.requirements.wire_version() >= 10 { LayerMode::Normal }
            else { LayerMode::LegacyNormal }
        });

        self.require_mode_version(mode, LayerMode::Normal, 10)?;
        self.require_mode_version(mode, LayerMode::Overlay, 9)?;
        self.require_mode_version(mode, LayerMode::LegacySoftLight, 2)?;

        PropertyId::Mode.write(&mut self.sink, 4)?;
        mode.value().write(&mut self.sink)?;

        PropertyId::Visible.write(&mut self.sink, 4)?;
        (self.child.visible as u32).write(&mut self.sink)?;

        PropertyId::Offsets.write(&mut self.sink, 8)?;
        self.child.offset.x().write(&mut self.sink)?;
        self.child.offset.y().write(&mut self.sink)?;

        // the compositing properties exist since version 4. files declaring an
        // older version only carry them when the caller explicitly set one,
        // which then raises the required version
        let compositing_requested = self.child.composite_mode.is_some()
            || self.child.composite_space.is_some()
            || self.child.blend_space.is_some();

        if self.requirements.wire_version() >= 4 || compositing_requested {
            self.requirements.require_if(
                self.child.composite_mode.is_some(), 4, "setting a composite mode")?;

            self.requirements.require_if(
                self.child.composite_space.is_some(), 4, "setting a composite space")?;

            self.requirements.require_if(
                self.child.blend_space.is_some(), 4, "setting a blend space")?;

            PropertyId::FloatOpacity.write(&mut self.sink, 4)?;
            self.child.opacity.write(&mut self.sink)?;

            PropertyId::CompositeMode.write(&mut self.sink, 4)?;
            self.child.composite_mode
                .map_or(-1, |mode| mode.value() as i32)
                .write(&mut self.sink)?;

            PropertyId::CompositeSpace.write(&mut self.sink, 4)?;
            self.child.composite_space
                .map_or(-1, |space| space.value() as i32)
                .write(&mut self.sink)?;

            PropertyId::BlendSpace.write(&mut self.sink, 4)?;
            self.child.blend_space
                .map_or(-1, |space| space.value() as i32)
                .write(&mut self.sink)?;
        }

        self.child.parasites.write(&mut self.sink)?;
        property_end::write(&mut self.sink)?;

        // the hierarchy directly follows these two pointers
        let position = self.sink.position()?;
        let pointer_size = self.sink.pointer_size().byte_size() as u64;
        self.sink.pointer(position + 2 * pointer_size)?;
        self.sink.pointer(0)?; // layer masks are not supported

        self.state = State::LayerIntermediate;
        Ok(())
    }

    /// Write the header of the channel in progress and patch
    /// its slot in the channel pointer table.
    pub(super) fn write_channel_header(&mut self) -> UnitResult {
        if self.state != State::Channel {
            return Err(Error::invalid("there is no channel header to be written"));
        }

        self.sink.patch_pointer_table(self.channel_table, self.child.index as usize)?;

        self.child.size.width().write(&mut self.sink)?;
        self.child.size.height().write(&mut self.sink)?;
        self.child.name.write_size_prefixed(&mut self.sink)?;

        PropertyId::Opacity.write(&mut self.sink, 4)?;
        quantized(self.child.opacity).write(&mut self.sink)?;

        PropertyId::Visible.write(&mut self.sink, 4)?;
        (self.child.visible as u32).write(&mut self.sink)?;

        PropertyId::Color.write(&mut self.sink, 3)?;
        for component in self.child.color {
            (quantized(component) as u8).write(&mut self.sink)?;
        }

        if self.requirements.wire_version() >= 4 {
            PropertyId::FloatOpacity.write(&mut self.sink, 4)?;
            self.child.opacity.write(&mut self.sink)?;

            PropertyId::FloatColor.write(&mut self.sink, 12)?;
            for component in self.child.color {
                component.write(&mut self.sink)?;
            }
        }

        self.child.parasites.write(&mut self.sink)?;
        property_end::write(&mut self.sink)?;

        // the hierarchy directly follows this pointer
        let position = self.sink.position()?;
        let pointer_size = self.sink.pointer_size().byte_size() as u64;
        self.sink.pointer(position + pointer_size)?;

        self.state = State::ChannelIntermediate;
        Ok(())
    }

    fn require_mode_version(&mut self, mode: LayerMode, first_mode: LayerMode, version: i32) -> UnitResult {
        self.requirements.require_if(
            mode >= first_mode, version,
            format_args!("layer mode '{}' ({})", mode.name(), mode.value())
        )
    }
}


/// Quantize a unit float to the 0 - 255 byte range,
/// rounding so that exact byte values survive unchanged.
fn quantized(value: f32) -> u32 {
    (value * 255.0).clamp(0.0, 255.0).round() as u32
}
