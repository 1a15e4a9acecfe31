
//! Write a layered image to a file, one layer at a time,
//! without ever holding the complete pixel data in memory.
//!
//! The writer is a little state machine: describe the image, then add each
//! layer and each channel in order, setting its fields and finally feeding
//! its pixel data. Any misuse poisons the session and is reported once.
//!
//! ```no_run
//! use xcf::prelude::*;
//!
//! let mut image = ImageWriter::create("minimal.xcf")?;
//! image.set(Setting::Width(2))?;
//! image.set(Setting::Height(2))?;
//! image.set(Setting::LayerCount(1))?;
//!
//! image.add_layer()?;
//! image.set(Setting::Width(2))?;
//! image.set(Setting::Height(2))?;
//! image.set(Setting::Name(Text::from("background").unwrap()))?;
//! image.set(Setting::Prop(Property::Opacity(255)))?;
//! image.add_data(&[0_u8; 2 * 2 * 4], 4)?;
//!
//! image.finish()?;
//! # Ok::<(), xcf::error::Error>(())
//! ```

mod headers;
mod tiles;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::compression::Compression;
use crate::error::{Error, Result, UnitResult};
use crate::io::{Write, Seek, PointerWrite};
use crate::math::Vec2;
use crate::meta::Requirements;
use crate::meta::attributes::{
    BaseType, BlendSpace, CompositeMode, CompositeSpace,
    LayerMode, Parasite, ParasiteList, PixelType, Precision, Text,
};


/// Where in the writing process a session currently is.
/// Which operations are allowed depends only on this state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum State {

    /// Collecting image-wide fields. The image header is not written yet.
    Image,

    /// The image header is written and no layer or channel is in progress.
    Main,

    /// Collecting the fields of the layer that was just added.
    Layer,

    /// The layer header is written, its pixel data is being written.
    LayerIntermediate,

    /// Collecting the fields of the channel that was just added.
    Channel,

    /// The channel header is written, its pixel data is being written.
    ChannelIntermediate,

    /// The session was finished successfully.
    Done,

    /// An operation failed. All further operations are refused.
    Error,
}

impl State {

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            State::Image => "image",
            State::Main => "main",
            State::Layer => "layer",
            State::LayerIntermediate => "layer intermediate",
            State::Channel => "channel",
            State::ChannelIntermediate => "channel intermediate",
            State::Done => "done",
            State::Error => "error",
        }
    }
}


/// A value the caller can set on the session.
/// Whether a setting is legal depends on the current state:
/// the image fields can only be set before the first layer or channel
/// is added, the remaining fields only on the layer or channel
/// that is currently in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {

    /// The declared file format version. The absolute value is written to
    /// the file, versions 11 and up use eight-byte file offsets.
    Version(i32),

    /// The color model of the image.
    BaseType(BaseType),

    /// Pixel width of the image, or of the layer in progress.
    Width(u32),

    /// Pixel height of the image, or of the layer in progress.
    Height(u32),

    /// The sample format of all pixel data.
    Precision(Precision),

    /// How many layers will be added. Every one of them must be added.
    LayerCount(u32),

    /// How many channels will be added. Every one of them must be added.
    ChannelCount(u32),

    /// Whether the bottommost layer is written without its alpha channel.
    /// On by default, because the composited image is opaque anyway
    /// and the file gets smaller.
    OmitBaseAlpha(bool),

    /// The name of the layer or channel in progress.
    Name(Text),

    /// A property of the image or of the layer or channel in progress.
    Prop(Property),
}

impl Setting {

    /// The name of the field this setting would modify, for diagnostic messages.
    pub fn name(&self) -> &'static str {
        match self {
            Setting::Version(_) => "version",
            Setting::BaseType(_) => "base type",
            Setting::Width(_) => "width",
            Setting::Height(_) => "height",
            Setting::Precision(_) => "precision",
            Setting::LayerCount(_) => "number of layers",
            Setting::ChannelCount(_) => "number of channels",
            Setting::OmitBaseAlpha(_) => "omit base alpha",
            Setting::Name(_) => "name",
            Setting::Prop(property) => property.name(),
        }
    }

    fn rejected_in(&self, state: State) -> Error {
        match self {
            Setting::Prop(property) => Error::invalid(format!(
                "cannot set property '{}' in state '{}'", property.name(), state.name()
            )),

            field => Error::invalid(format!(
                "cannot set field '{}' in state '{}'", field.name(), state.name()
            )),
        }
    }
}


/// A property value the caller can set on the image
/// or on the layer or channel in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {

    /// How all tile data in the file is compressed. Image level.
    /// Defaults to zlib compression.
    Compression(Compression),

    /// Attach a parasite to the image or to the child in progress.
    /// A parasite of the same name is replaced in place.
    Parasite(Parasite),

    /// Opacity in the range `0` to `255`. Out-of-range values are clamped.
    /// Layer or channel level. Defaults to fully opaque.
    Opacity(u32),

    /// Opacity in the range `0.0` to `1.0`. Out-of-range values are clamped.
    /// Layer or channel level.
    FloatOpacity(f32),

    /// How the layer in progress blends with the layers below.
    /// Defaults to the normal mode of the era of the declared version.
    Mode(LayerMode),

    /// Whether the layer or channel in progress is visible. Defaults to visible.
    Visible(bool),

    /// Position of the layer in progress within the image.
    Offsets(Vec2<i32>),

    /// Display color of the channel in progress, each component
    /// in the range `0` to `255`. Out-of-range values are clamped.
    Color([u32; 3]),

    /// Display color of the channel in progress, each component
    /// in the range `0.0` to `1.0`. Out-of-range values are clamped.
    FloatColor([f32; 3]),

    /// How the layer in progress is combined with the backdrop.
    /// Unset is written as `-1`. Requires version 4.
    CompositeMode(CompositeMode),

    /// The color space the layer in progress is composited in.
    /// Unset is written as `-1`. Requires version 4.
    CompositeSpace(CompositeSpace),

    /// The color space the blend mode of the layer in progress
    /// is evaluated in. Unset is written as `-1`. Requires version 4.
    BlendSpace(BlendSpace),
}

impl Property {

    /// The name of this property, for diagnostic messages.
    pub fn name(&self) -> &'static str {
        match self {
            Property::Compression(_) => "compression",
            Property::Parasite(_) => "parasites",
            Property::Opacity(_) => "opacity",
            Property::FloatOpacity(_) => "float opacity",
            Property::Mode(_) => "mode",
            Property::Visible(_) => "visible",
            Property::Offsets(_) => "offsets",
            Property::Color(_) => "color",
            Property::FloatColor(_) => "float color",
            Property::CompositeMode(_) => "composite mode",
            Property::CompositeSpace(_) => "composite space",
            Property::BlendSpace(_) => "blend space",
        }
    }
}


/// The layer or channel that is currently in progress.
/// One of these is kept per session and reset for every child.
#[derive(Debug)]
struct Child {
    index: u32,
    size: Vec2<u32>,
    name: Text,

    // for layers this is the image base type plus alpha, possibly stripped
    // again when the header is written. channels are always grayscale.
    pixel_type: PixelType,

    opacity: f32,
    visible: bool,
    color: [f32; 3],

    mode: Option<LayerMode>,
    composite_mode: Option<CompositeMode>,
    composite_space: Option<CompositeSpace>,
    blend_space: Option<BlendSpace>,
    offset: Vec2<i32>,

    parasites: ParasiteList,
}

impl Child {

    fn new_layer(index: u32, pixel_type: PixelType) -> Self {
        Child {
            index,
            size: Vec2(0, 0),
            name: Text::default(),
            pixel_type,
            opacity: 1.0,
            visible: true,
            color: [0.0; 3],
            mode: None,
            composite_mode: None,
            composite_space: None,
            blend_space: None,
            offset: Vec2(0, 0),
            parasites: ParasiteList::new(),
        }
    }

    fn new_channel(index: u32, size: Vec2<u32>) -> Self {
        Child {
            size,
            pixel_type: PixelType::Grayscale,
            .. Self::new_layer(index, PixelType::Grayscale)
        }
    }
}


/// Writes one xcf image to a seekable byte stream.
///
/// The stream is owned exclusively for the whole session, because the
/// writer repositions it to fill in pointer tables that were reserved
/// earlier. A session must add exactly the declared number of layers
/// and channels before it can finish.
///
/// The first failed operation puts the session into the error state;
/// all following operations are refused without writing any bytes.
#[derive(Debug)]
pub struct ImageWriter<W: Write + Seek> {
    sink: PointerWrite<W>,
    state: State,
    requirements: Requirements,

    size: Vec2<u32>,
    base_type: BaseType,
    precision: Precision,
    compression: Compression,

    layer_count: u32,
    channel_count: u32,
    next_layer: u32,
    next_channel: u32,
    omit_base_alpha: bool,

    parasites: ParasiteList,

    // file offsets of the reserved layer and channel pointer tables,
    // known once the image header is written
    layer_table: u64,
    channel_table: u64,

    child: Child,
}

impl ImageWriter<BufWriter<File>> {

    /// Create the file at the specified path, truncating any existing file,
    /// and start a writing session for it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write + Seek> ImageWriter<W> {

    /// Start a writing session into the specified byte stream.
    /// The stream is expected to be empty and at position zero.
    pub fn new(write: W) -> Self {
        let requirements = Requirements::new(12);

        ImageWriter {
            sink: PointerWrite::new(write, requirements.pointer_size()),
            state: State::Image,
            requirements,

            size: Vec2(0, 0),
            base_type: BaseType::Rgb,
            precision: Precision::I8Gamma,
            compression: Compression::Zlib,

            layer_count: 0,
            channel_count: 0,
            next_layer: 0,
            next_channel: 0,
            omit_base_alpha: true,

            parasites: ParasiteList::new(),
            layer_table: 0,
            channel_table: 0,

            child: Child::new_layer(0, PixelType::RgbAlpha),
        }
    }

    /// Where in the writing process this session currently is.
    pub fn state(&self) -> State {
        self.state
    }

    /// The version number that is written to the file.
    pub fn wire_version(&self) -> i32 {
        self.requirements.wire_version()
    }

    /// The minimum version that would have sufficed for all
    /// the features used so far. Diagnostic only.
    pub fn minimum_version(&self) -> i32 {
        self.requirements.minimum_version()
    }

    /// Set a field or property. Which settings are legal
    /// depends on the current state, see [`Setting`].
    pub fn set(&mut self, setting: Setting) -> UnitResult {
        self.guarded(move |image| image.apply(setting))
    }

    /// Start the next layer. Writes the image header first if necessary.
    /// Set the layer fields afterwards, then feed its pixel data.
    pub fn add_layer(&mut self) -> UnitResult {
        self.guarded(Self::start_layer)
    }

    /// Start the next channel. Writes the image header first if necessary.
    /// Set the channel fields afterwards, then feed its pixel data.
    pub fn add_channel(&mut self) -> UnitResult {
        self.guarded(Self::start_channel)
    }

    /// Write the pixel data of the layer or channel in progress and complete it.
    ///
    /// The buffer contains `data_channels` samples per pixel in row-major
    /// order, in the native byte order of the machine. If `data_channels`
    /// differs from the channel count of the layer or channel, the buffer
    /// is adapted: extra channels are dropped, missing channels are added
    /// as zeroes, a missing alpha channel is added as fully opaque.
    pub fn add_data(&mut self, data: &[u8], data_channels: usize) -> UnitResult {
        self.guarded(move |image| image.write_child(data, data_channels))
    }

    /// Complete the session and return the underlying byte stream.
    /// Fails unless exactly the declared number of layers
    /// and channels were added.
    pub fn finish(mut self) -> Result<W> {
        if self.state == State::Error {
            return Err(Error::invalid("session is in error state"));
        }

        // an image without any layers or channels still gets its header
        if self.state == State::Image {
            if let Err(error) = self.write_image_header() {
                self.state = State::Error;
                return Err(error);
            }
        }

        if self.state != State::Main {
            return Err(Error::invalid(format!(
                "cannot finish in state '{}'", self.state.name()
            )));
        }

        if self.next_layer != self.layer_count || self.next_channel != self.channel_count {
            return Err(Error::invalid(format!(
                "not all layers and channels were added: \
                 {} of {} layers and {} of {} channels written",
                self.next_layer, self.layer_count, self.next_channel, self.channel_count
            )));
        }

        self.state = State::Done;
        self.sink.into_inner()
    }

    /// Run an operation. In the error state the operation is refused,
    /// and a failing operation puts the session into the error state.
    fn guarded<T>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state == State::Error {
            return Err(Error::invalid("session is in error state"));
        }

        let result = operation(self);
        if result.is_err() { self.state = State::Error; }
        result
    }

    fn apply(&mut self, setting: Setting) -> UnitResult {
        match self.state {
            State::Image => self.apply_image_setting(setting),
            State::Layer => self.apply_layer_setting(setting),
            State::Channel => self.apply_channel_setting(setting),
            state => Err(setting.rejected_in(state)),
        }
    }

    fn apply_image_setting(&mut self, setting: Setting) -> UnitResult {
        match setting {
            Setting::Version(version) => self.requirements = Requirements::new(version),
            Setting::BaseType(base_type) => self.base_type = base_type,
            Setting::Width(width) => self.size.0 = width,
            Setting::Height(height) => self.size.1 = height,
            Setting::Precision(precision) => self.precision = precision,
            Setting::LayerCount(count) => self.layer_count = count,
            Setting::ChannelCount(count) => self.channel_count = count,
            Setting::OmitBaseAlpha(omit) => self.omit_base_alpha = omit,

            Setting::Prop(Property::Compression(compression)) => self.compression = compression,
            Setting::Prop(Property::Parasite(parasite)) => self.parasites.insert(parasite)?,

            other => return Err(other.rejected_in(State::Image)),
        }

        Ok(())
    }

    fn apply_layer_setting(&mut self, setting: Setting) -> UnitResult {
        match setting {
            Setting::Width(width) => self.child.size.0 = width,
            Setting::Height(height) => self.child.size.1 = height,
            Setting::Name(name) => self.child.name = name,

            Setting::Prop(property) => match property {
                Property::Opacity(value) => self.child.opacity = unit_from_byte(value),
                Property::FloatOpacity(value) => self.child.opacity = value.clamp(0.0, 1.0),
                Property::Mode(mode) => self.child.mode = Some(mode),
                Property::Visible(visible) => self.child.visible = visible,
                Property::Offsets(offset) => self.child.offset = offset,
                Property::CompositeMode(mode) => self.child.composite_mode = Some(mode),
                Property::CompositeSpace(space) => self.child.composite_space = Some(space),
                Property::BlendSpace(space) => self.child.blend_space = Some(space),
                Property::Parasite(parasite) => self.child.parasites.insert(parasite)?,

                other => return Err(Setting::Prop(other).rejected_in(State::Layer)),
            },

            other => return Err(other.rejected_in(State::Layer)),
        }

        Ok(())
    }

    fn apply_channel_setting(&mut self, setting: Setting) -> UnitResult {
        match setting {
            // width and height always equal the image size, so they cannot be set
            Setting::Name(name) => self.child.name = name,

            Setting::Prop(property) => match property {
                Property::Opacity(value) => self.child.opacity = unit_from_byte(value),
                Property::FloatOpacity(value) => self.child.opacity = value.clamp(0.0, 1.0),
                Property::Visible(visible) => self.child.visible = visible,

                Property::Color(components) => {
                    for (target, value) in self.child.color.iter_mut().zip(components) {
                        *target = unit_from_byte(value);
                    }
                },

                Property::FloatColor(components) => {
                    for (target, value) in self.child.color.iter_mut().zip(components) {
                        *target = value.clamp(0.0, 1.0);
                    }
                },

                Property::Parasite(parasite) => self.child.parasites.insert(parasite)?,

                other => return Err(Setting::Prop(other).rejected_in(State::Channel)),
            },

            other => return Err(other.rejected_in(State::Channel)),
        }

        Ok(())
    }

    fn start_layer(&mut self) -> UnitResult {
        if self.state == State::Image {
            self.write_image_header()?;
        }

        if self.state != State::Main {
            return Err(Error::invalid(
                "cannot add a layer while another layer or channel is unfinished"
            ));
        }

        if self.next_layer >= self.layer_count {
            return Err(Error::invalid(format!(
                "too many layers added, expecting only {}", self.layer_count
            )));
        }

        self.child = Child::new_layer(self.next_layer, self.base_type.with_alpha());
        self.next_layer += 1;
        self.state = State::Layer;
        Ok(())
    }

    fn start_channel(&mut self) -> UnitResult {
        if self.state == State::Image {
            self.write_image_header()?;
        }

        if self.state != State::Main {
            return Err(Error::invalid(
                "cannot add a channel while another layer or channel is unfinished"
            ));
        }

        if self.next_channel >= self.channel_count {
            return Err(Error::invalid(format!(
                "too many channels added, expecting only {}", self.channel_count
            )));
        }

        // channels always span the whole image
        self.child = Child::new_channel(self.next_channel, self.size);
        self.next_channel += 1;
        self.state = State::Channel;
        Ok(())
    }

    fn write_child(&mut self, data: &[u8], data_channels: usize) -> UnitResult {
        match self.state {
            State::Layer => self.write_layer_header()?,
            State::Channel => self.write_channel_header()?,
            _ => return Err(Error::invalid("no layer or channel is waiting for pixel data")),
        }

        self.write_hierarchy(data, data_channels)?;
        self.state = State::Main;
        Ok(())
    }
}


/// Convert a byte-range value to a unit float, clamping out-of-range values.
fn unit_from_byte(value: u32) -> f32 {
    (value as f32 / 255.0).clamp(0.0, 1.0)
}
