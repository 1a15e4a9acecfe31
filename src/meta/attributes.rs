
//! Contains all value types of the file format:
//! wire enumerations with their published numeric constants,
//! the string encoding, and parasite metadata records.
//!
//! Each enumeration knows its on-wire `value`, a human readable `name`
//! for diagnostics, and a `from_value` lookup that returns `None`
//! for numbers not defined by the file format.

use std::fmt;
use smallvec::SmallVec;
use half::f16;

use crate::io::{Write, Data};
use crate::error::{UnitResult, usize_to_u32};


/// The color model of the whole image.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BaseType {

    /// Three color channels per pixel.
    Rgb,

    /// A single color channel per pixel.
    Grayscale,

    /// A single palette index per pixel.
    Indexed,
}

impl BaseType {

    /// The number this base type is represented with in the file.
    pub fn value(self) -> u32 {
        match self {
            BaseType::Rgb => 0,
            BaseType::Grayscale => 1,
            BaseType::Indexed => 2,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            BaseType::Rgb => "rgb",
            BaseType::Grayscale => "grayscale",
            BaseType::Indexed => "indexed",
        }
    }

    /// Look up the base type for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(BaseType::Rgb),
            1 => Some(BaseType::Grayscale),
            2 => Some(BaseType::Indexed),
            _ => None,
        }
    }

    /// The pixel type of a layer of this image, including an alpha channel.
    pub fn with_alpha(self) -> PixelType {
        match self {
            BaseType::Rgb => PixelType::RgbAlpha,
            BaseType::Grayscale => PixelType::GrayscaleAlpha,
            BaseType::Indexed => PixelType::IndexedAlpha,
        }
    }
}


/// The channel layout of a single layer or channel.
/// Layers use the image base type plus an optional alpha channel,
/// auxiliary channels are always plain grayscale.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PixelType {
    Rgb,
    RgbAlpha,
    Grayscale,
    GrayscaleAlpha,
    Indexed,
    IndexedAlpha,
}

impl PixelType {

    /// The number this pixel type is represented with in the file.
    pub fn value(self) -> u32 {
        match self {
            PixelType::Rgb => 0,
            PixelType::RgbAlpha => 1,
            PixelType::Grayscale => 2,
            PixelType::GrayscaleAlpha => 3,
            PixelType::Indexed => 4,
            PixelType::IndexedAlpha => 5,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            PixelType::Rgb => "rgb",
            PixelType::RgbAlpha => "rgb alpha",
            PixelType::Grayscale => "grayscale",
            PixelType::GrayscaleAlpha => "grayscale alpha",
            PixelType::Indexed => "indexed",
            PixelType::IndexedAlpha => "indexed alpha",
        }
    }

    /// Look up the pixel type for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(PixelType::Rgb),
            1 => Some(PixelType::RgbAlpha),
            2 => Some(PixelType::Grayscale),
            3 => Some(PixelType::GrayscaleAlpha),
            4 => Some(PixelType::Indexed),
            5 => Some(PixelType::IndexedAlpha),
            _ => None,
        }
    }

    /// How many samples one pixel of this type consists of.
    pub fn channel_count(self) -> usize {
        match self {
            PixelType::Rgb => 3,
            PixelType::RgbAlpha => 4,
            PixelType::Grayscale => 1,
            PixelType::GrayscaleAlpha => 2,
            PixelType::Indexed => 1,
            PixelType::IndexedAlpha => 2,
        }
    }

    /// Whether the last channel of this pixel type is an alpha channel.
    pub fn has_alpha(self) -> bool {
        match self {
            PixelType::RgbAlpha | PixelType::GrayscaleAlpha | PixelType::IndexedAlpha => true,
            PixelType::Rgb | PixelType::Grayscale | PixelType::Indexed => false,
        }
    }

    /// The same pixel type without its alpha channel.
    pub fn without_alpha(self) -> PixelType {
        match self {
            PixelType::RgbAlpha => PixelType::Rgb,
            PixelType::GrayscaleAlpha => PixelType::Grayscale,
            PixelType::IndexedAlpha => PixelType::Indexed,
            other => other,
        }
    }
}


/// The sample format of all pixel data in the image:
/// integer or floating point width, and whether values
/// are stored with a gamma curve or linearly.
///
/// The declaration order matches the on-wire numbering,
/// so comparing precisions compares their wire numbers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Precision {
    I8Linear, I8Gamma,
    I16Linear, I16Gamma,
    I32Linear, I32Gamma,
    F16Linear, F16Gamma,
    F32Linear, F32Gamma,
    F64Linear, F64Gamma,
}

impl Precision {

    /// The number this precision is represented with in the file.
    pub fn value(self) -> u32 {
        match self {
            Precision::I8Linear => 100,
            Precision::I8Gamma => 150,
            Precision::I16Linear => 200,
            Precision::I16Gamma => 250,
            Precision::I32Linear => 300,
            Precision::I32Gamma => 350,
            Precision::F16Linear => 500,
            Precision::F16Gamma => 550,
            Precision::F32Linear => 600,
            Precision::F32Gamma => 650,
            Precision::F64Linear => 700,
            Precision::F64Gamma => 750,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            Precision::I8Linear => "8 bit linear integer",
            Precision::I8Gamma => "8 bit gamma integer",
            Precision::I16Linear => "16 bit linear integer",
            Precision::I16Gamma => "16 bit gamma integer",
            Precision::I32Linear => "32 bit linear integer",
            Precision::I32Gamma => "32 bit gamma integer",
            Precision::F16Linear => "16 bit linear float",
            Precision::F16Gamma => "16 bit gamma float",
            Precision::F32Linear => "32 bit linear float",
            Precision::F32Gamma => "32 bit gamma float",
            Precision::F64Linear => "64 bit linear float",
            Precision::F64Gamma => "64 bit gamma float",
        }
    }

    /// Look up the precision for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            100 => Some(Precision::I8Linear),
            150 => Some(Precision::I8Gamma),
            200 => Some(Precision::I16Linear),
            250 => Some(Precision::I16Gamma),
            300 => Some(Precision::I32Linear),
            350 => Some(Precision::I32Gamma),
            500 => Some(Precision::F16Linear),
            550 => Some(Precision::F16Gamma),
            600 => Some(Precision::F32Linear),
            650 => Some(Precision::F32Gamma),
            700 => Some(Precision::F64Linear),
            750 => Some(Precision::F64Gamma),
            _ => None,
        }
    }

    /// Number of bytes a single sample of this precision consumes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Precision::I8Linear | Precision::I8Gamma => 1,

            Precision::I16Linear | Precision::I16Gamma
            | Precision::F16Linear | Precision::F16Gamma => 2,

            Precision::I32Linear | Precision::I32Gamma
            | Precision::F32Linear | Precision::F32Gamma => 4,

            Precision::F64Linear | Precision::F64Gamma => 8,
        }
    }

    /// The sample value meaning fully opaque alpha, in native byte order.
    /// This is `1.0` for the float precisions and the maximum value
    /// for the integer precisions.
    pub fn opaque_alpha_sample(self) -> SmallVec<[u8; 8]> {
        match self {
            Precision::F16Linear | Precision::F16Gamma =>
                SmallVec::from_slice(&f16::ONE.to_ne_bytes()),

            Precision::F32Linear | Precision::F32Gamma =>
                SmallVec::from_slice(&1.0_f32.to_ne_bytes()),

            Precision::F64Linear | Precision::F64Gamma =>
                SmallVec::from_slice(&1.0_f64.to_ne_bytes()),

            integer => smallvec::smallvec![0xFF_u8; integer.bytes_per_sample()],
        }
    }
}


/// How layer contents blend with the layers below.
/// The file format defines a legacy set (0 - 22) and,
/// from version 9 on, a new set (23 and up).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum LayerMode {
    LegacyNormal = 0,
    LegacyDissolve = 1,
    LegacyBehind = 2,
    LegacyMultiply = 3,
    LegacyScreen = 4,
    LegacyOverlay = 5,
    LegacyDifference = 6,
    LegacyAddition = 7,
    LegacySubtract = 8,
    LegacyDarken = 9,
    LegacyLighten = 10,
    LegacyHueHsv = 11,
    LegacySaturationHsv = 12,
    LegacyColorHsl = 13,
    LegacyValueHsv = 14,
    LegacyDivide = 15,
    LegacyDodge = 16,
    LegacyBurn = 17,
    LegacyHardLight = 18,
    LegacySoftLight = 19,
    LegacyGrainExtract = 20,
    LegacyGrainMerge = 21,
    LegacyColorErase = 22,
    Overlay = 23,
    HueLch = 24,
    ChromaLch = 25,
    ColorLch = 26,
    LightnessLch = 27,
    Normal = 28,
    Behind = 29,
    Multiply = 30,
    Screen = 31,
    Difference = 32,
    Addition = 33,
    Subtract = 34,
    Darken = 35,
    Lighten = 36,
    HueHsv = 37,
    SaturationHsv = 38,
    ColorHsl = 39,
    ValueHsv = 40,
    Divide = 41,
    Dodge = 42,
    Burn = 43,
    HardLight = 44,
    SoftLight = 45,
    GrainExtract = 46,
    GrainMerge = 47,
    VividLight = 48,
    PinLight = 49,
    LinearLight = 50,
    HardMix = 51,
    Exclusion = 52,
    LinearBurn = 53,
    LumaDarken = 54,
    LumaLighten = 55,
    Luminance = 56,
    ColorErase = 57,
    Erase = 58,
    Merge = 59,
    Split = 60,
    PassThrough = 61,
}

impl LayerMode {

    /// The number this layer mode is represented with in the file.
    pub fn value(self) -> u32 {
        self as u32
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            LayerMode::LegacyNormal => "legacy normal",
            LayerMode::LegacyDissolve => "legacy dissolve",
            LayerMode::LegacyBehind => "legacy behind",
            LayerMode::LegacyMultiply => "legacy multiply",
            LayerMode::LegacyScreen => "legacy screen",
            LayerMode::LegacyOverlay => "legacy overlay",
            LayerMode::LegacyDifference => "legacy difference",
            LayerMode::LegacyAddition => "legacy addition",
            LayerMode::LegacySubtract => "legacy subtract",
            LayerMode::LegacyDarken => "legacy darken only",
            LayerMode::LegacyLighten => "legacy lighten only",
            LayerMode::LegacyHueHsv => "legacy hue (hsv)",
            LayerMode::LegacySaturationHsv => "legacy saturation (hsv)",
            LayerMode::LegacyColorHsl => "legacy color (hsl)",
            LayerMode::LegacyValueHsv => "legacy value (hsv)",
            LayerMode::LegacyDivide => "legacy divide",
            LayerMode::LegacyDodge => "legacy dodge",
            LayerMode::LegacyBurn => "legacy burn",
            LayerMode::LegacyHardLight => "legacy hard light",
            LayerMode::LegacySoftLight => "legacy soft light",
            LayerMode::LegacyGrainExtract => "legacy grain extract",
            LayerMode::LegacyGrainMerge => "legacy grain merge",
            LayerMode::LegacyColorErase => "legacy color erase",
            LayerMode::Overlay => "overlay",
            LayerMode::HueLch => "hue (lch)",
            LayerMode::ChromaLch => "chroma (lch)",
            LayerMode::ColorLch => "color (lch)",
            LayerMode::LightnessLch => "lightness (lch)",
            LayerMode::Normal => "normal",
            LayerMode::Behind => "behind",
            LayerMode::Multiply => "multiply",
            LayerMode::Screen => "screen",
            LayerMode::Difference => "difference",
            LayerMode::Addition => "addition",
            LayerMode::Subtract => "subtract",
            LayerMode::Darken => "darken only",
            LayerMode::Lighten => "lighten only",
            LayerMode::HueHsv => "hue (hsv)",
            LayerMode::SaturationHsv => "saturation (hsv)",
            LayerMode::ColorHsl => "color (hsl)",
            LayerMode::ValueHsv => "value (hsv)",
            LayerMode::Divide => "divide",
            LayerMode::Dodge => "dodge",
            LayerMode::Burn => "burn",
            LayerMode::HardLight => "hard light",
            LayerMode::SoftLight => "soft light",
            LayerMode::GrainExtract => "grain extract",
            LayerMode::GrainMerge => "grain merge",
            LayerMode::VividLight => "vivid light",
            LayerMode::PinLight => "pin light",
            LayerMode::LinearLight => "linear light",
            LayerMode::HardMix => "hard mix",
            LayerMode::Exclusion => "exclusion",
            LayerMode::LinearBurn => "linear burn",
            LayerMode::LumaDarken => "luma darken only",
            LayerMode::LumaLighten => "luma lighten only",
            LayerMode::Luminance => "luminance",
            LayerMode::ColorErase => "color erase",
            LayerMode::Erase => "erase",
            LayerMode::Merge => "merge",
            LayerMode::Split => "split",
            LayerMode::PassThrough => "pass through",
        }
    }

    /// Look up the layer mode for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(LayerMode::LegacyNormal),
            1 => Some(LayerMode::LegacyDissolve),
            2 => Some(LayerMode::LegacyBehind),
            3 => Some(LayerMode::LegacyMultiply),
            4 => Some(LayerMode::LegacyScreen),
            5 => Some(LayerMode::LegacyOverlay),
            6 => Some(LayerMode::LegacyDifference),
            7 => Some(LayerMode::LegacyAddition),
            8 => Some(LayerMode::LegacySubtract),
            9 => Some(LayerMode::LegacyDarken),
            10 => Some(LayerMode::LegacyLighten),
            11 => Some(LayerMode::LegacyHueHsv),
            12 => Some(LayerMode::LegacySaturationHsv),
            13 => Some(LayerMode::LegacyColorHsl),
            14 => Some(LayerMode::LegacyValueHsv),
            15 => Some(LayerMode::LegacyDivide),
            16 => Some(LayerMode::LegacyDodge),
            17 => Some(LayerMode::LegacyBurn),
            18 => Some(LayerMode::LegacyHardLight),
            19 => Some(LayerMode::LegacySoftLight),
            20 => Some(LayerMode::LegacyGrainExtract),
            21 => Some(LayerMode::LegacyGrainMerge),
            22 => Some(LayerMode::LegacyColorErase),
            23 => Some(LayerMode::Overlay),
            24 => Some(LayerMode::HueLch),
            25 => Some(LayerMode::ChromaLch),
            26 => Some(LayerMode::ColorLch),
            27 => Some(LayerMode::LightnessLch),
            28 => Some(LayerMode::Normal),
            29 => Some(LayerMode::Behind),
            30 => Some(LayerMode::Multiply),
            31 => Some(LayerMode::Screen),
            32 => Some(LayerMode::Difference),
            33 => Some(LayerMode::Addition),
            34 => Some(LayerMode::Subtract),
            35 => Some(LayerMode::Darken),
            36 => Some(LayerMode::Lighten),
            37 => Some(LayerMode::HueHsv),
            38 => Some(LayerMode::SaturationHsv),
            39 => Some(LayerMode::ColorHsl),
            40 => Some(LayerMode::ValueHsv),
            41 => Some(LayerMode::Divide),
            42 => Some(LayerMode::Dodge),
            43 => Some(LayerMode::Burn),
            44 => Some(LayerMode::HardLight),
            45 => Some(LayerMode::SoftLight),
            46 => Some(LayerMode::GrainExtract),
            47 => Some(LayerMode::GrainMerge),
            48 => Some(LayerMode::VividLight),
            49 => Some(LayerMode::PinLight),
            50 => Some(LayerMode::LinearLight),
            51 => Some(LayerMode::HardMix),
            52 => Some(LayerMode::Exclusion),
            53 => Some(LayerMode::LinearBurn),
            54 => Some(LayerMode::LumaDarken),
            55 => Some(LayerMode::LumaLighten),
            56 => Some(LayerMode::Luminance),
            57 => Some(LayerMode::ColorErase),
            58 => Some(LayerMode::Erase),
            59 => Some(LayerMode::Merge),
            60 => Some(LayerMode::Split),
            61 => Some(LayerMode::PassThrough),
            _ => None,
        }
    }
}


/// How the result of blending a layer is combined with the backdrop.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CompositeMode {
    Union,
    ClipToBackdrop,
    ClipToLayer,
    Intersection,
}

impl CompositeMode {

    /// The number this composite mode is represented with in the file.
    pub fn value(self) -> u32 {
        match self {
            CompositeMode::Union => 1,
            CompositeMode::ClipToBackdrop => 2,
            CompositeMode::ClipToLayer => 3,
            CompositeMode::Intersection => 4,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            CompositeMode::Union => "union",
            CompositeMode::ClipToBackdrop => "clip to backdrop",
            CompositeMode::ClipToLayer => "clip to layer",
            CompositeMode::Intersection => "intersection",
        }
    }

    /// Look up the composite mode for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(CompositeMode::Union),
            2 => Some(CompositeMode::ClipToBackdrop),
            3 => Some(CompositeMode::ClipToLayer),
            4 => Some(CompositeMode::Intersection),
            _ => None,
        }
    }
}


/// The color space in which a layer is composited onto the backdrop.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CompositeSpace {
    RgbLinear,
    RgbPerceptual,
    Lab,
}

impl CompositeSpace {

    /// The number this composite space is represented with in the file.
    pub fn value(self) -> u32 {
        match self {
            CompositeSpace::RgbLinear => 1,
            CompositeSpace::RgbPerceptual => 2,
            CompositeSpace::Lab => 3,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            CompositeSpace::RgbLinear => "linear rgb",
            CompositeSpace::RgbPerceptual => "perceptual rgb",
            CompositeSpace::Lab => "lab",
        }
    }

    /// Look up the composite space for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(CompositeSpace::RgbLinear),
            2 => Some(CompositeSpace::RgbPerceptual),
            3 => Some(CompositeSpace::Lab),
            _ => None,
        }
    }
}


/// The color space in which the blend mode of a layer is evaluated.
/// Shares its numbering with [`CompositeSpace`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BlendSpace {
    RgbLinear,
    RgbPerceptual,
    Lab,
}

impl BlendSpace {

    /// The number this blend space is represented with in the file.
    pub fn value(self) -> u32 {
        match self {
            BlendSpace::RgbLinear => 1,
            BlendSpace::RgbPerceptual => 2,
            BlendSpace::Lab => 3,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            BlendSpace::RgbLinear => "linear rgb",
            BlendSpace::RgbPerceptual => "perceptual rgb",
            BlendSpace::Lab => "lab",
        }
    }

    /// Look up the blend space for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(BlendSpace::RgbLinear),
            2 => Some(BlendSpace::RgbPerceptual),
            3 => Some(BlendSpace::Lab),
            _ => None,
        }
    }
}


/// Identifies one record in a property list.
/// Property lists appear in the image header and in every
/// layer and channel header, terminated by the `End` record.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PropertyId {
    End,
    Colormap,
    Opacity,
    Mode,
    Visible,
    Offsets,
    Color,
    Compression,
    Parasites,
    FloatOpacity,
    CompositeMode,
    CompositeSpace,
    BlendSpace,
    FloatColor,
}

impl PropertyId {

    /// The number this property is represented with in the file.
    pub fn value(self) -> u32 {
        match self {
            PropertyId::End => 0,
            PropertyId::Colormap => 1,
            PropertyId::Opacity => 6,
            PropertyId::Mode => 7,
            PropertyId::Visible => 8,
            PropertyId::Offsets => 15,
            PropertyId::Color => 16,
            PropertyId::Compression => 17,
            PropertyId::Parasites => 21,
            PropertyId::FloatOpacity => 33,
            PropertyId::CompositeMode => 35,
            PropertyId::CompositeSpace => 36,
            PropertyId::BlendSpace => 37,
            PropertyId::FloatColor => 38,
        }
    }

    /// A human readable name for diagnostic messages.
    pub fn name(self) -> &'static str {
        match self {
            PropertyId::End => "end",
            PropertyId::Colormap => "colormap",
            PropertyId::Opacity => "opacity",
            PropertyId::Mode => "mode",
            PropertyId::Visible => "visible",
            PropertyId::Offsets => "offsets",
            PropertyId::Color => "color",
            PropertyId::Compression => "compression",
            PropertyId::Parasites => "parasites",
            PropertyId::FloatOpacity => "float opacity",
            PropertyId::CompositeMode => "composite mode",
            PropertyId::CompositeSpace => "composite space",
            PropertyId::BlendSpace => "blend space",
            PropertyId::FloatColor => "float color",
        }
    }

    /// Look up the property for a number found in a file. `None` means unknown.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(PropertyId::End),
            1 => Some(PropertyId::Colormap),
            6 => Some(PropertyId::Opacity),
            7 => Some(PropertyId::Mode),
            8 => Some(PropertyId::Visible),
            15 => Some(PropertyId::Offsets),
            16 => Some(PropertyId::Color),
            17 => Some(PropertyId::Compression),
            21 => Some(PropertyId::Parasites),
            33 => Some(PropertyId::FloatOpacity),
            35 => Some(PropertyId::CompositeMode),
            36 => Some(PropertyId::CompositeSpace),
            37 => Some(PropertyId::BlendSpace),
            38 => Some(PropertyId::FloatColor),
            _ => None,
        }
    }

    /// Write the property record header: the property number,
    /// then the byte size of the payload that follows.
    pub fn write(self, write: &mut impl Write, payload_byte_size: u32) -> UnitResult {
        self.value().write(write)?;
        payload_byte_size.write(write)
    }
}


/// The raw bytes that make up a string in an xcf file.
// will mostly be short names like "background" or "Layer 1"
type TextBytes = SmallVec<[u8; 24]>;

/// A string as stored in an xcf file: utf-8 bytes without a null byte.
/// The empty text is valid and is encoded as a lone zero length.
#[derive(Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Text {
    bytes: TextBytes,
}

impl Text {

    /// The internal bytes this text is made of.
    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Whether this text contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Create a `Text` from an `str` reference.
    /// Returns `None` if the string contains a null byte,
    /// which the encoding cannot represent.
    pub fn from(str: impl AsRef<str>) -> Option<Self> {
        let bytes = str.as_ref().as_bytes();
        if bytes.contains(&0) { return None; }
        Some(Text { bytes: SmallVec::from_slice(bytes) })
    }

    /// The byte count this string consumes in the file.
    pub fn size_prefixed_byte_size(&self) -> usize {
        if self.bytes.is_empty() { u32::BYTE_SIZE }
        else { u32::BYTE_SIZE + self.bytes.len() + 1 }
    }

    /// Write the byte count including the null terminator,
    /// then the bytes, then the null terminator.
    /// The empty text is written as a lone zero length.
    pub fn write_size_prefixed(&self, write: &mut impl Write) -> UnitResult {
        if self.bytes.is_empty() {
            return 0_u32.write(write);
        }

        let terminated_length = usize_to_u32(self.bytes.len() + 1, "text length")?;
        terminated_length.write(write)?;
        u8::write_slice(write, self.bytes.as_slice())?;
        0_u8.write(write)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", String::from_utf8_lossy(self.bytes()))
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "\"{}\"", self)
    }
}


/// An opaque, named metadata record that is attached
/// to the whole image or to a single layer or channel.
/// The writer stores the payload without interpreting it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Parasite {

    /// Identifies the parasite. Must not be empty.
    pub name: Text,

    /// Application defined bit flags, stored verbatim.
    pub flags: u32,

    /// The payload, stored verbatim.
    pub data: Vec<u8>,
}

impl Parasite {

    /// Check that this parasite can be represented in the file.
    pub fn validate(&self) -> UnitResult {
        if self.name.is_empty() {
            return Err(crate::error::Error::invalid("parasite name must not be empty"));
        }

        Ok(())
    }

    /// The byte count this parasite consumes inside the parasites property.
    pub fn byte_size(&self) -> usize {
        self.name.size_prefixed_byte_size()
            + u32::BYTE_SIZE // flags
            + u32::BYTE_SIZE // payload length
            + self.data.len()
    }

    /// Without validation, write this parasite to the byte stream.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        self.name.write_size_prefixed(write)?;
        self.flags.write(write)?;
        usize_to_u32(self.data.len(), "parasite length")?.write(write)?;
        u8::write_slice(write, self.data.as_slice())
    }
}


/// An ordered collection of parasites with unique names.
/// Adding a parasite with a name that is already present replaces
/// the flags and payload but keeps the original position in the list.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ParasiteList {
    list: SmallVec<[Parasite; 2]>,
}

impl ParasiteList {

    /// A list without any parasites.
    pub fn new() -> Self {
        Self::default()
    }

    /// The parasites in this list, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Parasite> {
        self.list.iter()
    }

    /// Add a parasite, or update the existing parasite of the same name in place.
    pub fn insert(&mut self, parasite: Parasite) -> UnitResult {
        parasite.validate()?;

        match self.list.iter_mut().find(|existing| existing.name == parasite.name) {
            Some(existing) => *existing = parasite,
            None => self.list.push(parasite),
        }

        Ok(())
    }

    /// Discard all parasites.
    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// The byte count of the payload of the parasites property.
    pub fn byte_size(&self) -> usize {
        self.list.iter().map(Parasite::byte_size).sum()
    }

    /// Write the parasites property: the property record header,
    /// then each parasite in insertion order.
    /// The property is also written when the list is empty.
    pub fn write(&self, write: &mut impl Write) -> UnitResult {
        PropertyId::Parasites.write(write, usize_to_u32(self.byte_size(), "parasites length")?)?;

        for parasite in &self.list {
            parasite.write(write)?;
        }

        Ok(())
    }
}
