
//! Create files in the layered image format of the GIMP,
//! one layer at a time, without any unsafe code.
//!
//! This library only writes files. It supports the format versions 0 to 12,
//! uncompressed or zlib-compressed tile data, all twelve sample precisions,
//! auxiliary channels, and parasite metadata. See [`write::ImageWriter`]
//! for how a writing session works.

#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
    unused,

    missing_copy_implementations,
    missing_debug_implementations,

    clippy::all,
)]

#![deny(unused_must_use)]

#![forbid(unsafe_code)]

// TODO #![warn(missing_docs)]


pub mod io;

pub mod math;
pub mod meta;
pub mod compression;
pub mod write;
pub mod error;


/// Re-exports of everything commonly required for writing an image.
pub mod prelude {

    // main exports
    pub use crate::write::{ImageWriter, Setting, Property};

    // secondary data types
    pub use crate::meta;
    pub use crate::meta::attributes::{
        BaseType, BlendSpace, CompositeMode, CompositeSpace,
        LayerMode, Parasite, PixelType, Precision, Text,
    };

    pub use crate::compression::Compression;
    pub use crate::error::{Result, Error};
    pub use crate::math::Vec2;

    // re-export external stuff
    pub use half::f16;
}
