
//! Write complete files into memory and read the bytes back,
//! following the pointer tables like a real reader would.

extern crate xcf;

use std::convert::TryInto;
use std::io::Cursor;

use xcf::prelude::*;


/// Follows the structure of a written file.
/// All assertions about well-formedness happen right here while reading.
struct Reader<'b> {
    bytes: &'b [u8],
    position: usize,
    pointer_bytes: usize,
}

impl<'b> Reader<'b> {

    fn new(bytes: &'b [u8]) -> Self {
        assert!(bytes.len() >= 14, "missing file header");
        assert_eq!(&bytes[.. 9], b"gimp xcf ", "wrong magic bytes");

        let tag = &bytes[9 .. 14];
        assert_eq!(tag[4], 0, "version tag must be null terminated");

        let version: i32 = {
            if &tag[.. 4] == b"file" { 0 }
            else {
                assert_eq!(tag[0], b'v');
                std::str::from_utf8(&tag[1 .. 4]).unwrap().parse().unwrap()
            }
        };

        Reader {
            bytes, position: 14,
            pointer_bytes: if version <= 10 { 4 } else { 8 },
        }
    }

    fn u32(&mut self) -> u32 {
        let value = u32::from_be_bytes(self.bytes[self.position .. self.position + 4].try_into().unwrap());
        self.position += 4;
        value
    }

    fn f32(&mut self) -> f32 {
        f32::from_bits(self.u32())
    }

    fn pointer(&mut self) -> u64 {
        match self.pointer_bytes {
            4 => u64::from(self.u32()),
            _ => {
                let value = u64::from_be_bytes(self.bytes[self.position .. self.position + 8].try_into().unwrap());
                self.position += 8;
                value
            },
        }
    }

    fn jump(&mut self, position: u64) {
        assert!(position < self.bytes.len() as u64, "pointer outside of the file");
        self.position = position as usize;
    }

    fn skip(&mut self, byte_count: usize) {
        self.position += byte_count;
    }

    fn string(&mut self) -> String {
        let terminated_length = self.u32() as usize;
        if terminated_length == 0 { return String::new(); }

        let bytes = &self.bytes[self.position .. self.position + terminated_length];
        assert_eq!(bytes[terminated_length - 1], 0, "string must be null terminated");
        self.position += terminated_length;

        String::from_utf8(bytes[.. terminated_length - 1].to_vec()).unwrap()
    }

    /// Read property records up to and including the end sentinel.
    /// Returns `(property number, payload position, payload length)` per record.
    fn properties(&mut self) -> Vec<(u32, usize, usize)> {
        let mut records = Vec::new();

        loop {
            let id = self.u32();
            let length = self.u32() as usize;

            if id == 0 {
                assert_eq!(length, 0, "end sentinel must have no payload");
                return records;
            }

            records.push((id, self.position, length));
            self.skip(length);
        }
    }

    /// Read pointers up to and including the null terminator.
    /// Every listed pointer must point into the file.
    fn pointer_table(&mut self) -> Vec<u64> {
        let mut pointers = Vec::new();

        loop {
            let pointer = self.pointer();
            if pointer == 0 { return pointers; }

            assert!(pointer < self.bytes.len() as u64, "pointer outside of the file");
            pointers.push(pointer);
        }
    }
}

fn payload_of(properties: &[(u32, usize, usize)], id: u32) -> (usize, usize) {
    let (_, position, length) = properties.iter().find(|(found, _, _)| *found == id)
        .unwrap_or_else(|| panic!("property {} missing", id));

    (*position, *length)
}

fn u32_payload(bytes: &[u8], properties: &[(u32, usize, usize)], id: u32) -> u32 {
    let (position, length) = payload_of(properties, id);
    assert_eq!(length, 4);
    u32::from_be_bytes(bytes[position .. position + 4].try_into().unwrap())
}

struct ParsedChild {
    size: (u32, u32),
    pixel_type: Option<u32>, // layers only
    name: String,
    properties: Vec<(u32, usize, usize)>,
    hierarchy: u64,
}

fn parse_layer(reader: &mut Reader<'_>, at: u64) -> ParsedChild {
    reader.jump(at);
    let size = (reader.u32(), reader.u32());
    let pixel_type = reader.u32();
    let name = reader.string();
    let properties = reader.properties();

    let hierarchy = reader.pointer();
    assert_eq!(reader.pointer(), 0, "layer mask pointer must be null");
    assert_ne!(hierarchy, 0);

    ParsedChild { size, pixel_type: Some(pixel_type), name, properties, hierarchy }
}

fn parse_channel(reader: &mut Reader<'_>, at: u64) -> ParsedChild {
    reader.jump(at);
    let size = (reader.u32(), reader.u32());
    let name = reader.string();
    let properties = reader.properties();

    let hierarchy = reader.pointer();
    assert_ne!(hierarchy, 0);

    ParsedChild { size, pixel_type: None, name, properties, hierarchy }
}

struct ParsedHierarchy {
    size: (u32, u32),
    bytes_per_pixel: u32,
    tiles: Vec<u64>,
}

fn parse_hierarchy(reader: &mut Reader<'_>, at: u64) -> ParsedHierarchy {
    reader.jump(at);
    let size = (reader.u32(), reader.u32());
    let bytes_per_pixel = reader.u32();

    let level = reader.pointer();
    assert_eq!(reader.pointer(), 0, "the list of smaller levels must be empty");

    reader.jump(level);
    assert_eq!((reader.u32(), reader.u32()), size, "level size must repeat the hierarchy size");

    let tiles = reader.pointer_table();
    let expected = ((size.0 + 63) / 64) * ((size.1 + 63) / 64);
    assert_eq!(tiles.len(), expected as usize, "wrong number of tiles");

    ParsedHierarchy { size, bytes_per_pixel, tiles }
}

struct ParsedImage {
    size: (u32, u32),
    base_type: u32,
    precision: u32,
    properties: Vec<(u32, usize, usize)>,
    layers: Vec<u64>,
    channels: Vec<u64>,
}

fn parse_image(bytes: &[u8]) -> (Reader<'_>, ParsedImage) {
    let mut reader = Reader::new(bytes);

    let size = (reader.u32(), reader.u32());
    let base_type = reader.u32();
    let precision = reader.u32();
    let properties = reader.properties();
    let layers = reader.pointer_table();
    let channels = reader.pointer_table();

    (reader, ParsedImage { size, base_type, precision, properties, layers, channels })
}

fn decompress(bytes: &[u8], from: u64) -> Vec<u8> {
    zune_inflate::DeflateDecoder::new(&bytes[from as usize ..])
        .decode_zlib().expect("invalid zlib stream")
}


// property numbers as found in written files
const PROP_OPACITY: u32 = 6;
const PROP_MODE: u32 = 7;
const PROP_VISIBLE: u32 = 8;
const PROP_OFFSETS: u32 = 15;
const PROP_COLOR: u32 = 16;
const PROP_COMPRESSION: u32 = 17;
const PROP_PARASITES: u32 = 21;
const PROP_FLOAT_OPACITY: u32 = 33;
const PROP_COMPOSITE_MODE: u32 = 35;
const PROP_FLOAT_COLOR: u32 = 38;


#[test]
fn single_zlib_rgba_pixel() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(11)).unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.set(Setting::BaseType(BaseType::Rgb)).unwrap();
    image.set(Setting::Precision(Precision::I8Gamma)).unwrap();
    image.set(Setting::LayerCount(1)).unwrap();
    image.set(Setting::OmitBaseAlpha(false)).unwrap();

    image.add_layer().unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.set(Setting::Name(Text::from("L").unwrap())).unwrap();
    image.set(Setting::Prop(Property::Opacity(255))).unwrap();
    image.set(Setting::Prop(Property::Visible(true))).unwrap();
    image.set(Setting::Prop(Property::Offsets(Vec2(0, 0)))).unwrap();
    image.add_data(&[ 0x11, 0x22, 0x33, 0xFF ], 4).unwrap();

    let bytes = image.finish().unwrap().into_inner();
    assert_eq!(&bytes[.. 14], b"gimp xcf v011\0");

    let (mut reader, parsed) = parse_image(&bytes);
    assert_eq!(parsed.size, (1, 1));
    assert_eq!(parsed.base_type, 0);
    assert_eq!(parsed.precision, 150);
    assert_eq!(parsed.layers.len(), 1);
    assert_eq!(parsed.channels.len(), 0);

    let (compression_at, compression_len) = payload_of(&parsed.properties, PROP_COMPRESSION);
    assert_eq!(compression_len, 1);
    assert_eq!(bytes[compression_at], 2); // zlib

    let layer = parse_layer(&mut reader, parsed.layers[0]);
    assert_eq!(layer.size, (1, 1));
    assert_eq!(layer.pixel_type, Some(1)); // rgb with alpha
    assert_eq!(layer.name, "L");

    assert_eq!(u32_payload(&bytes, &layer.properties, PROP_OPACITY), 255);
    assert_eq!(u32_payload(&bytes, &layer.properties, PROP_MODE), 28); // the new normal mode
    assert_eq!(u32_payload(&bytes, &layer.properties, PROP_VISIBLE), 1);
    assert_eq!(u32_payload(&bytes, &layer.properties, PROP_COMPOSITE_MODE), u32::MAX); // unset is -1

    let (offsets_at, offsets_len) = payload_of(&layer.properties, PROP_OFFSETS);
    assert_eq!(offsets_len, 8);
    assert_eq!(&bytes[offsets_at .. offsets_at + 8], &[ 0; 8 ]);

    let hierarchy = parse_hierarchy(&mut reader, layer.hierarchy);
    assert_eq!(hierarchy.size, (1, 1));
    assert_eq!(hierarchy.bytes_per_pixel, 4);
    assert_eq!(hierarchy.tiles.len(), 1);

    assert_eq!(decompress(&bytes, hierarchy.tiles[0]), vec![ 0x11, 0x22, 0x33, 0xFF ]);
}

#[test]
fn uncompressed_float_grayscale_tile() {
    let samples: Vec<f32> = (0 .. 64 * 64_u32)
        .map(|index| index as f32 / 4096.0)
        .collect();

    let data: Vec<u8> = samples.iter()
        .flat_map(|sample| sample.to_ne_bytes())
        .collect();

    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    image.set(Setting::Width(64)).unwrap();
    image.set(Setting::Height(64)).unwrap();
    image.set(Setting::BaseType(BaseType::Grayscale)).unwrap();
    image.set(Setting::Precision(Precision::F32Linear)).unwrap();
    image.set(Setting::Prop(Property::Compression(Compression::Uncompressed))).unwrap();
    image.set(Setting::LayerCount(1)).unwrap();

    image.add_layer().unwrap();
    image.set(Setting::Width(64)).unwrap();
    image.set(Setting::Height(64)).unwrap();
    image.add_data(&data, 1).unwrap();

    let bytes = image.finish().unwrap().into_inner();
    let (mut reader, parsed) = parse_image(&bytes);
    assert_eq!(parsed.precision, 600);

    let layer = parse_layer(&mut reader, parsed.layers[0]);
    assert_eq!(layer.pixel_type, Some(2)); // plain grayscale, base alpha omitted

    let hierarchy = parse_hierarchy(&mut reader, layer.hierarchy);
    assert_eq!(hierarchy.bytes_per_pixel, 4);
    assert_eq!(hierarchy.tiles.len(), 1);

    let expected: Vec<u8> = samples.iter()
        .flat_map(|sample| sample.to_bits().to_be_bytes())
        .collect();

    let tile_at = hierarchy.tiles[0] as usize;
    assert_eq!(&bytes[tile_at .. tile_at + expected.len()], expected.as_slice());
}

#[test]
fn edge_tiles_are_short() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(10)).unwrap();
    image.set(Setting::Width(65)).unwrap();
    image.set(Setting::Height(65)).unwrap();
    image.set(Setting::BaseType(BaseType::Grayscale)).unwrap();
    image.set(Setting::Prop(Property::Compression(Compression::Uncompressed))).unwrap();
    image.set(Setting::LayerCount(1)).unwrap();

    image.add_layer().unwrap();
    image.set(Setting::Width(65)).unwrap();
    image.set(Setting::Height(65)).unwrap();
    image.add_data(&[ 0x77_u8; 65 * 65 ], 1).unwrap();

    let bytes = image.finish().unwrap().into_inner();
    let (mut reader, parsed) = parse_image(&bytes);

    let layer = parse_layer(&mut reader, parsed.layers[0]);
    let hierarchy = parse_hierarchy(&mut reader, layer.hierarchy);
    assert_eq!(hierarchy.tiles.len(), 4);

    // tiles are written in row-major order, the last column and row are short
    let tiles = &hierarchy.tiles;
    let mut sorted = tiles.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(&sorted, tiles, "tiles must be distinct and in file order");

    assert_eq!(tiles[1] - tiles[0], 64 * 64); // 64 x 64
    assert_eq!(tiles[2] - tiles[1], 1 * 64); // 1 x 64
    assert_eq!(tiles[3] - tiles[2], 64 * 1); // 64 x 1
    assert_eq!(bytes.len() as u64 - tiles[3], 1); // 1 x 1
}

#[test]
fn refuses_features_beyond_the_declared_version() {
    let mut bytes = Cursor::new(Vec::new());

    {
        let mut image = ImageWriter::new(&mut bytes);
        image.set(Setting::Version(6)).unwrap();
        image.set(Setting::Precision(Precision::F32Gamma)).unwrap();
        image.set(Setting::Prop(Property::Compression(Compression::Uncompressed))).unwrap();
        image.set(Setting::LayerCount(1)).unwrap();

        // the version conflict surfaces when the image header would be written
        assert!(image.add_layer().is_err());
        assert_eq!(image.state(), xcf::write::State::Error);

        // the error is sticky
        assert!(image.set(Setting::Width(1)).is_err());
        assert!(image.add_layer().is_err());
        assert!(image.finish().is_err());
    }

    assert!(bytes.get_ref().is_empty(), "no bytes after the failure point");
}

#[test]
fn base_layer_alpha_can_be_omitted() {
    let write = |omit: bool| {
        let mut image = ImageWriter::new(Cursor::new(Vec::new()));
        image.set(Setting::Version(12)).unwrap();
        image.set(Setting::Width(1)).unwrap();
        image.set(Setting::Height(1)).unwrap();
        image.set(Setting::BaseType(BaseType::Rgb)).unwrap();
        image.set(Setting::LayerCount(2)).unwrap();
        image.set(Setting::OmitBaseAlpha(omit)).unwrap();

        image.add_layer().unwrap();
        image.set(Setting::Width(1)).unwrap();
        image.set(Setting::Height(1)).unwrap();
        image.add_data(&[ 1, 2, 3, 4 ], 4).unwrap();

        image.add_layer().unwrap();
        image.set(Setting::Width(1)).unwrap();
        image.set(Setting::Height(1)).unwrap();
        image.add_data(&[ 5, 6, 7, 8 ], 4).unwrap();

        let bytes = image.finish().unwrap().into_inner();
        let (mut reader, parsed) = parse_image(&bytes);

        let first = parse_layer(&mut reader, parsed.layers[0]).pixel_type.unwrap();
        let last = parse_layer(&mut reader, parsed.layers[1]).pixel_type.unwrap();
        (first, last)
    };

    assert_eq!(write(true), (1, 0)); // rgb with alpha, then plain rgb
    assert_eq!(write(false), (1, 1));
}

#[test]
fn parasites_replace_in_place() {
    let parasite = |name: &str, data: &[u8]| Setting::Prop(Property::Parasite(Parasite {
        name: Text::from(name).unwrap(),
        flags: 1,
        data: data.to_vec(),
    }));

    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    image.set(parasite("a", b"x")).unwrap();
    image.set(parasite("b", b"y")).unwrap();
    image.set(parasite("a", b"z")).unwrap();

    let bytes = image.finish().unwrap().into_inner();
    let (_, parsed) = parse_image(&bytes);

    let (position, length) = payload_of(&parsed.properties, PROP_PARASITES);

    let mut reader = Reader::new(&bytes);
    reader.jump(position as u64);

    let mut entries = Vec::new();
    while reader.position < position + length {
        let name = reader.string();
        let _flags = reader.u32();
        let data_length = reader.u32() as usize;
        let data = bytes[reader.position .. reader.position + data_length].to_vec();
        reader.skip(data_length);
        entries.push((name, data));
    }

    assert_eq!(entries, vec![
        ("a".to_string(), b"z".to_vec()),
        ("b".to_string(), b"y".to_vec()),
    ]);
}

#[test]
fn identical_sessions_produce_identical_bytes() {
    use rand::{Rng, SeedableRng};

    let mut random = rand::rngs::StdRng::seed_from_u64(1337);
    let pixels: Vec<u8> = (0 .. 100 * 70 * 4).map(|_| random.random()).collect();

    let write = || {
        let mut image = ImageWriter::new(Cursor::new(Vec::new()));
        image.set(Setting::Version(12)).unwrap();
        image.set(Setting::Width(100)).unwrap();
        image.set(Setting::Height(70)).unwrap();
        image.set(Setting::LayerCount(1)).unwrap();

        image.add_layer().unwrap();
        image.set(Setting::Width(100)).unwrap();
        image.set(Setting::Height(70)).unwrap();
        image.set(Setting::Name(Text::from("noise").unwrap())).unwrap();
        image.add_data(&pixels, 4).unwrap();

        image.finish().unwrap().into_inner()
    };

    assert_eq!(write(), write());
}

#[test]
fn opacity_round_trips_and_clamps() {
    for (requested, written) in [ (0_u32, 0_u32), (1, 1), (77, 77), (254, 254), (255, 255), (300, 255) ] {
        let mut image = ImageWriter::new(Cursor::new(Vec::new()));
        image.set(Setting::Version(12)).unwrap();
        image.set(Setting::Width(1)).unwrap();
        image.set(Setting::Height(1)).unwrap();
        image.set(Setting::LayerCount(1)).unwrap();

        image.add_layer().unwrap();
        image.set(Setting::Width(1)).unwrap();
        image.set(Setting::Height(1)).unwrap();
        image.set(Setting::Prop(Property::Opacity(requested))).unwrap();
        image.add_data(&[ 0, 0, 0, 0 ], 4).unwrap();

        let bytes = image.finish().unwrap().into_inner();
        let (mut reader, parsed) = parse_image(&bytes);
        let layer = parse_layer(&mut reader, parsed.layers[0]);

        assert_eq!(u32_payload(&bytes, &layer.properties, PROP_OPACITY), written);
    }
}

#[test]
fn channels_span_the_image_and_carry_colors() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    image.set(Setting::Width(3)).unwrap();
    image.set(Setting::Height(2)).unwrap();
    image.set(Setting::BaseType(BaseType::Rgb)).unwrap();
    image.set(Setting::ChannelCount(1)).unwrap();

    image.add_channel().unwrap();
    image.set(Setting::Name(Text::from("mask").unwrap())).unwrap();
    image.set(Setting::Prop(Property::Color([ 255, 0, 0 ]))).unwrap();
    image.add_data(&[ 10, 20, 30, 40, 50, 60 ], 1).unwrap();

    let bytes = image.finish().unwrap().into_inner();
    let (mut reader, parsed) = parse_image(&bytes);
    assert_eq!(parsed.layers.len(), 0);
    assert_eq!(parsed.channels.len(), 1);

    let channel = parse_channel(&mut reader, parsed.channels[0]);
    assert_eq!(channel.size, (3, 2), "channels always span the whole image");
    assert_eq!(channel.name, "mask");
    assert_eq!(channel.pixel_type, None);

    let (color_at, color_len) = payload_of(&channel.properties, PROP_COLOR);
    assert_eq!(color_len, 3);
    assert_eq!(&bytes[color_at .. color_at + 3], &[ 255, 0, 0 ]);

    let (float_color_at, float_color_len) = payload_of(&channel.properties, PROP_FLOAT_COLOR);
    assert_eq!(float_color_len, 12);
    let mut color_reader = Reader::new(&bytes);
    color_reader.jump(float_color_at as u64);
    assert_eq!([ color_reader.f32(), color_reader.f32(), color_reader.f32() ], [ 1.0, 0.0, 0.0 ]);

    let (_, float_opacity_len) = payload_of(&channel.properties, PROP_FLOAT_OPACITY);
    assert_eq!(float_opacity_len, 4);

    // a channel is a single grayscale plane
    let hierarchy = parse_hierarchy(&mut reader, channel.hierarchy);
    assert_eq!(hierarchy.bytes_per_pixel, 1);
    assert_eq!(decompress(&bytes, hierarchy.tiles[0]), vec![ 10, 20, 30, 40, 50, 60 ]);
}

#[test]
fn images_without_children_are_valid() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(1)).unwrap();
    image.set(Setting::Width(7)).unwrap();
    image.set(Setting::Height(9)).unwrap();
    image.set(Setting::Prop(Property::Compression(Compression::Uncompressed))).unwrap();

    let bytes = image.finish().unwrap().into_inner();
    let (_, parsed) = parse_image(&bytes);

    assert_eq!(parsed.size, (7, 9));
    assert_eq!(parsed.layers.len(), 0);
    assert_eq!(parsed.channels.len(), 0);
}

#[test]
fn incomplete_sessions_cannot_finish() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.set(Setting::LayerCount(2)).unwrap();

    image.add_layer().unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.add_data(&[ 0, 0, 0, 0 ], 4).unwrap();

    assert!(image.finish().is_err(), "one declared layer is missing");
}

#[test]
fn undeclared_children_are_refused() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    assert!(image.add_layer().is_err(), "no layers were declared");
}

#[test]
fn rle_compression_is_refused() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Prop(Property::Compression(Compression::RunLength))).unwrap();
    assert!(image.finish().is_err());
}

#[test]
fn huge_version_numbers_are_refused() {
    let mut bytes = Cursor::new(Vec::new());

    {
        let mut image = ImageWriter::new(&mut bytes);
        image.set(Setting::Version(1234)).unwrap();
        assert!(image.finish().is_err());
    }

    assert!(bytes.get_ref().is_empty());
}

#[test]
fn settings_are_rejected_by_state() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    image.set(Setting::LayerCount(1)).unwrap();

    // a layer field at image level
    assert!(image.set(Setting::Name(Text::from("nope").unwrap())).is_err());
    assert_eq!(image.state(), xcf::write::State::Error);

    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    image.set(Setting::ChannelCount(1)).unwrap();
    image.add_channel().unwrap();

    // a layer property at channel level
    assert!(image.set(Setting::Prop(Property::Mode(LayerMode::Normal))).is_err());
}

#[test]
fn layer_modes_gate_the_version() {
    let attempt = |version: i32, mode: LayerMode| {
        let mut image = ImageWriter::new(Cursor::new(Vec::new()));
        image.set(Setting::Version(version)).unwrap();
        image.set(Setting::Width(1)).unwrap();
        image.set(Setting::Height(1)).unwrap();
        image.set(Setting::Prop(Property::Compression(Compression::Uncompressed))).unwrap();
        image.set(Setting::LayerCount(1)).unwrap();

        image.add_layer().unwrap();
        image.set(Setting::Width(1)).unwrap();
        image.set(Setting::Height(1)).unwrap();
        image.set(Setting::Prop(Property::Mode(mode))).unwrap();
        image.add_data(&[ 0, 0, 0, 0 ], 4)
    };

    assert!(attempt(9, LayerMode::Normal).is_err()); // the new modes need version 10
    assert!(attempt(10, LayerMode::Normal).is_ok());
    assert!(attempt(8, LayerMode::Overlay).is_err()); // overlay needs version 9
    assert!(attempt(9, LayerMode::Overlay).is_ok());
    assert!(attempt(1, LayerMode::LegacySoftLight).is_err()); // needs version 2
    assert!(attempt(2, LayerMode::LegacySoftLight).is_ok());
    assert!(attempt(1, LayerMode::LegacyNormal).is_ok());
}

#[test]
fn minimum_version_tracks_used_features() {
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(12)).unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.set(Setting::Precision(Precision::F32Linear)).unwrap();
    image.set(Setting::LayerCount(1)).unwrap();

    image.add_layer().unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.add_data(&0.0_f32.to_ne_bytes(), 1).unwrap();

    assert_eq!(image.minimum_version(), 12);
    assert_eq!(image.wire_version(), 12);
    image.finish().unwrap();

    // with default settings, only the zlib default raises the requirement
    let mut image = ImageWriter::new(Cursor::new(Vec::new()));
    image.set(Setting::Version(9)).unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.set(Setting::LayerCount(1)).unwrap();

    image.add_layer().unwrap();
    image.set(Setting::Width(1)).unwrap();
    image.set(Setting::Height(1)).unwrap();
    image.add_data(&[ 0, 0, 0, 0 ], 4).unwrap();

    assert_eq!(image.minimum_version(), 8);
    image.finish().unwrap();
}

#[test]
fn failed_sessions_write_nothing_further() {
    let write = |poke_after_failure: bool| {
        let mut bytes = Cursor::new(Vec::new());

        {
            let mut image = ImageWriter::new(&mut bytes);
            image.set(Setting::Version(9)).unwrap();
            image.set(Setting::Width(1)).unwrap();
            image.set(Setting::Height(1)).unwrap();
            image.set(Setting::Prop(Property::Compression(Compression::Uncompressed))).unwrap();
            image.set(Setting::LayerCount(1)).unwrap();

            image.add_layer().unwrap();
            image.set(Setting::Width(1)).unwrap();
            image.set(Setting::Height(1)).unwrap();
            image.set(Setting::Prop(Property::Mode(LayerMode::Normal))).unwrap();

            // fails while writing the layer header, version 9 lacks this mode
            assert!(image.add_data(&[ 0, 0, 0, 0 ], 4).is_err());

            if poke_after_failure {
                assert!(image.set(Setting::Prop(Property::Visible(false))).is_err());
                assert!(image.add_layer().is_err());
                assert!(image.add_data(&[ 0, 0, 0, 0 ], 4).is_err());
                assert!(image.finish().is_err());
            }
        }

        bytes.into_inner()
    };

    assert_eq!(write(false), write(true), "operations after a failure must not write");
}
