#![allow(dead_code)]

use lib_rawpng::{ColorMode, Image};

pub struct Decoded {
    pub width: u32,
    pub height: u32,
    pub color_type: png::ColorType,
    pub bit_depth: png::BitDepth,
    pub data: Vec<u8>,
    pub palette: Option<Vec<u8>>,
    pub trns: Option<Vec<u8>>,
}

/// Decodes with the `png` crate, without any expansion of palettes or depths.
pub fn decode_reference(bytes: &[u8]) -> Decoded {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().expect("reference decoder rejected header");

    let mut data = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut data)
        .expect("reference decoder rejected image data");
    data.truncate(frame.buffer_size());

    let info = reader.info();
    Decoded {
        width: frame.width,
        height: frame.height,
        color_type: frame.color_type,
        bit_depth: frame.bit_depth,
        data,
        palette: info.palette.as_ref().map(|p| p.to_vec()),
        trns: info.trns.as_ref().map(|t| t.to_vec()),
    }
}

/// Bit-at-a-time CRC-32, independent of the table-driven one under test.
pub fn reference_crc(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

pub struct ParsedChunk {
    pub tag: [u8; 4],
    pub data: Vec<u8>,
    pub crc: u32,
}

/// Minimal chunk splitter that trusts nothing but the byte layout.
pub fn split_chunks(bytes: &[u8]) -> Vec<ParsedChunk> {
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let mut chunks = Vec::new();
    let mut pos = 8;
    while pos < bytes.len() {
        let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
        let tag: [u8; 4] = bytes[pos + 4..pos + 8].try_into().unwrap();
        let data = bytes[pos + 8..pos + 8 + len].to_vec();
        let crc = u32::from_be_bytes(bytes[pos + 8 + len..pos + 12 + len].try_into().unwrap());
        chunks.push(ParsedChunk { tag, data, crc });
        pos += 12 + len;
    }
    assert_eq!(pos, bytes.len());
    chunks
}

/// Deterministic pseudo-random color stream (xorshift).
pub fn noise(seed: u32) -> impl Iterator<Item = u32> {
    let mut state = seed.max(1);
    std::iter::repeat_with(move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    })
}

pub fn noisy_image(width: u32, height: u32, mode: ColorMode, seed: u32) -> Image {
    let mut image = Image::new(width, height, mode).unwrap();
    let mut stream = image.begin_stream(0, 0).unwrap();
    stream.extend(noise(seed).take(width as usize * height as usize));
    image
}

/// Serialized pixel bytes the way a decoder returns them (RGB without padding).
pub fn expected_samples(image: &Image) -> Vec<u8> {
    match image.mode() {
        ColorMode::Rgb => image
            .pixels()
            .chunks_exact(4)
            .flat_map(|px| px[..3].to_vec())
            .collect(),
        _ => image.pixels().to_vec(),
    }
}
