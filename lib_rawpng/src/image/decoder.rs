use log::{debug, error, info, warn};
use thiserror::Error;

use super::chunk::tag_name;
use super::format::{ColorMode, Image, ImageError};
use crate::checksum::crc32_of;
use crate::compression::{inflate_stored, InflateError};
use crate::constants::{
    BIT_DEPTH, IDAT, IEND, IHDR, IHDR_LENGTH, MAX_PALETTE_ENTRIES, PLTE, PNG_SIGNATURE, TRNS,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid format or missing PNG signature")]
    InvalidSignature,
    #[error("Unexpected end of data in chunk starting at offset {0}")]
    Truncated(usize),
    #[error("CRC mismatch in {tag} chunk: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        tag: String,
        stored: u32,
        computed: u32,
    },
    #[error("Chunk {found} found where {expected} was expected")]
    UnexpectedChunk { expected: String, found: String },
    #[error("Malformed {0} chunk")]
    MalformedChunk(String),
    #[error("Unsupported image header: {0}")]
    Unsupported(&'static str),
    #[error("Scanline {row} uses filter {filter}; only unfiltered rows can be read")]
    UnsupportedFilter { row: usize, filter: u8 },
    #[error("Image data holds {found} bytes, expected {expected}")]
    DataLengthMismatch { expected: usize, found: usize },
    #[error("Failed to inflate image data")]
    Inflate(#[from] InflateError),
    #[error("Invalid image")]
    Image(#[from] ImageError),
}

/// One `length | tag | payload | crc` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub offset: usize,
    pub tag: [u8; 4],
    pub data: Vec<u8>,
    pub crc: u32,
}

impl RawChunk {
    pub fn name(&self) -> String {
        tag_name(&self.tag)
    }
}

/// Splits a PNG file into its chunks, verifying every CRC.
pub fn read_chunks(encoded_data: &[u8]) -> Result<Vec<RawChunk>, DecodeError> {
    if !encoded_data.starts_with(&PNG_SIGNATURE) {
        error!("Invalid format or missing PNG signature");
        return Err(DecodeError::InvalidSignature);
    }

    let mut chunks = Vec::new();
    let mut cursor = PNG_SIGNATURE.len();
    while cursor < encoded_data.len() {
        let offset = cursor;
        let truncated = || DecodeError::Truncated(offset);

        let tag_end = cursor.checked_add(8).ok_or_else(truncated)?;
        let header = encoded_data.get(cursor..tag_end).ok_or_else(truncated)?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let tag = [header[4], header[5], header[6], header[7]];

        let payload_end = tag_end.checked_add(length).ok_or_else(truncated)?;
        let crc_end = payload_end.checked_add(4).ok_or_else(truncated)?;
        let body = encoded_data
            .get(tag_end - 4..payload_end)
            .ok_or_else(truncated)?;
        let crc_bytes = encoded_data
            .get(payload_end..crc_end)
            .ok_or_else(truncated)?;
        cursor = crc_end;

        let stored = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let computed = crc32_of(body);
        if stored != computed {
            error!("CRC mismatch in {} chunk at offset {}", tag_name(&tag), offset);
            return Err(DecodeError::CrcMismatch {
                tag: tag_name(&tag),
                stored,
                computed,
            });
        }

        debug!("Read {} chunk: {} bytes at offset {}", tag_name(&tag), length, offset);
        chunks.push(RawChunk {
            offset,
            tag,
            data: body[4..].to_vec(),
            crc: stored,
        });
    }

    Ok(chunks)
}

struct Header {
    width: u32,
    height: u32,
    mode: ColorMode,
}

fn parse_ihdr(chunk: &RawChunk) -> Result<Header, DecodeError> {
    if chunk.tag != IHDR {
        return Err(DecodeError::UnexpectedChunk {
            expected: tag_name(&IHDR),
            found: chunk.name(),
        });
    }
    let data = &chunk.data;
    if data.len() != IHDR_LENGTH {
        return Err(DecodeError::MalformedChunk(chunk.name()));
    }

    let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    if data[8] != BIT_DEPTH {
        return Err(DecodeError::Unsupported("bit depth other than 8"));
    }
    let mode = ColorMode::from_png_tag(data[9]).ok_or(DecodeError::Unsupported("color type"))?;
    if data[10] != 0 || data[11] != 0 {
        return Err(DecodeError::Unsupported("compression or filter method"));
    }
    if data[12] != 0 {
        return Err(DecodeError::Unsupported("interlaced images"));
    }

    Ok(Header {
        width,
        height,
        mode,
    })
}

/// Decodes an unfiltered PNG whose image data is made of stored blocks, such
/// as the ones produced by [`encode`](super::encode).
pub fn decode(encoded_data: &[u8]) -> Result<Image, DecodeError> {
    let chunks = read_chunks(encoded_data)?;

    let (first, rest) = chunks
        .split_first()
        .ok_or(DecodeError::Truncated(PNG_SIGNATURE.len()))?;
    let header = parse_ihdr(first)?;
    debug!(
        "Image header: width={} height={} mode={}",
        header.width, header.height, header.mode
    );
    Image::buffer_len(header.width, header.height, header.mode)?;

    let Some((last, body)) = rest.split_last() else {
        return Err(DecodeError::UnexpectedChunk {
            expected: tag_name(&IEND),
            found: first.name(),
        });
    };
    if last.tag != IEND {
        return Err(DecodeError::UnexpectedChunk {
            expected: tag_name(&IEND),
            found: last.name(),
        });
    }

    let mut palette_rgb: Option<&[u8]> = None;
    let mut alpha: &[u8] = &[];
    let mut zlib = Vec::new();
    for chunk in body {
        match chunk.tag {
            PLTE => {
                if chunk.data.len() % 3 != 0 || chunk.data.len() / 3 > MAX_PALETTE_ENTRIES {
                    return Err(DecodeError::MalformedChunk(chunk.name()));
                }
                palette_rgb = Some(chunk.data.as_slice());
            }
            TRNS => alpha = chunk.data.as_slice(),
            IDAT => zlib.extend_from_slice(&chunk.data),
            IHDR | IEND => {
                return Err(DecodeError::UnexpectedChunk {
                    expected: tag_name(&IDAT),
                    found: chunk.name(),
                })
            }
            _ => warn!("Skipping {} chunk", chunk.name()),
        }
    }

    // Stored blocks never shrink their input, so the scanlines must fit in
    // the IDAT payload before anything is allocated for them.
    let bpp = header.mode.serialized_bpp();
    let expected = (header.width as usize)
        .checked_mul(bpp)
        .and_then(|len| len.checked_add(1))
        .and_then(|line_len| line_len.checked_mul(header.height as usize))
        .ok_or(DecodeError::Image(ImageError::DimensionOverflow {
            width: header.width,
            height: header.height,
        }))?;
    if expected > zlib.len() {
        error!(
            "Header claims {} bytes of scanlines but image data holds {}",
            expected,
            zlib.len()
        );
        return Err(DecodeError::DataLengthMismatch {
            expected,
            found: zlib.len(),
        });
    }

    let raw = inflate_stored(&zlib)?;
    if raw.len() != expected {
        return Err(DecodeError::DataLengthMismatch {
            expected,
            found: raw.len(),
        });
    }

    let mut image = Image::new(header.width, header.height, header.mode)?;
    if header.mode == ColorMode::Palette {
        let rgb = palette_rgb.ok_or_else(|| DecodeError::MalformedChunk(tag_name(&PLTE)))?;
        let palette: Vec<u32> = rgb
            .chunks_exact(3)
            .enumerate()
            .map(|(i, c)| {
                let a = alpha.get(i).copied().unwrap_or(0xFF);
                u32::from_le_bytes([c[0], c[1], c[2], a])
            })
            .collect();
        image.set_palette(&palette)?;
    }

    let width = image.width();
    let mut stream = image
        .begin_stream(0, 0)
        .ok_or(DecodeError::Unsupported("empty image"))?;
    let line_len = expected / header.height as usize;
    for (row, line) in raw.chunks_exact(line_len).enumerate() {
        if line[0] != 0 {
            return Err(DecodeError::UnsupportedFilter {
                row,
                filter: line[0],
            });
        }
        for pixel in line[1..].chunks_exact(bpp).take(width as usize) {
            let mut bytes = [0u8; 4];
            bytes[..bpp].copy_from_slice(pixel);
            stream.put_pixel(u32::from_le_bytes(bytes));
        }
    }

    info!("Decoded {}x{} {} image", header.width, header.height, header.mode);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::chunk::{Chunk, PngWriter};
    use crate::image::encode;

    #[test]
    fn test_read_chunks_order() {
        let mut image = Image::new(2, 1, ColorMode::Palette).unwrap();
        image.set_palette(&[0xFF00_00FF]).unwrap();
        let encoded = encode(&image).unwrap();

        let names: Vec<String> = read_chunks(&encoded)
            .unwrap()
            .iter()
            .map(RawChunk::name)
            .collect();
        assert_eq!(names, ["IHDR", "PLTE", "tRNS", "IDAT", "IEND"]);
    }

    #[test]
    fn test_bad_signature() {
        assert_eq!(read_chunks(b"GIF89a"), Err(DecodeError::InvalidSignature));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let image = Image::new(2, 2, ColorMode::Rgb).unwrap();
        let mut encoded = encode(&image).unwrap();
        // First byte of the IHDR width
        encoded[16] ^= 0x80;
        assert!(matches!(
            read_chunks(&encoded),
            Err(DecodeError::CrcMismatch { ref tag, .. }) if tag == "IHDR"
        ));
    }

    #[test]
    fn test_truncated_file() {
        let image = Image::new(2, 2, ColorMode::Rgb).unwrap();
        let encoded = encode(&image).unwrap();
        let cut = encoded.len() - 6;
        assert_eq!(
            read_chunks(&encoded[..cut]),
            Err(DecodeError::Truncated(encoded.len() - 12))
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let mut image = Image::new(3, 2, ColorMode::Rgb).unwrap();
        for (i, color) in [0x0001_0203u32, 0x0004_0506, 0x0007_0809].iter().enumerate() {
            image.set_pixel(i as u32, 1, *color);
        }
        let decoded = decode(&encode(&image).unwrap()).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_decode_palette_pads_to_sixteen() {
        let mut image = Image::new(2, 2, ColorMode::Palette).unwrap();
        image.set_palette(&[0x8000_00FF, 0xFF00_FF00]).unwrap();
        image.set_pixel(1, 1, 1);

        let decoded = decode(&encode(&image).unwrap()).unwrap();
        assert_eq!(decoded.palette().len(), 16);
        assert_eq!(&decoded.palette()[..2], image.palette());
        assert!(decoded.palette()[2..].iter().all(|&entry| entry == 0));
        assert_eq!(decoded.pixels(), image.pixels());
    }

    fn rebuild(chunks: &[RawChunk]) -> Vec<u8> {
        let mut writer = PngWriter::new();
        writer.write_signature();
        for chunk in chunks {
            writer.write_chunk(Chunk::new(chunk.tag, &chunk.data)).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_oversized_header_rejected_before_allocation() {
        let image = Image::new(1, 1, ColorMode::Rgba).unwrap();
        let mut chunks = read_chunks(&encode(&image).unwrap()).unwrap();
        chunks[0].data[..4].copy_from_slice(&16_000u32.to_be_bytes());
        chunks[0].data[4..8].copy_from_slice(&16_000u32.to_be_bytes());

        assert_eq!(
            decode(&rebuild(&chunks)),
            Err(DecodeError::DataLengthMismatch {
                expected: 16_000 * (16_000 * 4 + 1),
                found: 2 + 5 + 5 + 4,
            })
        );
    }

    #[test]
    fn test_zero_width_header() {
        let image = Image::new(1, 1, ColorMode::Grayscale).unwrap();
        let mut chunks = read_chunks(&encode(&image).unwrap()).unwrap();
        chunks[0].data[..4].copy_from_slice(&0u32.to_be_bytes());

        assert_eq!(
            decode(&rebuild(&chunks)),
            Err(DecodeError::Image(ImageError::InvalidDimensions {
                width: 0,
                height: 1
            }))
        );
    }

    #[test]
    fn test_missing_iend() {
        let image = Image::new(1, 1, ColorMode::Grayscale).unwrap();
        let chunks = read_chunks(&encode(&image).unwrap()).unwrap();
        assert!(matches!(
            decode(&rebuild(&chunks[..1])),
            Err(DecodeError::UnexpectedChunk { ref found, .. }) if found == "IHDR"
        ));
        assert!(matches!(
            decode(&rebuild(&chunks[..2])),
            Err(DecodeError::UnexpectedChunk { ref found, .. }) if found == "IDAT"
        ));
    }

    #[test]
    fn test_hostile_chunk_length() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&u32::MAX.to_be_bytes());
        data.extend_from_slice(b"IDAT");
        data.extend_from_slice(&[0; 8]);
        assert_eq!(read_chunks(&data), Err(DecodeError::Truncated(8)));
    }
}
