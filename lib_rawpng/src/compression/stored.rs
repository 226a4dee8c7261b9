//! Zlib container made of stored (uncompressed) deflate blocks.
//!
//! Layout written into the IDAT payload:
//!
//! ```text
//! 78 01                       zlib header, deflate, no preset dictionary
//! per scanline:
//!   BFINAL | LEN (LE16) | NLEN (LE16) | 00 | pixel bytes
//! ADLER32 (BE)                over every filter and pixel byte
//! ```
//!
//! Scanlines longer than a stored block can carry are split over several
//! blocks; everything else gets exactly one block.

use log::debug;

use crate::image::chunk::PngWriter;
use crate::image::format::{ColorMode, Image};

pub const ZLIB_HEADER: [u8; 2] = [0x78, 0x01];
pub const MAX_STORED_BLOCK: usize = 0xFFFF;
pub const STORED_BLOCK_HEADER: usize = 5;
pub const ADLER_TRAILER: usize = 4;

/// Filter selector prefixed to every scanline. Only "None" is ever emitted.
pub const FILTER_NONE: u8 = 0;

/// Filter byte plus serialized pixel bytes of one row.
pub fn scanline_len(width: u32, mode: ColorMode) -> Option<usize> {
    (width as usize)
        .checked_mul(mode.serialized_bpp())?
        .checked_add(1)
}

pub fn blocks_per_scanline(scanline_len: usize) -> usize {
    scanline_len.div_ceil(MAX_STORED_BLOCK)
}

/// Exact size of the zlib stream for an image, derived from its shape alone.
///
/// `2 + rows * (5 * blocks_per_row + scanline_len) + 4`
pub fn stored_zlib_len(width: u32, height: u32, mode: ColorMode) -> Option<usize> {
    let line = scanline_len(width, mode)?;
    let per_row = (STORED_BLOCK_HEADER * blocks_per_scanline(line)).checked_add(line)?;
    (height as usize)
        .checked_mul(per_row)?
        .checked_add(ZLIB_HEADER.len() + ADLER_TRAILER)
}

/// Writes the zlib stream for `image` into the open chunk of `writer`.
pub fn write_stored_zlib(writer: &mut PngWriter, image: &Image) {
    let mode = image.mode();
    let height = image.height() as usize;
    let line_len = image.width() as usize * mode.serialized_bpp() + 1;
    let blocks = blocks_per_scanline(line_len);

    writer.write(&ZLIB_HEADER);
    writer.reset_adler();

    let mut line = Vec::with_capacity(line_len);
    for (y, row) in image.rows().enumerate() {
        line.clear();
        line.push(FILTER_NONE);
        match mode {
            ColorMode::Rgb => {
                for pixel in row.chunks_exact(4) {
                    line.extend_from_slice(&pixel[..3]);
                }
            }
            _ => line.extend_from_slice(row),
        }

        let last_row = y + 1 == height;
        for (i, block) in line.chunks(MAX_STORED_BLOCK).enumerate() {
            let is_final = last_row && i + 1 == blocks;
            let len = block.len() as u16;
            writer.write_u8(u8::from(is_final));
            writer.write(&len.to_le_bytes());
            writer.write(&(!len).to_le_bytes());
            writer.write_literal(block);
        }
    }

    let adler = writer.adler();
    writer.write_u32_be(adler);
    debug!(
        "Packed {} scanlines of {} bytes, adler32 {:#010x}",
        height, line_len, adler
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::adler32_of;
    use crate::compression::inflate::inflate_stored;
    use crate::constants::IDAT;

    fn pack(image: &Image) -> Vec<u8> {
        let (width, height) = image.dimensions();
        let len = stored_zlib_len(width, height, image.mode()).unwrap();

        let mut writer = PngWriter::new();
        writer.begin_chunk(IDAT, len).unwrap();
        write_stored_zlib(&mut writer, image);
        writer.end_chunk().unwrap();

        let bytes = writer.finish().unwrap();
        // Drop length, tag and CRC
        bytes[8..bytes.len() - 4].to_vec()
    }

    #[test]
    fn test_length_formula() {
        assert_eq!(scanline_len(2, ColorMode::Rgba), Some(9));
        assert_eq!(scanline_len(2, ColorMode::Rgb), Some(7));
        assert_eq!(stored_zlib_len(2, 2, ColorMode::Rgba), Some(2 + 2 * (5 + 9) + 4));
        assert_eq!(stored_zlib_len(7, 3, ColorMode::Grayscale), Some(2 + 3 * (5 + 8) + 4));
    }

    #[test]
    fn test_long_scanline_needs_two_blocks() {
        // 16384 * 4 + 1 = 65537 bytes per row
        let line = scanline_len(16384, ColorMode::Rgba).unwrap();
        assert_eq!(blocks_per_scanline(line), 2);
        assert_eq!(
            stored_zlib_len(16384, 1, ColorMode::Rgba),
            Some(2 + 10 + 65537 + 4)
        );
        assert_eq!(blocks_per_scanline(MAX_STORED_BLOCK), 1);
    }

    #[test]
    fn test_grayscale_layout() {
        let mut image = Image::new(3, 2, ColorMode::Grayscale).unwrap();
        let mut stream = image.begin_stream(0, 0).unwrap();
        stream.extend([1, 2, 3, 4, 5, 6]);

        let zlib = pack(&image);
        let raw = [0, 1, 2, 3, 0, 4, 5, 6];
        let mut expected = vec![0x78, 0x01];
        expected.extend_from_slice(&[0x00, 4, 0, 0xFB, 0xFF, 0, 1, 2, 3]);
        expected.extend_from_slice(&[0x01, 4, 0, 0xFB, 0xFF, 0, 4, 5, 6]);
        expected.extend_from_slice(&adler32_of(&raw).to_be_bytes());
        assert_eq!(zlib, expected);
    }

    #[test]
    fn test_rgb_drops_padding_byte() {
        let mut image = Image::new(2, 1, ColorMode::Rgb).unwrap();
        image.set_pixel(0, 0, 0xEE03_0201);
        image.set_pixel(1, 0, 0xEE06_0504);

        let zlib = pack(&image);
        assert_eq!(inflate_stored(&zlib).unwrap(), [0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_zlib_header_check_bits() {
        let header = u16::from_be_bytes(ZLIB_HEADER);
        assert_eq!(header % 31, 0);
        assert_eq!(ZLIB_HEADER[0] & 0x0F, 8);
        assert_eq!(ZLIB_HEADER[1] & 0x20, 0);
    }

    #[test]
    fn test_split_scanline_round_trips() {
        let mut image = Image::new(20_000, 2, ColorMode::Rgba).unwrap();
        image.set_pixel(19_999, 1, 0x0403_0201);
        image.set_pixel(16_383, 0, 0xFFFF_FFFF);

        let zlib = pack(&image);
        let raw = inflate_stored(&zlib).unwrap();
        assert_eq!(raw.len(), 2 * (20_000 * 4 + 1));
        assert_eq!(&raw[raw.len() - 4..], &[1, 2, 3, 4]);
        assert_eq!(&raw[1 + 16_383 * 4..1 + 16_384 * 4], &[0xFF; 4]);
    }
}
