use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::{error, info};
use thiserror::Error;

use super::format::{ColorMode, Image};

pub const TGA_HEADER_LEN: usize = 18;

const TYPE_TRUE_COLOR: u8 = 2;
const TYPE_GRAYSCALE: u8 = 3;

#[derive(Error, Debug)]
pub enum TgaError {
    #[error("Image {width}x{height} exceeds the 65535 pixel TGA limit")]
    TooLarge { width: u32, height: u32 },
    #[error("Failed to write TGA file")]
    Io(#[from] io::Error),
}

/// Uncompressed TGA dump, rows stored bottom-up.
///
/// Palette images are expanded through their palette to 32-bit BGRA.
pub fn encode(image: &Image) -> Result<Vec<u8>, TgaError> {
    let (width, height) = image.dimensions();
    let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
        error!("{}x{} does not fit a TGA header", width, height);
        return Err(TgaError::TooLarge { width, height });
    };

    let mode = image.mode();
    let (image_type, bits, alpha_bits) = match mode {
        ColorMode::Grayscale => (TYPE_GRAYSCALE, 8, 0),
        ColorMode::GrayscaleAlpha => (TYPE_GRAYSCALE, 16, 8),
        ColorMode::Rgb => (TYPE_TRUE_COLOR, 24, 0),
        ColorMode::Rgba | ColorMode::Palette => (TYPE_TRUE_COLOR, 32, 8),
    };

    let mut header = [0u8; TGA_HEADER_LEN];
    header[2] = image_type;
    header[12..14].copy_from_slice(&w.to_le_bytes());
    header[14..16].copy_from_slice(&h.to_le_bytes());
    header[16] = bits;
    header[17] = alpha_bits;

    let pixel_count = width as usize * height as usize;
    let mut out = Vec::with_capacity(TGA_HEADER_LEN + pixel_count * usize::from(bits / 8));
    out.extend_from_slice(&header);

    let palette = image.palette();
    for row in image.rows().rev() {
        match mode {
            ColorMode::Grayscale | ColorMode::GrayscaleAlpha => out.extend_from_slice(row),
            ColorMode::Rgb => {
                for px in row.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
            ColorMode::Rgba => {
                for px in row.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
            ColorMode::Palette => {
                for &index in row {
                    let [r, g, b, a] = palette
                        .get(usize::from(index))
                        .copied()
                        .unwrap_or(0)
                        .to_le_bytes();
                    out.extend_from_slice(&[b, g, r, a]);
                }
            }
        }
    }

    Ok(out)
}

pub fn save<P: AsRef<Path>>(image: &Image, path: P) -> Result<(), TgaError> {
    let path = path.as_ref();
    let encoded = encode(image)?;
    File::create(path)?.write_all(&encoded)?;
    info!("Saved {} bytes to {}", encoded.len(), path.display());
    Ok(())
}
