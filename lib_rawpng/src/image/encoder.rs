use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::{debug, error, info};
use thiserror::Error;

use super::chunk::{Chunk, PngWriter};
use super::format::{ColorMode, Image};
use crate::compression::stored::{stored_zlib_len, write_stored_zlib};
use crate::constants::{
    BIT_DEPTH, CHUNK_OVERHEAD, IDAT, IEND, IHDR, IHDR_LENGTH, MAX_PALETTE_ENTRIES,
    MIN_PALETTE_ENTRIES, PLTE, PNG_SIGNATURE, TRNS,
};

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("{tag} chunk payload of {length} bytes exceeds the PNG chunk size limit")]
    ChunkTooLarge { tag: String, length: usize },
    #[error("{tag} chunk declared {declared} bytes but {written} were written")]
    LengthMismatch {
        tag: String,
        declared: usize,
        written: usize,
    },
    #[error("Chunk {open} is still open")]
    ChunkStillOpen { open: String },
    #[error("No chunk is open")]
    NoOpenChunk,
    #[error("Failed to write PNG file")]
    Io(#[from] io::Error),
}

/// Signature, IHDR, PLTE, tRNS and IEND, excluding the pixel data.
const FIXED_OVERHEAD: usize = PNG_SIGNATURE.len()
    + (CHUNK_OVERHEAD + IHDR_LENGTH)
    + (CHUNK_OVERHEAD + 3 * MAX_PALETTE_ENTRIES)
    + (CHUNK_OVERHEAD + MAX_PALETTE_ENTRIES)
    + CHUNK_OVERHEAD * 2;

/// Serializes `image` as a PNG file.
///
/// The pixel data is stored uncompressed, so the output is slightly larger
/// than the serialized pixel bytes. Encoding is a pure read of the image and
/// may be repeated; every call builds a fresh buffer.
pub fn encode(image: &Image) -> Result<Vec<u8>, EncodingError> {
    info!("Starting encoding");

    let (width, height) = image.dimensions();
    let mode = image.mode();
    let idat_len = stored_zlib_len(width, height, mode).ok_or_else(|| {
        error!("Compressed container for {}x{} overflows", width, height);
        EncodingError::ChunkTooLarge {
            tag: "IDAT".to_string(),
            length: usize::MAX,
        }
    })?;

    let mut writer =
        PngWriter::with_capacity(image.pixels().len().saturating_add(FIXED_OVERHEAD));

    // Step 1: Signature and header
    writer.write_signature();
    write_ihdr(&mut writer, image)?;
    debug!("Header written: {}x{} {} (tag {})", width, height, mode, mode.png_tag());

    // Step 2: Palette and its alpha channel
    if mode == ColorMode::Palette {
        write_palette(&mut writer, image.palette())?;
    }

    // Step 3: Pixel data
    writer.begin_chunk(IDAT, idat_len)?;
    write_stored_zlib(&mut writer, image);
    writer.end_chunk()?;

    // Step 4: Terminator
    writer.write_chunk(Chunk::new(IEND, &[]))?;

    let encoded = writer.finish()?;
    info!("Encoding process completed successfully: {} bytes", encoded.len());
    Ok(encoded)
}

/// Encodes `image` and writes it to `path` in one pass.
pub fn save<P: AsRef<Path>>(image: &Image, path: P) -> Result<(), EncodingError> {
    let path = path.as_ref();
    let encoded = encode(image)?;

    let mut file = File::create(path).map_err(|e| {
        error!("Failed to create {}: {}", path.display(), e);
        e
    })?;
    file.write_all(&encoded).map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        e
    })?;

    info!("Saved {} bytes to {}", encoded.len(), path.display());
    Ok(())
}

impl Image {
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        encode(self)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), EncodingError> {
        save(self, path)
    }
}

fn write_ihdr(writer: &mut PngWriter, image: &Image) -> Result<(), EncodingError> {
    writer.begin_chunk(IHDR, IHDR_LENGTH)?;
    writer.write_u32_be(image.width());
    writer.write_u32_be(image.height());
    writer.write_u8(BIT_DEPTH);
    writer.write_u8(image.mode().png_tag());
    // compression, filter and interlace methods
    writer.write(&[0, 0, 0]);
    writer.end_chunk()
}

/// PLTE and tRNS with at least [`MIN_PALETTE_ENTRIES`] entries, padded with zeros.
fn write_palette(writer: &mut PngWriter, palette: &[u32]) -> Result<(), EncodingError> {
    let count = palette.len().max(MIN_PALETTE_ENTRIES);
    let entry = |i: usize| palette.get(i).copied().unwrap_or(0).to_le_bytes();

    writer.begin_chunk(PLTE, count * 3)?;
    for i in 0..count {
        writer.write(&entry(i)[..3]);
    }
    writer.end_chunk()?;

    writer.begin_chunk(TRNS, count)?;
    for i in 0..count {
        writer.write_u8(entry(i)[3]);
    }
    writer.end_chunk()?;

    debug!(
        "Palette written with {} colors ({} declared)",
        count,
        palette.len()
    );
    Ok(())
}
