use log::{debug, error};
use thiserror::Error;

use crate::checksum::adler32_of;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InflateError {
    #[error("Invalid zlib header {0:#06x}")]
    InvalidHeader(u16),
    #[error("Preset dictionaries are not supported")]
    PresetDictionary,
    #[error("Unexpected end of zlib data at offset {0}")]
    UnexpectedEof(usize),
    #[error("Unsupported deflate block type {0}: only stored blocks can be read")]
    UnsupportedBlockType(u8),
    #[error("Stored block length {len:#06x} does not match its complement {nlen:#06x}")]
    LengthComplementMismatch { len: u16, nlen: u16 },
    #[error("Adler-32 mismatch: stream says {expected:#010x}, data gives {found:#010x}")]
    AdlerMismatch { expected: u32, found: u32 },
}

fn take<'a>(data: &'a [u8], cursor: &mut usize, n: usize) -> Result<&'a [u8], InflateError> {
    let bytes = data
        .get(*cursor..*cursor + n)
        .ok_or(InflateError::UnexpectedEof(*cursor))?;
    *cursor += n;
    Ok(bytes)
}

/// Decodes a zlib stream made only of stored deflate blocks, checking the
/// Adler-32 trailer.
pub fn inflate_stored(data: &[u8]) -> Result<Vec<u8>, InflateError> {
    let mut cursor = 0;

    let header = take(data, &mut cursor, 2)?;
    let (cmf, flg) = (header[0], header[1]);
    let check = u16::from_be_bytes([cmf, flg]);
    if cmf & 0x0F != 8 || cmf >> 4 > 7 || check % 31 != 0 {
        error!("Invalid zlib header {:#06x}", check);
        return Err(InflateError::InvalidHeader(check));
    }
    if flg & 0x20 != 0 {
        return Err(InflateError::PresetDictionary);
    }

    let mut output = Vec::new();
    let mut blocks = 0usize;
    loop {
        let block_header = take(data, &mut cursor, 1)?[0];
        let block_type = (block_header >> 1) & 0b11;
        if block_type != 0 {
            error!("Encountered deflate block type {}", block_type);
            return Err(InflateError::UnsupportedBlockType(block_type));
        }

        let lengths = take(data, &mut cursor, 4)?;
        let len = u16::from_le_bytes([lengths[0], lengths[1]]);
        let nlen = u16::from_le_bytes([lengths[2], lengths[3]]);
        if len != !nlen {
            return Err(InflateError::LengthComplementMismatch { len, nlen });
        }

        output.extend_from_slice(take(data, &mut cursor, usize::from(len))?);
        blocks += 1;

        if block_header & 1 == 1 {
            break;
        }
    }

    let trailer = take(data, &mut cursor, 4)?;
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let found = adler32_of(&output);
    if expected != found {
        error!("Adler-32 mismatch: {:#010x} != {:#010x}", expected, found);
        return Err(InflateError::AdlerMismatch { expected, found });
    }

    debug!("Inflated {} stored blocks into {} bytes", blocks, output.len());
    Ok(output)
}
