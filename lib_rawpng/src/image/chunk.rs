use log::{debug, error};

use super::encoder::EncodingError;
use crate::checksum::{Adler32, Crc32};
use crate::constants::{MAX_CHUNK_LENGTH, PNG_SIGNATURE};

/// A chunk ready to be framed: 4-byte tag plus payload.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub tag: [u8; 4],
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn new(tag: [u8; 4], payload: &'a [u8]) -> Self {
        Self { tag, payload }
    }
}

#[derive(Debug)]
struct OpenChunk {
    tag: [u8; 4],
    declared: usize,
    payload_start: usize,
}

/// Output buffer of a single encode call.
///
/// Carries the running CRC of the open chunk and the running Adler sum of the
/// compressed container being written into it.
#[derive(Debug, Default)]
pub struct PngWriter {
    out: Vec<u8>,
    crc: Crc32,
    adler: Adler32,
    open: Option<OpenChunk>,
}

pub(crate) fn tag_name(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

impl PngWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The capacity is headroom only; the buffer grows past it if needed.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn write_signature(&mut self) {
        debug_assert!(self.open.is_none(), "signature written inside a chunk");
        self.out.extend_from_slice(&PNG_SIGNATURE);
    }

    /// Writes the length (not CRC-covered) and the tag, and starts a fresh CRC.
    pub fn begin_chunk(&mut self, tag: [u8; 4], length: usize) -> Result<(), EncodingError> {
        if let Some(open) = &self.open {
            error!("Chunk {} opened while {} is still open", tag_name(&tag), tag_name(&open.tag));
            return Err(EncodingError::ChunkStillOpen {
                open: tag_name(&open.tag),
            });
        }
        if length > MAX_CHUNK_LENGTH {
            error!("{} payload of {} bytes is too large", tag_name(&tag), length);
            return Err(EncodingError::ChunkTooLarge {
                tag: tag_name(&tag),
                length,
            });
        }

        self.out.extend_from_slice(&(length as u32).to_be_bytes());
        self.crc.reset();
        self.write(&tag);
        self.open = Some(OpenChunk {
            tag,
            declared: length,
            payload_start: self.out.len(),
        });
        Ok(())
    }

    /// Appends CRC-covered bytes to the open chunk.
    pub fn write(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
        self.crc.update(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write(&[value]);
    }

    pub fn write_u32_be(&mut self, value: u32) {
        self.write(&value.to_be_bytes());
    }

    /// Restarts the Adler sum for a new compressed container.
    pub fn reset_adler(&mut self) {
        self.adler = Adler32::new();
    }

    /// Appends uncompressed payload bytes, folding them into Adler and then CRC.
    pub fn write_literal(&mut self, bytes: &[u8]) {
        self.adler.update(bytes);
        self.write(bytes);
    }

    pub fn adler(&self) -> u32 {
        self.adler.finish()
    }

    /// Closes the open chunk with its CRC.
    ///
    /// A payload that differs from the declared length is an encoder bug: it
    /// panics in debug builds and is reported as `LengthMismatch` otherwise.
    pub fn end_chunk(&mut self) -> Result<(), EncodingError> {
        let open = self.open.take().ok_or_else(|| {
            error!("end_chunk called without an open chunk");
            EncodingError::NoOpenChunk
        })?;

        let written = self.out.len() - open.payload_start;
        debug_assert_eq!(
            written,
            open.declared,
            "{} chunk declared {} bytes",
            tag_name(&open.tag),
            open.declared
        );
        if written != open.declared {
            error!(
                "{} chunk declared {} bytes but {} were written",
                tag_name(&open.tag),
                open.declared,
                written
            );
            return Err(EncodingError::LengthMismatch {
                tag: tag_name(&open.tag),
                declared: open.declared,
                written,
            });
        }

        self.out.extend_from_slice(&self.crc.finish().to_be_bytes());
        debug!("{} chunk written: {} bytes", tag_name(&open.tag), written);
        Ok(())
    }

    pub fn write_chunk(&mut self, chunk: Chunk<'_>) -> Result<(), EncodingError> {
        self.begin_chunk(chunk.tag, chunk.payload.len())?;
        self.write(chunk.payload);
        self.end_chunk()
    }

    /// Hands over the finished bytes. Fails if a chunk was left open.
    pub fn finish(self) -> Result<Vec<u8>, EncodingError> {
        if let Some(open) = self.open {
            error!("Output finished with {} still open", tag_name(&open.tag));
            return Err(EncodingError::ChunkStillOpen {
                open: tag_name(&open.tag),
            });
        }
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::crc32_of;
    use crate::constants::IEND;

    #[test]
    fn test_empty_iend_chunk() {
        let mut writer = PngWriter::new();
        writer.write_chunk(Chunk::new(IEND, &[])).unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(
            bytes,
            [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]
        );
    }

    #[test]
    fn test_crc_covers_tag_and_payload_only() {
        let mut writer = PngWriter::new();
        writer.begin_chunk(*b"teXt", 5).unwrap();
        writer.write(b"he");
        writer.write_u8(b'l');
        writer.write(b"lo");
        writer.end_chunk().unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(&bytes[..4], &5u32.to_be_bytes());
        assert_eq!(&bytes[4..13], b"teXthello");
        assert_eq!(&bytes[13..], &crc32_of(b"teXthello").to_be_bytes());
    }

    #[test]
    fn test_consecutive_chunks_reset_crc() {
        let mut writer = PngWriter::new();
        writer.write_chunk(Chunk::new(*b"abcd", &[1, 2, 3])).unwrap();
        writer.write_chunk(Chunk::new(IEND, &[])).unwrap();
        let bytes = writer.finish().unwrap();
        assert_eq!(&bytes[bytes.len() - 4..], &[0xAE, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn test_nested_chunk_rejected() {
        let mut writer = PngWriter::new();
        writer.begin_chunk(*b"abcd", 0).unwrap();
        assert!(matches!(
            writer.begin_chunk(*b"efgh", 0),
            Err(EncodingError::ChunkStillOpen { .. })
        ));
        assert!(matches!(
            writer.finish(),
            Err(EncodingError::ChunkStillOpen { .. })
        ));
    }

    #[test]
    fn test_end_without_begin() {
        let mut writer = PngWriter::new();
        assert!(matches!(writer.end_chunk(), Err(EncodingError::NoOpenChunk)));
    }

    #[test]
    fn test_oversized_chunk_rejected() {
        let mut writer = PngWriter::new();
        assert!(matches!(
            writer.begin_chunk(*b"IDAT", MAX_CHUNK_LENGTH + 1),
            Err(EncodingError::ChunkTooLarge { .. })
        ));
        assert!(writer.is_empty());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "declared 4 bytes")]
    fn test_short_payload_is_fatal_in_debug() {
        let mut writer = PngWriter::new();
        writer.begin_chunk(*b"abcd", 4).unwrap();
        writer.write(&[1, 2, 3]);
        let _ = writer.end_chunk();
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_short_payload_reported_in_release() {
        let mut writer = PngWriter::new();
        writer.begin_chunk(*b"abcd", 4).unwrap();
        writer.write(&[1, 2, 3]);
        assert!(matches!(
            writer.end_chunk(),
            Err(EncodingError::LengthMismatch {
                ref tag,
                declared: 4,
                written: 3
            }) if tag == "abcd"
        ));
        // No CRC is appended for the rejected chunk
        assert_eq!(writer.len(), 4 + 4 + 3);
    }

    #[test]
    fn test_literal_feeds_adler() {
        let mut writer = PngWriter::new();
        writer.begin_chunk(*b"IDAT", 9).unwrap();
        writer.write_literal(b"Wiki");
        writer.write_literal(b"pedia");
        assert_eq!(writer.adler(), 0x11E6_0398);
        writer.end_chunk().unwrap();

        writer.reset_adler();
        assert_eq!(writer.adler(), 1);
    }
}
