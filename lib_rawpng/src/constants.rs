pub const FORMAT_NAME: &str = "Portable Network Graphics";
pub const FILE_EXT: &str = "png";

/// Fixed 8-byte magic every PNG file starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub const IHDR: [u8; 4] = *b"IHDR";
pub const PLTE: [u8; 4] = *b"PLTE";
pub const TRNS: [u8; 4] = *b"tRNS";
pub const IDAT: [u8; 4] = *b"IDAT";
pub const IEND: [u8; 4] = *b"IEND";

pub const IHDR_LENGTH: usize = 13;
pub const BIT_DEPTH: u8 = 8;

/// Chunk lengths are limited to 2^31 - 1.
pub const MAX_CHUNK_LENGTH: usize = 0x7FFF_FFFF;

pub const MAX_PALETTE_ENTRIES: usize = 256;
/// PLTE and tRNS are never emitted with fewer entries than this.
pub const MIN_PALETTE_ENTRIES: usize = 16;

/// Length, tag and CRC fields surrounding each chunk payload.
pub const CHUNK_OVERHEAD: usize = 12;
