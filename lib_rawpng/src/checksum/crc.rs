/// Reflected CRC-32 polynomial used by PNG and zlib.
pub const CRC_POLYNOMIAL: u32 = 0xEDB8_8320;

/// Starting value of the running CRC before the first byte is folded in.
pub const CRC_INIT: u32 = 0xFFFF_FFFF;

static CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 {
                CRC_POLYNOMIAL ^ (c >> 1)
            } else {
                c >> 1
            };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// Folds `data` into a running CRC.
///
/// The running value must start at [`CRC_INIT`] and is bit-complemented by the
/// caller once all bytes have been processed.
pub fn crc32(data: &[u8], running_crc: u32) -> u32 {
    data.iter().fold(running_crc, |crc, &byte| {
        CRC_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8)
    })
}

/// Finished CRC of a complete byte slice.
pub fn crc32_of(data: &[u8]) -> u32 {
    !crc32(data, CRC_INIT)
}

/// Running CRC accumulator for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    running: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub const fn new() -> Self {
        Self { running: CRC_INIT }
    }

    pub fn reset(&mut self) {
        self.running = CRC_INIT;
    }

    pub fn update(&mut self, data: &[u8]) {
        self.running = crc32(data, self.running);
    }

    /// The value emitted after a chunk's payload.
    pub fn finish(&self) -> u32 {
        !self.running
    }
}
