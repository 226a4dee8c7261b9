/// Largest prime below 2^16.
pub const ADLER_MODULUS: u32 = 65521;

/// Folds a single byte into the two Adler sums.
pub fn adler_update(byte: u8, s1: u32, s2: u32) -> (u32, u32) {
    let s1 = (s1 + u32::from(byte)) % ADLER_MODULUS;
    let s2 = (s2 + s1) % ADLER_MODULUS;
    (s1, s2)
}

/// Finished Adler-32 of a complete byte slice.
pub fn adler32_of(data: &[u8]) -> u32 {
    let mut adler = Adler32::new();
    adler.update(data);
    adler.finish()
}

/// Running Adler-32 accumulator, one per compressed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    pub const fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            (self.s1, self.s2) = adler_update(byte, self.s1, self.s2);
        }
    }

    /// Combined value, `(s2 << 16) | s1`.
    pub fn finish(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }
}
