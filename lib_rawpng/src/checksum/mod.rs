pub mod adler;
pub mod crc;

pub use adler::{adler32_of, adler_update, Adler32};
pub use crc::{crc32, crc32_of, Crc32};
