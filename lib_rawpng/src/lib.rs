pub mod checksum;
pub mod compression;
pub mod constants;
pub mod image;

use log::*;
use std::io::Write;

pub use crate::image::format::{ColorMode, Image, ImageError};
pub use crate::image::{
    decode, encode, read_chunks, save, DecodeError, EncodingError, PixelStream, RawChunk,
};

/// Installs an `env_logger` writing to stderr.
///
/// `level` applies to this library and the `rawpng` binary; `RUST_LOG`
/// directives, when set, take precedence.
pub fn init_logging(level: LevelFilter) -> Result<(), SetLoggerError> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .filter(Some("lib_rawpng"), level)
        .filter(Some("rawpng"), level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init()
}
