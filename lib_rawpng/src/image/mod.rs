pub mod chunk;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod format;
pub mod snapshot;
pub mod tga;

pub use cursor::PixelStream;
pub use decoder::{decode, read_chunks, DecodeError, RawChunk};
pub use encoder::{encode, save, EncodingError};
pub use format::{ColorMode, Image, ImageError};
