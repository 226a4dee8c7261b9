use std::fs;
use std::io;
use std::path::Path;

use bincode::Options;
use log::{debug, error};
use thiserror::Error;

use super::format::{Image, ImageError, ImageRepr};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"RPXS";
pub const SNAPSHOT_EXT: &str = "rpxs";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Invalid format or missing snapshot header")]
    InvalidHeader,
    #[error("Failed to (de)serialize snapshot")]
    Serialization(#[from] bincode::Error),
    #[error("Snapshot describes an invalid image")]
    Corrupt(#[from] ImageError),
    #[error("Failed to access snapshot file")]
    Io(#[from] io::Error),
}

/// Serializes the image, pixels and palette included, behind [`SNAPSHOT_MAGIC`].
pub fn to_bytes(image: &Image) -> Result<Vec<u8>, SnapshotError> {
    let mut out = SNAPSHOT_MAGIC.to_vec();
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .serialize_into(&mut out, image)?;
    debug!("Snapshot serialized: {} bytes", out.len());
    Ok(out)
}

pub fn from_bytes(data: &[u8]) -> Result<Image, SnapshotError> {
    let body = data.strip_prefix(&SNAPSHOT_MAGIC[..]).ok_or_else(|| {
        error!("Invalid format or missing magic number in snapshot header");
        SnapshotError::InvalidHeader
    })?;

    // A snapshot can never decode to more than its own size.
    let repr: ImageRepr = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(body.len() as u64)
        .deserialize(body)?;
    let image = Image::try_from(repr)?;

    debug!(
        "Snapshot loaded: {}x{} {}",
        image.width(),
        image.height(),
        image.mode()
    );
    Ok(image)
}

pub fn save<P: AsRef<Path>>(image: &Image, path: P) -> Result<(), SnapshotError> {
    fs::write(path, to_bytes(image)?)?;
    Ok(())
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Image, SnapshotError> {
    from_bytes(&fs::read(path)?)
}
