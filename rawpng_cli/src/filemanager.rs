use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lib_rawpng::image::snapshot::{self, SnapshotError, SNAPSHOT_EXT};
use lib_rawpng::image::tga::{self, TgaError};
use lib_rawpng::{decode, DecodeError, EncodingError, Image, ImageError};
use log::info;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageHandlingError {
    #[error("Invalid file path: {0}")]
    InvalidPath(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("PNG encode error: {0}")]
    EncodingError(#[from] EncodingError),

    #[error("PNG decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("TGA error: {0}")]
    TgaError(#[from] TgaError),

    #[error("Snapshot error: {0}")]
    SnapshotError(#[from] SnapshotError),

    #[error("Image error: {0}")]
    ImageError(#[from] ImageError),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("Missing value for argument: {0}")]
    MissingArgument(&'static str),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Png,
    Tga,
}

impl OutputFormat {
    /// Picks the format from the extension; paths without one are written as PNG.
    pub fn from_path(path: &Path) -> Result<Self, ImageHandlingError> {
        match extension(path).as_deref() {
            None | Some(lib_rawpng::constants::FILE_EXT) => Ok(OutputFormat::Png),
            Some("tga") => Ok(OutputFormat::Tga),
            Some(other) => Err(ImageHandlingError::UnsupportedExtension(other.to_string())),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Path next to `path` with its extension replaced, the way texture dumps sit
/// beside their main output.
pub fn companion_path(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}

pub fn save_image(image: &Image, path: &Path) -> Result<(), ImageHandlingError> {
    if path.file_name().is_none() {
        return Err(ImageHandlingError::InvalidPath(path.to_path_buf()));
    }

    match OutputFormat::from_path(path)? {
        OutputFormat::Png => image.save(path)?,
        OutputFormat::Tga => tga::save(image, path)?,
    }

    info!("File saved successfully to {}", path.display());
    Ok(())
}

/// Loads a pixel snapshot or a PNG written by this tool.
pub fn open_image(path: &Path) -> Result<Image, ImageHandlingError> {
    let ext = extension(path)
        .ok_or_else(|| ImageHandlingError::UnsupportedExtension(String::new()))?;

    match ext.as_str() {
        SNAPSHOT_EXT => Ok(snapshot::load(path)?),
        lib_rawpng::constants::FILE_EXT => Ok(decode(&fs::read(path)?)?),
        _ => Err(ImageHandlingError::UnsupportedExtension(ext)),
    }
}
