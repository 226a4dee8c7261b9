use std::fmt;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MAX_PALETTE_ENTRIES;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("Invalid image dimensions {width}x{height}: both must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Image dimensions {width}x{height} overflow the addressable pixel buffer")]
    DimensionOverflow { width: u32, height: u32 },
    #[error("Failed to allocate {0} bytes of pixel storage")]
    AllocationFailed(usize),
    #[error("Palette size {0} exceeds 256 colors")]
    PaletteTooLarge(usize),
    #[error("Color mode {0} does not carry a palette")]
    PaletteNotSupported(ColorMode),
    #[error("Pixel buffer holds {found} bytes, expected {expected}")]
    BufferLengthMismatch { expected: usize, found: usize },
}

/// Pixel layouts an [`Image`] can hold. All of them are 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMode {
    Grayscale,
    /// Serialized as 3 bytes per pixel, stored 4-byte aligned.
    Rgb,
    Palette,
    GrayscaleAlpha,
    Rgba,
}

impl ColorMode {
    pub const ALL: [ColorMode; 5] = [
        ColorMode::Grayscale,
        ColorMode::Rgb,
        ColorMode::Palette,
        ColorMode::GrayscaleAlpha,
        ColorMode::Rgba,
    ];

    /// Bytes each pixel occupies in memory.
    pub const fn storage_bpp(self) -> usize {
        match self {
            ColorMode::Grayscale | ColorMode::Palette => 1,
            ColorMode::GrayscaleAlpha => 2,
            ColorMode::Rgb | ColorMode::Rgba => 4,
        }
    }

    /// Bytes each pixel occupies in an encoded scanline.
    pub const fn serialized_bpp(self) -> usize {
        match self {
            ColorMode::Rgb => 3,
            other => other.storage_bpp(),
        }
    }

    /// Color type field of the IHDR chunk.
    pub const fn png_tag(self) -> u8 {
        match self {
            ColorMode::Grayscale => 0,
            ColorMode::Rgb => 2,
            ColorMode::Palette => 3,
            ColorMode::GrayscaleAlpha => 4,
            ColorMode::Rgba => 6,
        }
    }

    pub const fn from_png_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ColorMode::Grayscale),
            2 => Some(ColorMode::Rgb),
            3 => Some(ColorMode::Palette),
            4 => Some(ColorMode::GrayscaleAlpha),
            6 => Some(ColorMode::Rgba),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ColorMode::Grayscale => "gray",
            ColorMode::Rgb => "rgb",
            ColorMode::Palette => "palette",
            ColorMode::GrayscaleAlpha => "gray-alpha",
            ColorMode::Rgba => "rgba",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An owned pixel buffer with fixed dimensions and color mode.
///
/// Colors are passed around as packed `u32` values with the first channel in
/// the lowest byte: `0xAABBGGRR` for RGBA, `0xAAGG` for gray+alpha, and a
/// single byte for grayscale and palette indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ImageRepr")]
pub struct Image {
    width: u32,
    height: u32,
    mode: ColorMode,
    pixels: Vec<u8>,
    palette: Option<Vec<u32>>,
}

/// Unchecked field layout of a serialized [`Image`].
#[derive(Deserialize)]
pub(crate) struct ImageRepr {
    width: u32,
    height: u32,
    mode: ColorMode,
    pixels: Vec<u8>,
    palette: Option<Vec<u32>>,
}

impl TryFrom<ImageRepr> for Image {
    type Error = ImageError;

    fn try_from(repr: ImageRepr) -> Result<Self, Self::Error> {
        let image = Image {
            width: repr.width,
            height: repr.height,
            mode: repr.mode,
            pixels: repr.pixels,
            palette: repr.palette,
        };
        image.check_invariants()?;
        Ok(image)
    }
}

impl Image {
    /// Allocates a zeroed image.
    ///
    /// # Errors
    /// - `ImageError::InvalidDimensions` if either side is zero
    /// - `ImageError::DimensionOverflow` if `width * height * 4` does not fit in `usize`
    /// - `ImageError::AllocationFailed` if the pixel buffer cannot be reserved
    pub fn new(width: u32, height: u32, mode: ColorMode) -> Result<Self, ImageError> {
        let len = Self::buffer_len(width, height, mode)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| {
            error!("Failed to reserve {} bytes for a {}x{} image", len, width, height);
            ImageError::AllocationFailed(len)
        })?;
        pixels.resize(len, 0);

        debug!(
            "Created {}x{} {} image with {} bytes of storage",
            width, height, mode, len
        );

        Ok(Self {
            width,
            height,
            mode,
            pixels,
            palette: (mode == ColorMode::Palette).then(Vec::new),
        })
    }

    /// Storage size for the given dimensions, validating them on the way.
    pub fn buffer_len(width: u32, height: u32, mode: ColorMode) -> Result<usize, ImageError> {
        if width == 0 || height == 0 {
            error!("Rejected image dimensions {}x{}", width, height);
            return Err(ImageError::InvalidDimensions { width, height });
        }

        let pixel_count = (width as usize)
            .checked_mul(height as usize)
            .filter(|count| count.checked_mul(4).is_some())
            .ok_or_else(|| {
                error!("Image dimensions {}x{} overflow usize", width, height);
                ImageError::DimensionOverflow { width, height }
            })?;

        Ok(pixel_count * mode.storage_bpp())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Raw storage, `width * height * mode.storage_bpp()` bytes in row-major order.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per stored row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.mode.storage_bpp()
    }

    /// Stored rows from top to bottom.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
        self.pixels.chunks_exact(self.stride())
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        self.contains(x, y)
            .then(|| (y as usize * self.width as usize + x as usize) * self.mode.storage_bpp())
    }

    /// Writes `color` truncated to the storage width. Out-of-range writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: u32) {
        if let Some(offset) = self.offset(x, y) {
            let bpp = self.mode.storage_bpp();
            self.pixels[offset..offset + bpp].copy_from_slice(&color.to_le_bytes()[..bpp]);
        }
    }

    /// Reads the packed color at `(x, y)`, or 0 outside the image.
    pub fn get_pixel(&self, x: u32, y: u32) -> u32 {
        match self.offset(x, y) {
            Some(offset) => {
                let bpp = self.mode.storage_bpp();
                let mut bytes = [0u8; 4];
                bytes[..bpp].copy_from_slice(&self.pixels[offset..offset + bpp]);
                u32::from_le_bytes(bytes)
            }
            None => 0,
        }
    }

    /// Fills every pixel with the same color.
    pub fn fill(&mut self, color: u32) {
        let bpp = self.mode.storage_bpp();
        let bytes = color.to_le_bytes();
        for pixel in self.pixels.chunks_exact_mut(bpp) {
            pixel.copy_from_slice(&bytes[..bpp]);
        }
    }

    /// Palette entries as packed RGBA values. Empty outside palette mode.
    pub fn palette(&self) -> &[u32] {
        self.palette.as_deref().unwrap_or(&[])
    }

    /// Replaces the palette.
    ///
    /// # Errors
    /// - `ImageError::PaletteNotSupported` if the image is not in palette mode
    /// - `ImageError::PaletteTooLarge` if more than 256 entries are given
    ///
    /// The existing palette is left untouched on error.
    pub fn set_palette(&mut self, entries: &[u32]) -> Result<(), ImageError> {
        if self.mode != ColorMode::Palette {
            error!("Attempted to set a palette on a {} image", self.mode);
            return Err(ImageError::PaletteNotSupported(self.mode));
        }
        if entries.len() > MAX_PALETTE_ENTRIES {
            error!(
                "Palette size {} exceeds the maximum allowed limit of {} colors",
                entries.len(),
                MAX_PALETTE_ENTRIES
            );
            return Err(ImageError::PaletteTooLarge(entries.len()));
        }

        self.palette = Some(entries.to_vec());
        debug!("Palette set with {} colors", entries.len());
        Ok(())
    }

    /// Re-checks the structural invariants, for images that did not come from [`Image::new`].
    fn check_invariants(&self) -> Result<(), ImageError> {
        let expected = Self::buffer_len(self.width, self.height, self.mode)?;
        if self.pixels.len() != expected {
            return Err(ImageError::BufferLengthMismatch {
                expected,
                found: self.pixels.len(),
            });
        }

        match (&self.palette, self.mode) {
            (Some(palette), ColorMode::Palette) if palette.len() > MAX_PALETTE_ENTRIES => {
                Err(ImageError::PaletteTooLarge(palette.len()))
            }
            (Some(_), mode) if mode != ColorMode::Palette => {
                Err(ImageError::PaletteNotSupported(mode))
            }
            _ => Ok(()),
        }
    }
}
