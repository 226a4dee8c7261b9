use log::warn;

use super::format::Image;

/// Sequential writer over an [`Image`], advancing in row-major order.
///
/// The stream never ends: after the last pixel of the last row it wraps back
/// to `(0, 0)`.
#[derive(Debug)]
pub struct PixelStream<'a> {
    image: &'a mut Image,
    x: u32,
    y: u32,
}

impl Image {
    /// Starts a stream at `(x, y)`. Returns `None` if the position is outside the image.
    pub fn begin_stream(&mut self, x: u32, y: u32) -> Option<PixelStream<'_>> {
        if !self.contains(x, y) {
            warn!(
                "Rejected stream start ({}, {}) on a {}x{} image",
                x,
                y,
                self.width(),
                self.height()
            );
            return None;
        }
        Some(PixelStream { image: self, x, y })
    }
}

impl<'a> PixelStream<'a> {
    /// Moves the cursor. Out-of-range positions are rejected and leave it unchanged.
    pub fn seek(&mut self, x: u32, y: u32) -> bool {
        if !self.image.contains(x, y) {
            warn!("Rejected stream seek to ({}, {})", x, y);
            return false;
        }
        self.x = x;
        self.y = y;
        true
    }

    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn put_pixel(&mut self, color: u32) {
        self.image.set_pixel(self.x, self.y, color);

        self.x += 1;
        if self.x >= self.image.width() {
            self.x = 0;
            self.y += 1;
            if self.y >= self.image.height() {
                self.y = 0;
            }
        }
    }

    pub fn image(&self) -> &Image {
        self.image
    }
}

impl Extend<u32> for PixelStream<'_> {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, colors: T) {
        for color in colors {
            self.put_pixel(color);
        }
    }
}
