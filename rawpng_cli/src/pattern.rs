use clap::builder::PossibleValue;
use clap::ValueEnum;
use lib_rawpng::{ColorMode, Image, ImageError};
use log::debug;

/// Side of a checkerboard cell, in pixels.
const CHECKER_CELL: u32 = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pattern {
    Gradient,
    Checker,
}

impl ValueEnum for Pattern {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Gradient, Self::Checker]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::Gradient => PossibleValue::new("gradient"),
            Self::Checker => PossibleValue::new("checker"),
        })
    }
}

/// Command line handle for [`ColorMode`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ModeArg(pub ColorMode);

static MODE_ARGS: [ModeArg; 5] = [
    ModeArg(ColorMode::Grayscale),
    ModeArg(ColorMode::Rgb),
    ModeArg(ColorMode::Palette),
    ModeArg(ColorMode::GrayscaleAlpha),
    ModeArg(ColorMode::Rgba),
];

impl ValueEnum for ModeArg {
    fn value_variants<'a>() -> &'a [Self] {
        &MODE_ARGS
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.0.name()))
    }
}

/// 16-step gray ramp, opaque, used for palette-mode patterns.
pub fn ramp_palette() -> Vec<u32> {
    (0..16u32)
        .map(|i| {
            let v = i * 17;
            0xFF00_0000 | (v << 16) | (v << 8) | v
        })
        .collect()
}

fn scale(value: u32, extent: u32) -> u32 {
    if extent <= 1 {
        0
    } else {
        (u64::from(value) * 255 / u64::from(extent - 1)) as u32
    }
}

fn color_at(mode: ColorMode, pattern: Pattern, x: u32, y: u32, width: u32, height: u32) -> u32 {
    let (r, g, b) = match pattern {
        Pattern::Gradient => (scale(x, width), scale(y, height), 0x80),
        Pattern::Checker => {
            let v = if (x / CHECKER_CELL + y / CHECKER_CELL) % 2 == 0 {
                0xFF
            } else {
                0x00
            };
            (v, v, v)
        }
    };
    let gray = (r + g + b) / 3;

    match mode {
        ColorMode::Grayscale => gray,
        ColorMode::GrayscaleAlpha => 0xFF00 | gray,
        ColorMode::Palette => gray >> 4,
        ColorMode::Rgb | ColorMode::Rgba => 0xFF00_0000 | (b << 16) | (g << 8) | r,
    }
}

/// Allocates an image and fills it row by row through the pixel stream.
pub fn render(
    width: u32,
    height: u32,
    mode: ColorMode,
    pattern: Pattern,
) -> Result<Image, ImageError> {
    let mut image = Image::new(width, height, mode)?;
    if mode == ColorMode::Palette {
        image.set_palette(&ramp_palette())?;
    }

    if let Some(mut stream) = image.begin_stream(0, 0) {
        for y in 0..height {
            for x in 0..width {
                stream.put_pixel(color_at(mode, pattern, x, y, width, height));
            }
        }
    }

    debug!("Rendered {:?} pattern into {}x{} {}", pattern, width, height, mode);
    Ok(image)
}
