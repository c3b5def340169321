// THEORY:
// The `Frame` module is the bridge between raw image data and the analysis
// stages. A `Frame` is a "dumb" data container: a fixed-size grid of RGB samples
// that is immutable once produced. It knows how to hand out its pixels in scan
// order and nothing else; it cannot compare itself to another frame.
//
// Key architectural principles:
// 1.  **Single owner**: a frame is moved through the pipeline. The motion detector
//     keeps exactly one of them (the previous frame) between ticks.
// 2.  **Fixed working resolution**: decoding resamples to the session's working
//     size, so every later stage can assume equal dimensions.
// 3.  **Codec at the edge**: decoding and PNG encoding are thin wrappers over the
//     `image` crate, used by callers and debugging tools only.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{Result, VisionError};
use image::{ImageEncoder, RgbImage, imageops::FilterType};

/// An immutable RGB frame at a fixed resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisionError::input_unavailable("frame has no pixels"));
        }
        Ok(Self { image })
    }

    /// Wraps a tightly packed RGB8 buffer, scan order, three bytes per pixel.
    pub fn from_raw_rgb(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if bytes.len() != expected {
            return Err(VisionError::input_unavailable(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                bytes.len()
            )));
        }
        let image = RgbImage::from_raw(width, height, bytes)
            .ok_or_else(|| VisionError::input_unavailable("buffer does not match dimensions"))?;
        Self::from_rgb_image(image)
    }

    /// A frame where every pixel has the same colour. Mostly useful for fixtures.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Result<Self> {
        Self::from_rgb_image(RgbImage::from_pixel(width, height, pixel.into()))
    }

    /// Decodes any format the `image` crate understands and resamples it to the
    /// working resolution.
    pub fn decode(bytes: &[u8], working_width: u32, working_height: u32) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?.to_rgb8();
        if decoded.dimensions() == (working_width, working_height) {
            return Self::from_rgb_image(decoded);
        }
        let resized = image::imageops::resize(&decoded, working_width, working_height, FilterType::Triangle);
        Self::from_rgb_image(resized)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut output);
        encoder.write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            image::ExtendedColorType::Rgb8,
        )?;
        Ok(output)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn total_pixels(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// The pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        self.image.get_pixel_checked(x, y).map(|rgb| Pixel::from(*rgb))
    }

    /// All pixels in scan order (row by row, left to right).
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.image.pixels().map(|rgb| Pixel::from(*rgb))
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}
