// THEORY:
// The `smart_pixel` module is the grayscale/diff engine. It follows the
// "separation of concerns" principle: `Pixel` and `Frame` stay dumb containers,
// and every comparison between two samples lives here.
//
// - `GrayPlane`: a frame reduced to one 8-bit luminance value per pixel.
// - `delta_luminance`: absolute difference of two gray levels.
// - `absolute_difference`: the per-pixel delta plane between two frames.
//
// The module is stateless. The motion detector decides what a delta means.

pub mod smart_pixel {
    use crate::core_modules::frame::Frame;
    use crate::core_modules::pixel::pixel::GrayLevel;
    use crate::error::{Result, VisionError};

    pub type LuminanceDelta = u8;

    /// Gray levels of a frame, scan order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct GrayPlane {
        pub width: u32,
        pub height: u32,
        pub samples: Vec<GrayLevel>,
    }

    impl GrayPlane {
        pub fn from_frame(frame: &Frame) -> Self {
            Self {
                width: frame.width(),
                height: frame.height(),
                samples: frame.pixels().map(|p| p.gray_level()).collect(),
            }
        }

        pub fn len(&self) -> usize {
            self.samples.len()
        }

        pub fn is_empty(&self) -> bool {
            self.samples.is_empty()
        }
    }

    #[inline]
    pub fn delta_luminance(a: GrayLevel, b: GrayLevel) -> LuminanceDelta {
        a.abs_diff(b)
    }

    /// Per-pixel absolute luminance difference of two equally sized frames.
    pub fn absolute_difference(previous: &Frame, current: &Frame) -> Result<GrayPlane> {
        if previous.dimensions() != current.dimensions() {
            return Err(VisionError::FrameGeometry {
                expected: previous.dimensions(),
                actual: current.dimensions(),
            });
        }
        let before = GrayPlane::from_frame(previous);
        let after = GrayPlane::from_frame(current);
        let samples = before
            .samples
            .iter()
            .zip(after.samples.iter())
            .map(|(a, b)| delta_luminance(*a, *b))
            .collect();
        Ok(GrayPlane {
            width: current.width(),
            height: current.height(),
            samples,
        })
    }
}
