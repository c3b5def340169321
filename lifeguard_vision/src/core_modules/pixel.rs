// THEORY (single-pixel heuristics):
// The `Pixel` module is the most fundamental unit of the vision system. It is a
// "dumb" data container for one RGB sample plus the handful of heuristics that can
// be computed from that sample alone, with no knowledge of neighbours in space or
// time. Anything that needs a second pixel (differences, motion) lives in
// `smart_pixel`; anything that needs a neighbourhood (connected regions) lives in
// `skin_detector`.
//
// Heuristic families:
// - Brightness: luminance (Rec. 601 luma) and its rounded 8-bit gray level.
// - Colour:     HSV hue (degrees, [0, 360)), HSV saturation (chroma / value),
//               HSV value (max channel), all on normalized sRGB channels.
//
// The skin classifier consumes the HSV triple, the motion detector consumes the
// gray level. Both are pure functions of the three channel bytes.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type NormalizedChannel = f32;
    pub type Luminance = f64;
    pub type GrayLevel = Byte;
    pub type Hue = f32;
    pub type SaturationHSV = f32;
    pub type ValueHSV = f32;
    pub type Chroma = f32;

    pub const CHANNELS: usize = 3;

    /// A "dumb" data container representing a single RGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    /// Hue, saturation and value of a pixel, as used by the skin classifier.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Hsv {
        /// Angle on the colour wheel in degrees, [0, 360).
        pub hue: Hue,
        /// Chroma relative to value, [0, 1].
        pub saturation: SaturationHSV,
        /// Brightest channel, [0, 1].
        pub value: ValueHSV,
    }

    impl Pixel {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        #[inline]
        fn normalized(&self) -> (NormalizedChannel, NormalizedChannel, NormalizedChannel) {
            (
                self.red as NormalizedChannel / 255.0,
                self.green as NormalizedChannel / 255.0,
                self.blue as NormalizedChannel / 255.0,
            )
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        ///
        /// - Interprets perceived brightness as a weighted sum of RGB.
        /// - This is the quantity frame differencing operates on.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }

        /// Luminance rounded to the nearest 8-bit intensity.
        pub fn gray_level(&self) -> GrayLevel {
            self.luminance().round().clamp(0.0, 255.0) as GrayLevel
        }

        /// HSV Value (V): brightness defined as max(R, G, B), normalized.
        pub fn value_hsv(&self) -> ValueHSV {
            let (r, g, b) = self.normalized();
            r.max(g.max(b))
        }

        /// Chroma: max(R, G, B) − min(R, G, B), normalized. Zero for grays.
        pub fn chroma(&self) -> Chroma {
            let (r, g, b) = self.normalized();
            r.max(g.max(b)) - r.min(g.min(b))
        }

        /// Saturation (HSV): S = chroma / value. Drops to zero at black.
        pub fn saturation_hsv(&self) -> SaturationHSV {
            let maximum_channel = self.value_hsv();
            if maximum_channel <= 1e-6 {
                return 0.0;
            }
            self.chroma() / maximum_channel
        }

        /// Hue angle in degrees [0, 360).
        ///
        /// - Uses normalized sRGB channels, no linearization.
        /// - Grays (zero chroma) report a hue of 0.
        pub fn hue(&self) -> Hue {
            let (r, g, b) = self.normalized();
            let maximum_channel = r.max(g.max(b));
            let chroma = self.chroma();

            if chroma <= 1e-6 {
                return 0.0;
            }

            let inverse_chroma = 1.0 / chroma;

            let (base_difference, sector_offset) = if maximum_channel == r {
                (g - b, 0.0)
            } else if maximum_channel == g {
                (b - r, 2.0)
            } else {
                (r - g, 4.0)
            };

            let mut hue_degrees = (base_difference * inverse_chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            hue_degrees
        }

        pub fn hsv(&self) -> Hsv {
            Hsv {
                hue: self.hue(),
                saturation: self.saturation_hsv(),
                value: self.value_hsv(),
            }
        }
    }

    impl From<[Byte; CHANNELS]> for Pixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2])
        }
    }

    impl From<image::Rgb<Byte>> for Pixel {
        fn from(rgb: image::Rgb<Byte>) -> Self {
            Pixel::from(rgb.0)
        }
    }

    impl From<Pixel> for image::Rgb<Byte> {
        fn from(pixel: Pixel) -> Self {
            image::Rgb([pixel.red, pixel.green, pixel.blue])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn luminance_uses_rec601_weights() {
        assert_eq!(Pixel::new(255, 255, 255).gray_level(), 255);
        assert_eq!(Pixel::new(0, 0, 0).gray_level(), 0);
        assert!((Pixel::new(100, 0, 0).luminance() - 29.9).abs() < 1e-9);
        assert_eq!(Pixel::new(0, 100, 0).gray_level(), 59);
    }

    #[test]
    fn primary_hues_land_on_their_sectors() {
        assert!((Pixel::new(255, 0, 0).hue() - 0.0).abs() < 1e-3);
        assert!((Pixel::new(0, 255, 0).hue() - 120.0).abs() < 1e-3);
        assert!((Pixel::new(0, 0, 255).hue() - 240.0).abs() < 1e-3);
        assert!((Pixel::new(255, 0, 255).hue() - 300.0).abs() < 1e-3);
    }

    #[test]
    fn skin_tone_hsv() {
        let hsv = Pixel::new(220, 160, 120).hsv();
        assert!((hsv.hue - 24.0).abs() < 1e-3);
        assert!((hsv.saturation - 100.0 / 220.0).abs() < 1e-4);
        assert!((hsv.value - 220.0 / 255.0).abs() < 1e-4);
    }

    #[test]
    fn grays_have_no_saturation() {
        let hsv = Pixel::new(128, 128, 128).hsv();
        assert_eq!(hsv.hue, 0.0);
        assert_eq!(hsv.saturation, 0.0);
        assert_eq!(Pixel::new(0, 0, 0).saturation_hsv(), 0.0);
    }
}
