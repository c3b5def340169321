// THEORY:
// A `Region` is the output of the spatial grouping layer: one connected set of
// skin-coloured pixels summarised by its bounding box, area and a heuristic
// confidence. Like the frame it was found in, it is a transient, "dumb" data
// container. Regions are recomputed on every invocation and never tracked
// across ticks.

use serde::{Deserialize, Serialize};

/// A simple struct to represent a 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned box in pixel coordinates. `width` and `height` are inclusive
/// pixel counts, so a single pixel is a 1x1 box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn from_corners(min: Point, max: Point) -> Self {
        Self {
            min_x: min.x,
            min_y: min.y,
            width: max.x - min.x + 1,
            height: max.y - min.y + 1,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.min_x as f64 + self.width as f64 / 2.0,
            self.min_y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// A connected skin-coloured component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub bounding_box: BoundingBox,
    /// Number of pixels in the component, not the box area.
    pub area: usize,
    pub center: (f64, f64),
    pub aspect_ratio: f64,
    /// Shape-based plausibility in [0, 1].
    pub confidence: f64,
}

impl Region {
    pub fn new(bounding_box: BoundingBox, area: usize) -> Self {
        let aspect_ratio = bounding_box.aspect_ratio();
        Self {
            bounding_box,
            area,
            center: bounding_box.center(),
            aspect_ratio,
            confidence: shape_confidence(area, aspect_ratio),
        }
    }
}

/// Average of an area term and an aspect term, clamped to [0, 1].
///
/// The area term saturates at 10 000 pixels; the aspect term peaks at a
/// 0.75 width/height ratio, a standing or treading figure.
pub fn shape_confidence(area: usize, aspect_ratio: f64) -> f64 {
    let area_score = (area as f64 / 10_000.0).min(1.0);
    let aspect_score = 1.0 - (aspect_ratio - 0.75).abs() / 0.75;
    ((area_score + aspect_score) / 2.0).clamp(0.0, 1.0)
}
