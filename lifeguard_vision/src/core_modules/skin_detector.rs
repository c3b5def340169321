// THEORY:
// The `SkinRegionDetector` is the engine of the spatial grouping layer. It finds
// skin-coloured, roughly person-shaped blobs in a single frame and reports them
// as `Region`s. The count of surviving regions is the human-presence hint the
// behaviour classifier may use.
//
// Algorithm steps:
// 1.  **Skin mask**: every pixel is converted to HSV and marked when its hue,
//     saturation and value fall inside the configured bounds.
// 2.  **Connected components**: marked pixels are grouped with a breadth-first
//     flood fill over the four direct neighbours (no diagonals). The visiting
//     order only changes the order regions are discovered in, never which
//     regions exist.
// 3.  **Noise floor**: components below a minimum pixel count are dropped.
// 4.  **Data aggregation**: bounding box, area, center, aspect ratio and a shape
//     confidence are computed per component.
// 5.  **Human-like filter**: only components inside the area and aspect bounds
//     whose center lies in the inner part of the frame survive. Blobs centred near
//     an edge are assumed to be partial or occluded.
//
// Known limitation: the default hue band (0°-50°) also matches sunlit water and
// wood-toned backgrounds. The bounds are kept as they are.
//
// The detector is stateless; it has no memory of previous frames.

use crate::config::SkinConfig;
use crate::core_modules::frame::Frame;
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::region::{BoundingBox, Point, Region};
use std::collections::VecDeque;
use tracing::trace;

/// Finds human-like skin regions in a frame.
#[derive(Debug, Clone)]
pub struct SkinRegionDetector {
    config: SkinConfig,
}

impl SkinRegionDetector {
    pub fn new(config: SkinConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SkinConfig {
        &self.config
    }

    pub fn is_skin(&self, pixel: Pixel) -> bool {
        let hsv = pixel.hsv();
        let c = &self.config;
        (c.hue_min..=c.hue_max).contains(&hsv.hue)
            && (c.saturation_min..=c.saturation_max).contains(&hsv.saturation)
            && (c.value_min..=c.value_max).contains(&hsv.value)
    }

    /// Skin mask of the frame, scan order.
    pub fn skin_mask(&self, frame: &Frame) -> Vec<bool> {
        frame.pixels().map(|p| self.is_skin(p)).collect()
    }

    /// Every connected skin component at or above the noise floor, unfiltered.
    pub fn find_regions(&self, frame: &Frame) -> Vec<Region> {
        let mask = self.skin_mask(frame);
        find_components(&mask, frame.width(), frame.height(), self.config.min_component_pixels)
    }

    /// The human-like subset of `find_regions`.
    pub fn detect_humans(&self, frame: &Frame) -> Vec<Region> {
        let regions = self.find_regions(frame);
        let total = regions.len();
        let humans: Vec<Region> = regions
            .into_iter()
            .filter(|region| self.is_human_like(region, frame.width(), frame.height()))
            .collect();
        trace!(components = total, humans = humans.len(), "skin regions filtered");
        humans
    }

    pub fn count_humans(&self, frame: &Frame) -> usize {
        self.detect_humans(frame).len()
    }

    fn is_human_like(&self, region: &Region, frame_width: u32, frame_height: u32) -> bool {
        let c = &self.config;
        let (cx, cy) = region.center;
        let margin_x = frame_width as f64 * c.edge_margin;
        let margin_y = frame_height as f64 * c.edge_margin;

        (c.min_region_area..=c.max_region_area).contains(&region.area)
            && (c.min_aspect_ratio..=c.max_aspect_ratio).contains(&region.aspect_ratio)
            && cx >= margin_x
            && cx <= frame_width as f64 - margin_x
            && cy >= margin_y
            && cy <= frame_height as f64 - margin_y
    }
}

/// Groups marked cells of a `width` x `height` mask into 4-connected regions,
/// keeping those with at least `min_pixels` cells. Regions are returned in
/// discovery order (scan order of their first pixel).
pub fn find_components(mask: &[bool], width: u32, height: u32, min_pixels: usize) -> Vec<Region> {
    let w = width as usize;
    let h = height as usize;
    debug_assert_eq!(mask.len(), w * h);

    let mut visited = vec![false; mask.len()];
    let mut regions = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    for seed in 0..mask.len() {
        if !mask[seed] || visited[seed] {
            continue;
        }

        visited[seed] = true;
        queue.push_back(seed);

        let mut min = Point { x: u32::MAX, y: u32::MAX };
        let mut max = Point { x: 0, y: 0 };
        let mut area = 0usize;

        while let Some(current) = queue.pop_front() {
            let x = current % w;
            let y = current / w;
            area += 1;
            min.x = min.x.min(x as u32);
            min.y = min.y.min(y as u32);
            max.x = max.x.max(x as u32);
            max.y = max.y.max(y as u32);

            // Check all 4 direct neighbors (not diagonals).
            let neighbors = [
                (x > 0).then(|| current - 1),
                (x + 1 < w).then(|| current + 1),
                (y > 0).then(|| current - w),
                (y + 1 < h).then(|| current + w),
            ];
            for next in neighbors.into_iter().flatten() {
                if mask[next] && !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        if area >= min_pixels {
            regions.push(Region::new(BoundingBox::from_corners(min, max), area));
        }
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const SKIN: Pixel = Pixel::new(220, 160, 120);
    const WATER: Pixel = Pixel::new(30, 60, 150);

    fn paint(image: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, pixel: Pixel) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                image.put_pixel(x, y, pixel.into());
            }
        }
    }

    fn pool() -> RgbImage {
        RgbImage::from_pixel(640, 480, WATER.into())
    }

    fn detector() -> SkinRegionDetector {
        SkinRegionDetector::new(SkinConfig::default())
    }

    #[test]
    fn skin_bounds_follow_hsv() {
        let d = detector();
        assert!(d.is_skin(SKIN));
        assert!(!d.is_skin(WATER));
        // Too dark: value below 0.2.
        assert!(!d.is_skin(Pixel::new(40, 30, 20)));
        // Gray: saturation below 0.1.
        assert!(!d.is_skin(Pixel::new(200, 200, 200)));
    }

    #[test]
    fn two_bodies_found_and_speck_dropped() {
        let mut image = pool();
        paint(&mut image, 100, 140, 200, 200, SKIN); // 40 000 px
        paint(&mut image, 450, 200, 40, 50, SKIN); // 2 000 px
        paint(&mut image, 550, 400, 2, 5, SKIN); // 10 px
        let frame = Frame::from_rgb_image(image).unwrap();

        let all = detector().find_regions(&frame);
        assert_eq!(all.len(), 2, "the 10 px speck is below the noise floor");

        let humans = detector().detect_humans(&frame);
        let mut areas: Vec<usize> = humans.iter().map(|r| r.area).collect();
        areas.sort_unstable();
        assert_eq!(areas, vec![2000, 40000]);
    }

    #[test]
    fn region_geometry_and_confidence() {
        let mut image = pool();
        paint(&mut image, 450, 200, 40, 50, SKIN);
        let frame = Frame::from_rgb_image(image).unwrap();

        let regions = detector().detect_humans(&frame);
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(
            region.bounding_box,
            BoundingBox { min_x: 450, min_y: 200, width: 40, height: 50 }
        );
        assert_eq!(region.center, (470.0, 225.0));
        assert!((region.aspect_ratio - 0.8).abs() < 1e-12);
        // area term 0.2, aspect term 1 - 0.05/0.75
        let expected = (0.2 + (1.0 - 0.05 / 0.75)) / 2.0;
        assert!((region.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn diagonal_contact_does_not_join_regions() {
        let mask = vec![
            true, false, false, //
            false, true, false, //
            false, false, true,
        ];
        let regions = find_components(&mask, 3, 3, 1);
        assert_eq!(regions.len(), 3);
        assert!(regions.iter().all(|r| r.area == 1));
    }

    #[test]
    fn u_shape_is_one_component() {
        let mask = vec![
            true, false, true, //
            true, false, true, //
            true, true, true,
        ];
        let regions = find_components(&mask, 3, 3, 1);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 7);
        assert_eq!(regions[0].bounding_box.width, 3);
    }

    #[test]
    fn edge_blobs_and_wrong_shapes_are_excluded() {
        let mut image = pool();
        paint(&mut image, 0, 200, 40, 50, SKIN); // center x = 20 < 64
        paint(&mut image, 200, 100, 300, 10, SKIN); // aspect 30
        paint(&mut image, 300, 300, 20, 20, SKIN); // area 400 < 1000
        let frame = Frame::from_rgb_image(image).unwrap();

        assert_eq!(detector().find_regions(&frame).len(), 3);
        assert!(detector().detect_humans(&frame).is_empty());
        assert_eq!(detector().count_humans(&frame), 0);
    }

    #[test]
    fn oversized_blob_is_excluded() {
        let mut image = pool();
        paint(&mut image, 120, 90, 300, 300, SKIN); // 90 000 px
        let frame = Frame::from_rgb_image(image).unwrap();
        assert_eq!(detector().find_regions(&frame).len(), 1);
        assert!(detector().detect_humans(&frame).is_empty());
    }

    #[test]
    fn warm_background_is_a_known_false_positive() {
        // Sunlit wood decking reads as skin under the default bounds.
        let mut image = pool();
        paint(&mut image, 200, 150, 60, 80, Pixel::new(190, 140, 90));
        let frame = Frame::from_rgb_image(image).unwrap();
        assert_eq!(detector().count_humans(&frame), 1);
    }
}
