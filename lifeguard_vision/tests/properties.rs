use lifeguard_vision::config::MotionConfig;
use lifeguard_vision::core_modules::motion_detector::{MotionDetector, percentage_of};
use lifeguard_vision::core_modules::pixel::pixel::Pixel;
use lifeguard_vision::core_modules::region::shape_confidence;
use lifeguard_vision::core_modules::skin_detector::find_components;
use lifeguard_vision::Frame;
use proptest::collection::vec;
use proptest::prelude::*;
use std::time::Duration;

fn frame_pair() -> impl Strategy<Value = (u32, u32, Vec<u8>, Vec<u8>)> {
    (1u32..16, 1u32..16).prop_flat_map(|(w, h)| {
        let len = (w * h * 3) as usize;
        (Just(w), Just(h), vec(any::<u8>(), len), vec(any::<u8>(), len))
    })
}

fn gray_levels(bytes: &[u8]) -> Vec<u8> {
    bytes
        .chunks_exact(3)
        .map(|c| Pixel::new(c[0], c[1], c[2]).gray_level())
        .collect()
}

fn mask() -> impl Strategy<Value = (u32, u32, Vec<bool>)> {
    (1u32..24, 1u32..24).prop_flat_map(|(w, h)| (Just(w), Just(h), vec(any::<bool>(), (w * h) as usize)))
}

fn region_keys(regions: &[lifeguard_vision::core_modules::region::Region]) -> Vec<(u32, u32, u32, u32, usize)> {
    let mut keys: Vec<_> = regions
        .iter()
        .map(|r| {
            let b = r.bounding_box;
            (b.min_x, b.min_y, b.width, b.height, r.area)
        })
        .collect();
    keys.sort_unstable();
    keys
}

proptest! {
    #[test]
    fn motion_percentage_matches_the_pixel_count((w, h, before, after) in frame_pair()) {
        let config = MotionConfig::default();
        let expected = gray_levels(&before)
            .iter()
            .zip(gray_levels(&after))
            .filter(|(a, b)| a.abs_diff(*b) as f64 > config.motion_threshold)
            .count();

        let mut detector = MotionDetector::new(config.clone());
        detector.process(Frame::from_raw_rgb(w, h, before), Duration::ZERO);
        let sample = detector.process(Frame::from_raw_rgb(w, h, after), Duration::from_secs(1));

        prop_assert_eq!(sample.motion_pixel_count, expected);
        prop_assert!((0.0..=100.0).contains(&sample.motion_percentage));
        prop_assert_eq!(sample.motion_percentage, percentage_of(expected, (w * h) as usize));
        prop_assert_eq!(sample.motion_points.len(), expected.min(config.max_motion_points));
        prop_assert_eq!(sample.motion_detected, sample.motion_percentage > config.min_motion_percentage);
    }

    #[test]
    fn flood_fill_does_not_depend_on_scan_direction((w, h, cells) in mask()) {
        let mirrored: Vec<bool> = (0..h)
            .flat_map(|y| (0..w).rev().map(move |x| (x, y)))
            .map(|(x, y)| cells[(y * w + x) as usize])
            .collect();

        let direct = find_components(&cells, w, h, 1);
        let flipped = find_components(&mirrored, w, h, 1);

        // Map the mirrored boxes back into the original coordinates.
        let unflipped: Vec<_> = region_keys(&flipped)
            .into_iter()
            .map(|(min_x, min_y, width, height, area)| (w - (min_x + width), min_y, width, height, area))
            .collect();
        let mut unflipped = unflipped;
        unflipped.sort_unstable();

        prop_assert_eq!(region_keys(&direct), unflipped);
        prop_assert_eq!(
            direct.iter().map(|r| r.area).sum::<usize>(),
            cells.iter().filter(|c| **c).count()
        );
    }

    #[test]
    fn shape_confidence_stays_in_unit_range(area in 0usize..200_000, aspect in 0.001f64..50.0) {
        let confidence = shape_confidence(area, aspect);
        prop_assert!((0.0..=1.0).contains(&confidence));
    }
}
