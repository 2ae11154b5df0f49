use fisheye_envmap::{
    estimate_light_positions, Axis, CutStrategy, IntensityField, LightEstimator, PixelPosition,
};
use fisheye_envmap::intensity::row_weight;
use image::{Rgb, RgbImage};

/// Smooth, non-symmetric test pattern.
fn textured(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = ((x * 7 + y * 13) % 97) as u8 + (x as u8 / 2);
        Rgb([v, v / 2 + 20, 255 - v])
    })
}

#[test]
fn single_spike_is_found_exactly() {
    let mut panorama = RgbImage::new(64, 32);
    panorama.put_pixel(32, 8, Rgb([255, 255, 255]));
    let positions = estimate_light_positions(&panorama, 1, true).unwrap();
    assert_eq!(positions, vec![PixelPosition::new(32, 8)]);
}

#[test]
fn light_count_rounds_up_to_power_of_two() {
    let panorama = RgbImage::from_pixel(64, 32, Rgb([128, 128, 128]));
    let estimate = LightEstimator::new(5).estimate(&panorama).unwrap();
    assert_eq!(estimate.iterations, 3);
    assert_eq!(estimate.candidates.len(), 8);
    assert_eq!(estimate.positions.len(), 5);
    assert_eq!(estimate.splits.len(), 7);
}

#[test]
fn candidate_count_stays_within_budget() {
    let panorama = textured(64, 32);
    for strategy in [CutStrategy::MedianCut, CutStrategy::VarianceCut] {
        for n in 1..=64 {
            let estimate = LightEstimator::new(n)
                .with_strategy(strategy)
                .estimate(&panorama)
                .unwrap();
            let (regions, _) = LightEstimator::cut_budget(n);
            assert!(!estimate.positions.is_empty());
            assert!(estimate.candidates.len() <= regions, "{:?} n={}", strategy, n);
            assert!(estimate.positions.len() <= n);
            for c in &estimate.candidates {
                assert!(c.position.x < 64 && c.position.y < 32);
                assert!(c.intensity >= 0.0);
            }
        }
    }
}

#[test]
fn median_cut_halves_the_energy() {
    let panorama = textured(64, 32);
    let field = IntensityField::from_panorama(&panorama).unwrap();
    let estimate = LightEstimator::new(2).estimate_field(&field);

    let split = estimate.splits[0];
    assert_eq!(split.axis, Axis::X);
    let lanes = field.lane_sums(&split.region, split.axis);
    let half = lanes.iter().sum::<f64>() * 0.5;
    let offset = split.offset as usize;
    let before: f64 = lanes[..offset].iter().sum();
    let through = before + lanes[offset];
    assert!(before < half, "before {} half {}", before, half);
    assert!(through >= half, "through {} half {}", through, half);
}

#[test]
fn estimation_is_deterministic() {
    let panorama = textured(96, 48);
    for strategy in [CutStrategy::MedianCut, CutStrategy::VarianceCut] {
        let estimator = LightEstimator::new(6).with_strategy(strategy);
        let a = estimator.estimate(&panorama).unwrap();
        let b = estimator.estimate(&panorama).unwrap();
        assert_eq!(a.positions, b.positions);
        assert_eq!(a.splits, b.splits);
    }
}

#[test]
fn variance_cut_finds_separated_lights() {
    let mut panorama = RgbImage::new(64, 32);
    for &(x, y) in &[(8, 10), (40, 20)] {
        panorama.put_pixel(x, y, Rgb([255, 255, 255]));
    }
    let mut positions = estimate_light_positions(&panorama, 2, false).unwrap();
    positions.sort_by_key(|p| p.x);
    assert_eq!(positions, vec![PixelPosition::new(8, 10), PixelPosition::new(40, 20)]);
}

#[test]
fn black_panorama_still_yields_positions() {
    let panorama = RgbImage::new(32, 16);
    let positions = estimate_light_positions(&panorama, 1, true).unwrap();
    assert_eq!(positions, vec![PixelPosition::new(0, 0)]);
}

#[test]
fn red_outweighs_green_and_blue_by_rec601_luma() {
    // Rec.601: red 76 against blue 29 + green 35 in the other column.
    // Rec.709 weights would move the half-energy column to x = 50.
    let mut panorama = RgbImage::new(64, 32);
    panorama.put_pixel(10, 16, Rgb([255, 0, 0]));
    panorama.put_pixel(50, 16, Rgb([0, 0, 255]));
    panorama.put_pixel(50, 17, Rgb([0, 60, 0]));

    let field = IntensityField::from_panorama(&panorama).unwrap();
    assert!((field.at(10, 16) - 76.0 * row_weight(16, 32)).abs() < 1e-4);
    assert!((field.at(50, 17) - 35.0 * row_weight(17, 32)).abs() < 1e-4);
    assert!(field.at(10, 16) > field.at(50, 16) + field.at(50, 17));

    let positions = estimate_light_positions(&panorama, 1, true).unwrap();
    assert_eq!(positions, vec![PixelPosition::new(10, 16)]);
}
