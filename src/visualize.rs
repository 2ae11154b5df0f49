// visualize.rs — debug overlay of cut lines and light positions

use image::{Rgb, RgbImage};

use crate::intensity::Axis;
use crate::light_estimator::LightEstimate;

const SPLIT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LIGHT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const LIGHT_RADIUS: i64 = 3;

/// Copy of `panorama` with every cut drawn as a green line and every candidate as a
/// yellow disc.
pub fn draw_estimate(panorama: &RgbImage, estimate: &LightEstimate) -> RgbImage {
    let mut canvas = panorama.clone();

    for split in &estimate.splits {
        let r = split.region;
        let at = split.coordinate();
        match split.axis {
            Axis::X => {
                for y in r.y..r.y + r.height {
                    put(&mut canvas, at as i64, y as i64, SPLIT_COLOR);
                }
            }
            Axis::Y => {
                for x in r.x..r.x + r.width {
                    put(&mut canvas, x as i64, at as i64, SPLIT_COLOR);
                }
            }
        }
    }

    for candidate in &estimate.candidates {
        let (cx, cy) = (candidate.position.x as i64, candidate.position.y as i64);
        for dy in -LIGHT_RADIUS..=LIGHT_RADIUS {
            for dx in -LIGHT_RADIUS..=LIGHT_RADIUS {
                if dx * dx + dy * dy <= LIGHT_RADIUS * LIGHT_RADIUS {
                    put(&mut canvas, cx + dx, cy + dy, LIGHT_COLOR);
                }
            }
        }
    }

    canvas
}

fn put(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    canvas.put_pixel(x as u32, y as u32, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_estimator::LightEstimator;

    #[test]
    fn overlay_leaves_input_untouched() {
        let mut panorama = RgbImage::new(32, 16);
        panorama.put_pixel(20, 8, Rgb([255, 255, 255]));
        let estimate = LightEstimator::new(2).estimate(&panorama).unwrap();
        let overlay = draw_estimate(&panorama, &estimate);

        assert_eq!(panorama.get_pixel(0, 0), &Rgb([0, 0, 0]));
        let split = estimate.splits[0];
        assert_eq!(overlay.get_pixel(split.coordinate(), 0), &SPLIT_COLOR);
        let light = estimate.candidates[0].position;
        assert_eq!(overlay.get_pixel(light.x, light.y), &LIGHT_COLOR);
    }
}
