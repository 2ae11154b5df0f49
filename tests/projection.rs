use fisheye_envmap::projection::texture_coordinates;
use fisheye_envmap::{map_fisheye_to_panorama, map_mirrorball_to_panorama, SourceProjection};
use image::{Rgb, RgbImage};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

fn inside_lens(source: SourceProjection, i: u32, j: u32, pano: (u32, u32), src: (u32, u32)) -> bool {
    let disk = source.disk_coordinates(source.direction(texture_coordinates(i, j, pano.0, pano.1)));
    if !(disk.length_squared() <= 1.0) {
        return false;
    }
    let x = (disk.x + 1.0) * 0.5 * src.0 as f64;
    let y = (disk.y + 1.0) * 0.5 * src.1 as f64;
    x >= 0.0 && x < src.0 as f64 && y >= 0.0 && y < src.1 as f64
}

#[test]
fn uniform_fisheye_maps_to_uniform_panorama() {
    let color = Rgb([100, 150, 200]);
    let fisheye = RgbImage::from_pixel(64, 64, color);
    let panorama = map_fisheye_to_panorama(&fisheye).unwrap();
    assert_eq!(panorama.dimensions(), (64, 64));

    let mut lit = 0;
    for p in panorama.pixels() {
        assert!(*p == color || *p == BLACK, "unexpected pixel {:?}", p);
        if *p == color {
            lit += 1;
        }
    }
    // everything but a thin rim lands inside the lens
    assert!(lit > 64 * 60, "only {} lit pixels", lit);
    assert_eq!(*panorama.get_pixel(32, 32), color);
}

/// Source pixels touched by the bilinear sample of panorama pixel (i, j), or None when the
/// direction misses the lens.
fn sample_footprint(i: u32, j: u32, size: u32) -> Option<[(u32, u32); 4]> {
    if !inside_lens(SourceProjection::Fisheye, i, j, (size, size), (size, size)) {
        return None;
    }
    let source = SourceProjection::Fisheye;
    let disk = source.disk_coordinates(source.direction(texture_coordinates(i, j, size, size)));
    let x0 = (((disk.x + 1.0) * 0.5 * size as f64).floor() as u32).min(size - 1);
    let y0 = (((disk.y + 1.0) * 0.5 * size as f64).floor() as u32).min(size - 1);
    let (x1, y1) = ((x0 + 1).min(size - 1), (y0 + 1).min(size - 1));
    Some([(x0, y0), (x1, y0), (x0, y1), (x1, y1)])
}

#[test]
fn disk_fisheye_round_trips_its_color() {
    let size = 64;
    let color = Rgb([200, 120, 40]);
    let r = size as f64 / 2.0;
    let in_disk = |x: u32, y: u32| {
        let (dx, dy) = (x as f64 + 0.5 - r, y as f64 + 0.5 - r);
        dx * dx + dy * dy <= r * r
    };
    let fisheye = RgbImage::from_fn(size, size, |x, y| if in_disk(x, y) { color } else { BLACK });
    let panorama = map_fisheye_to_panorama(&fisheye).unwrap();

    let mut exact = 0;
    for j in 0..size {
        for i in 0..size {
            let pixel = *panorama.get_pixel(i, j);
            match sample_footprint(i, j, size) {
                None => assert_eq!(pixel, BLACK, "outside lens at ({}, {})", i, j),
                Some(footprint) if footprint.iter().all(|&(x, y)| in_disk(x, y)) => {
                    assert_eq!(pixel, color, "inside disk at ({}, {})", i, j);
                    exact += 1;
                }
                Some(footprint) if footprint.iter().all(|&(x, y)| !in_disk(x, y)) => {
                    assert_eq!(pixel, BLACK, "black corner at ({}, {})", i, j);
                }
                Some(_) => {}
            }
        }
    }
    assert!(exact > size * size / 2, "only {} pixels checked", exact);
}

#[test]
fn pixels_outside_lens_stay_black() {
    let white = Rgb([255, 255, 255]);
    for source in [SourceProjection::Fisheye, SourceProjection::Mirrorball] {
        let photo = RgbImage::from_pixel(40, 30, white);
        let panorama = source.map_to_panorama(&photo).unwrap();
        let (w, h) = panorama.dimensions();
        for j in 0..h {
            for i in 0..w {
                let expected = if inside_lens(source, i, j, (w, h), (40, 30)) {
                    white
                } else {
                    BLACK
                };
                assert_eq!(*panorama.get_pixel(i, j), expected, "{:?} pixel ({}, {})", source, i, j);
            }
        }
    }
}

#[test]
fn mirrorball_panorama_is_twice_as_wide() {
    let mirrorball = RgbImage::from_pixel(50, 40, Rgb([10, 20, 30]));
    let panorama = map_mirrorball_to_panorama(&mirrorball).unwrap();
    assert_eq!(panorama.dimensions(), (100, 40));
    // the ball center reflects +Z, three quarters of the way round
    assert_eq!(*panorama.get_pixel(75, 20), Rgb([10, 20, 30]));
}

#[test]
fn fisheye_center_row_reads_the_photo_center_line() {
    // left half red, right half blue
    let mut fisheye = RgbImage::new(64, 64);
    for (x, _, p) in fisheye.enumerate_pixels_mut() {
        *p = if x < 32 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) };
    }
    let panorama = map_fisheye_to_panorama(&fisheye).unwrap();
    // phi = 0 looks toward -X, the left edge of the photo
    assert_eq!(*panorama.get_pixel(2, 32), Rgb([255, 0, 0]));
    assert_eq!(*panorama.get_pixel(61, 32), Rgb([0, 0, 255]));
}

#[test]
fn empty_source_is_rejected() {
    assert!(map_fisheye_to_panorama(&RgbImage::new(0, 10)).is_err());
    assert!(map_mirrorball_to_panorama(&RgbImage::new(10, 0)).is_err());
}
