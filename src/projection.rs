// projection.rs — fisheye / mirror-ball disk -> longitude-latitude panorama
//
// Sphere frame: right-handed, +Y up, -Z is the lens axis. Colatitude theta is measured
// from +Y. Disk coordinates live in [-1, 1]^2; the unit circle is the lens boundary.

use std::f64::consts::PI;

use glam::{DVec2, DVec3};
use image::{Rgb, RgbImage};
use rayon::prelude::*;

use crate::error::EnvMapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceProjection {
    /// Equidistant hemispherical fisheye; the panorama covers half the longitude range.
    Fisheye,
    /// Photograph of a mirrored sphere; the panorama covers the full longitude range.
    Mirrorball,
}

impl SourceProjection {
    /// Panorama size produced for a source of `width` x `height`.
    pub fn panorama_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            SourceProjection::Fisheye => (width, height),
            SourceProjection::Mirrorball => (width * 2, height),
        }
    }

    /// Longitude covered by `u` in [0, 1].
    pub fn longitude_range(self) -> f64 {
        match self {
            SourceProjection::Fisheye => PI,
            SourceProjection::Mirrorball => 2.0 * PI,
        }
    }

    /// Unit direction for a (longitude, colatitude) texture coordinate in [0, 1]^2.
    pub fn direction(self, texture: DVec2) -> DVec3 {
        let phi = texture.x * self.longitude_range();
        let theta = texture.y * PI;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        match self {
            // phi = 0 on -X
            SourceProjection::Fisheye => DVec3::new(
                -sin_theta * cos_phi,
                cos_theta,
                -sin_theta * sin_phi,
            ),
            // phi = 0 on +X
            SourceProjection::Mirrorball => DVec3::new(
                sin_theta * cos_phi,
                cos_theta,
                -sin_theta * sin_phi,
            ),
        }
    }

    /// Disk coordinate of a direction; the result may fall outside the unit circle.
    pub fn disk_coordinates(self, on_sphere: DVec3) -> DVec2 {
        match self {
            SourceProjection::Fisheye => {
                // equidistant: 90 degrees of incidence lands on the rim
                let fisheye_angle = on_sphere.x.hypot(on_sphere.y).atan2(on_sphere.z.abs());
                let radius = fisheye_angle * 2.0 / PI;
                let rotation = on_sphere.y.atan2(on_sphere.x);
                DVec2::new(radius * rotation.cos(), radius * rotation.sin())
            }
            SourceProjection::Mirrorball => {
                let coef = 1.0 / (2.0 * (1.0 + on_sphere.z)).sqrt();
                DVec2::new(on_sphere.x * coef, on_sphere.y * coef)
            }
        }
    }

    /// Remap a source photograph to a longitude-latitude panorama.
    ///
    /// Pixels whose direction falls outside the lens stay black.
    pub fn map_to_panorama(self, source: &RgbImage) -> Result<RgbImage, EnvMapError> {
        let (src_w, src_h) = source.dimensions();
        EnvMapError::check_dimensions(src_w, src_h)?;

        let (width, height) = self.panorama_dimensions(src_w, src_h);
        log::info!(
            "mapping {:?} image {}x{} to {}x{} panorama",
            self,
            src_w,
            src_h,
            width,
            height
        );

        let mut converted = RgbImage::new(width, height);
        let row_len = width as usize * 3;
        converted
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(j, row)| {
                for i in 0..width {
                    let Some(color) = self.sample_source(source, i, j as u32, width, height) else {
                        continue;
                    };
                    let offset = i as usize * 3;
                    row[offset..offset + 3].copy_from_slice(&color.0);
                }
            });

        Ok(converted)
    }

    fn sample_source(
        self,
        source: &RgbImage,
        i: u32,
        j: u32,
        width: u32,
        height: u32,
    ) -> Option<Rgb<u8>> {
        let texture = texture_coordinates(i, j, width, height);
        let disk = self.disk_coordinates(self.direction(texture));
        // NaN (mirror-ball antipode) counts as outside
        if !(disk.length_squared() <= 1.0) {
            return None;
        }

        let (src_w, src_h) = source.dimensions();
        let point = DVec2::new(
            (disk.x + 1.0) * 0.5 * src_w as f64,
            (disk.y + 1.0) * 0.5 * src_h as f64,
        );
        if point.x < 0.0 || point.x >= src_w as f64 || point.y < 0.0 || point.y >= src_h as f64 {
            return None;
        }
        Some(bilinear_sample(source, point))
    }
}

/// Normalised texture coordinate of output pixel (i, j); `v` is flipped.
pub fn texture_coordinates(i: u32, j: u32, width: u32, height: u32) -> DVec2 {
    DVec2::new(
        normalized_index(i, width),
        1.0 - normalized_index(j, height),
    )
}

/// `index / (extent - 1)`, or 0 for an axis with a single pixel.
pub fn normalized_index(index: u32, extent: u32) -> f64 {
    if extent > 1 {
        index as f64 / (extent - 1) as f64
    } else {
        0.0
    }
}

/// Bilinear sample at a pixel-space point inside the image.
///
/// The second sample on each axis clamps to the last row/column.
pub fn bilinear_sample(image: &RgbImage, point: DVec2) -> Rgb<u8> {
    let (w, h) = image.dimensions();
    let x0 = (point.x.floor().max(0.0) as u32).min(w - 1);
    let y0 = (point.y.floor().max(0.0) as u32).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = point.x - x0 as f64;
    let ty = point.y - y0 as f64;

    let weights = [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x1, y0, tx * (1.0 - ty)),
        (x0, y1, (1.0 - tx) * ty),
        (x1, y1, tx * ty),
    ];

    let mut acc = [0.0f64; 3];
    for (x, y, weight) in weights {
        let p = image.get_pixel(x, y);
        for (c, channel) in acc.iter_mut().enumerate() {
            *channel += p[c] as f64 * weight;
        }
    }
    Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
}

/// Remap a fisheye photograph onto a longitude-latitude panorama of the same size.
pub fn map_fisheye_to_panorama(fisheye: &RgbImage) -> Result<RgbImage, EnvMapError> {
    SourceProjection::Fisheye.map_to_panorama(fisheye)
}

/// Remap a mirror-ball photograph onto a panorama twice as wide as the source.
pub fn map_mirrorball_to_panorama(mirrorball: &RgbImage) -> Result<RgbImage, EnvMapError> {
    SourceProjection::Mirrorball.map_to_panorama(mirrorball)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fisheye_zenith_row_hits_disk_center_axis() {
        // theta = pi/2, phi = pi/2 looks straight down the lens axis
        let dir = SourceProjection::Fisheye.direction(DVec2::new(0.5, 0.5));
        assert!((dir - DVec3::new(0.0, 0.0, -1.0)).length() < 1e-12);
        let disk = SourceProjection::Fisheye.disk_coordinates(dir);
        assert!(disk.length() < 1e-12);
    }

    #[test]
    fn fisheye_horizon_lands_on_rim() {
        let dir = SourceProjection::Fisheye.direction(DVec2::new(0.0, 0.5));
        let disk = SourceProjection::Fisheye.disk_coordinates(dir);
        assert!((disk.length() - 1.0).abs() < 1e-12, "rim radius {}", disk.length());
    }

    #[test]
    fn mirrorball_front_maps_to_center() {
        // u = 0.75 on the equator points at +Z, which sits at the ball's center
        let dir = SourceProjection::Mirrorball.direction(DVec2::new(0.75, 0.5));
        assert!((dir - DVec3::new(0.0, 0.0, 1.0)).length() < 1e-12);
        let disk = SourceProjection::Mirrorball.disk_coordinates(dir);
        assert!(disk.length() < 1e-12);
    }

    #[test]
    fn single_pixel_axes_do_not_divide_by_zero() {
        let t = texture_coordinates(0, 0, 1, 1);
        assert_eq!(t, DVec2::new(0.0, 1.0));
    }

    #[test]
    fn bilinear_midpoint_averages_and_clamps_edges() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 100, 200]));
        img.put_pixel(1, 0, Rgb([100, 200, 0]));
        assert_eq!(bilinear_sample(&img, DVec2::new(0.5, 0.0)), Rgb([50, 150, 100]));
        // last column samples itself twice
        assert_eq!(bilinear_sample(&img, DVec2::new(1.5, 0.5)), Rgb([100, 200, 0]));
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = map_fisheye_to_panorama(&RgbImage::new(0, 4)).unwrap_err();
        assert_eq!(err, EnvMapError::InvalidImage { width: 0, height: 4 });
    }
}
