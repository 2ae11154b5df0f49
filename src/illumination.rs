// illumination.rs — fisheye photograph -> panorama + (direction, color) light list

use glam::{DVec2, Vec3};
use image::RgbImage;

use crate::error::EnvMapError;
use crate::light_estimator::{
    CandidateOrder, CutStrategy, LightEstimate, LightEstimator, PixelPosition,
};
use crate::projection::{normalized_index, SourceProjection};

/// Light count the viewer asks for unless configured otherwise.
pub const DEFAULT_LIGHT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedLight {
    /// Panorama pixel the light was found at.
    pub position: PixelPosition,
    /// Unit vector from the scene origin toward the light.
    pub direction: Vec3,
    /// Linear RGB in [0, 1].
    pub color: [f32; 3],
}

#[derive(Debug, Clone)]
pub struct Illumination {
    pub source: SourceProjection,
    pub panorama: RgbImage,
    pub lights: Vec<EstimatedLight>,
    pub estimate: LightEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IlluminationExtractor {
    pub source: SourceProjection,
    pub estimator: LightEstimator,
}

impl Default for IlluminationExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_LIGHT_COUNT)
    }
}

impl IlluminationExtractor {
    pub fn new(light_count: usize) -> Self {
        Self {
            source: SourceProjection::Fisheye,
            estimator: LightEstimator::new(light_count),
        }
    }

    pub fn with_source(mut self, source: SourceProjection) -> Self {
        self.source = source;
        self
    }

    pub fn with_strategy(mut self, strategy: CutStrategy) -> Self {
        self.estimator = self.estimator.with_strategy(strategy);
        self
    }

    pub fn with_order(mut self, order: CandidateOrder) -> Self {
        self.estimator = self.estimator.with_order(order);
        self
    }

    pub fn extract(&self, photo: &RgbImage) -> Result<Illumination, EnvMapError> {
        let panorama = self.source.map_to_panorama(photo)?;
        let estimate = self.estimator.estimate(&panorama)?;

        // Fisheye panoramas share the photo's size, so colors come from the photo itself.
        let color_source = match self.source {
            SourceProjection::Fisheye => photo,
            SourceProjection::Mirrorball => &panorama,
        };
        let (width, height) = color_source.dimensions();

        let lights: Vec<EstimatedLight> = estimate
            .positions
            .iter()
            .map(|&position| {
                let pixel = color_source
                    .get_pixel(position.x.min(width - 1), position.y.min(height - 1));
                EstimatedLight {
                    position,
                    direction: light_direction(self.source, position, panorama.dimensions()),
                    color: pixel.0.map(|c| c as f32 / 255.0),
                }
            })
            .collect();

        for (i, light) in lights.iter().enumerate() {
            log::debug!(
                "light {}: direction {:?} color {:?}",
                i,
                light.direction,
                light.color
            );
        }
        log::info!("extracted {} lights", lights.len());

        Ok(Illumination {
            source: self.source,
            panorama,
            lights,
            estimate,
        })
    }
}

/// Direction toward a panorama pixel, with `x / (W - 1)` as longitude and `y / (H - 1)`
/// as colatitude.
pub fn light_direction(
    source: SourceProjection,
    position: PixelPosition,
    (width, height): (u32, u32),
) -> Vec3 {
    let texture = DVec2::new(
        normalized_index(position.x, width),
        normalized_index(position.y, height),
    );
    source.direction(texture).normalize().as_vec3()
}

/// Remap a fisheye photograph and estimate `light_count` lights with median-cut.
pub fn extract_lights(fisheye: &RgbImage, light_count: usize) -> Result<Illumination, EnvMapError> {
    IlluminationExtractor::new(light_count).extract(fisheye)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_are_unit_length() {
        for (x, y) in [(0, 0), (31, 8), (63, 31), (10, 20)] {
            let dir = light_direction(SourceProjection::Fisheye, PixelPosition::new(x, y), (64, 32));
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn top_row_points_up() {
        let dir = light_direction(SourceProjection::Fisheye, PixelPosition::new(5, 0), (64, 32));
        assert!((dir - Vec3::Y).length() < 1e-6);
    }
}
