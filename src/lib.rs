// lib.rs — fisheye photograph -> environment map + estimated lights

pub mod error;
pub mod illumination;
pub mod intensity;
pub mod light_estimator;
pub mod projection;
pub mod scene_lights;
pub mod visualize;

pub use error::EnvMapError;
pub use illumination::{extract_lights, EstimatedLight, Illumination, IlluminationExtractor};
pub use intensity::{Axis, IntensityField, Region};
pub use light_estimator::{
    estimate_light_positions, CandidateOrder, CutStrategy, LightCandidate, LightEstimate,
    LightEstimator, PixelPosition, Split,
};
pub use projection::{map_fisheye_to_panorama, map_mirrorball_to_panorama, SourceProjection};
pub use scene_lights::{LightSet, SceneLight};
