// error.rs — errors surfaced by the environment-mapping core

/// Errors from remapping images and estimating lights.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvMapError {
    /// The source image has no pixels to work with.
    #[error("invalid image: {width}x{height} has no pixels")]
    InvalidImage { width: u32, height: u32 },
}

impl EnvMapError {
    pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), EnvMapError> {
        if width == 0 || height == 0 {
            return Err(EnvMapError::InvalidImage { width, height });
        }
        Ok(())
    }
}
