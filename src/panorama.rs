// panorama.rs — viewer camera and display state

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    Rectilinear,     // standard perspective, straight lines stay straight
    Equidistant,     // fisheye look, angle proportional to radius
    Stereographic,   // little-planet style
    Equirectangular, // the unwrapped panorama itself
}

impl ProjectionMode {
    pub const ALL: [ProjectionMode; 4] = [
        ProjectionMode::Rectilinear,
        ProjectionMode::Equidistant,
        ProjectionMode::Stereographic,
        ProjectionMode::Equirectangular,
    ];

    /// Shader mode index.
    pub fn index(self) -> u32 {
        match self {
            ProjectionMode::Rectilinear => 0,
            ProjectionMode::Equidistant => 1,
            ProjectionMode::Stereographic => 2,
            ProjectionMode::Equirectangular => 3,
        }
    }

    pub fn i18n_key(self) -> &'static str {
        match self {
            ProjectionMode::Rectilinear => "projection.rectilinear",
            ProjectionMode::Equidistant => "projection.equidistant",
            ProjectionMode::Stereographic => "projection.stereographic",
            ProjectionMode::Equirectangular => "projection.equirectangular",
        }
    }

    /// Usable field of view range in degrees.
    pub fn fov_range(self) -> (f32, f32) {
        match self {
            ProjectionMode::Rectilinear => (5.0, 179.9),
            ProjectionMode::Stereographic => (10.0, 270.0),
            _ => (5.0, 180.0),
        }
    }
}

pub struct EnvironmentViewer {
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub default_fov: f32,
    pub sensitivity_scale: f32,
    pub projection_mode: ProjectionMode,
    pub is_fullscreen: bool,
    /// Draw the lit probe sphere in front of the camera.
    pub show_probe: bool,
}

impl EnvironmentViewer {
    pub fn new(fov: f32, sensitivity_scale: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            fov,
            default_fov: fov,
            sensitivity_scale,
            projection_mode: ProjectionMode::Rectilinear,
            is_fullscreen: false,
            show_probe: true,
        }
    }

    pub fn reset(&mut self) {
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.fov = self.default_fov;
    }

    /// Apply a scroll step, clamped to the current mode's range.
    pub fn zoom(&mut self, scroll: f32) {
        let (min_fov, max_fov) = self.projection_mode.fov_range();
        self.fov = (self.fov - scroll * 2.5).clamp(min_fov, max_fov);
    }

    /// Rotate by a cursor drag of (dx, dy) pixels in a viewport of (width, height).
    pub fn drag(&mut self, dx: f32, dy: f32, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let v_f = self.fov.to_radians().min(std::f32::consts::PI * 0.999);
        let aspect = width / height;
        let h_f = 2.0 * ((v_f / 2.0).tan() * aspect).atan();

        let yaw_per_px_deg = (h_f / width).to_degrees();
        let pitch_per_px_deg = (v_f / height).to_degrees();

        self.yaw -= dx * yaw_per_px_deg * self.sensitivity_scale;
        self.pitch = (self.pitch - dy * pitch_per_px_deg * self.sensitivity_scale).clamp(-90.0, 90.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_respects_mode_limits() {
        let mut viewer = EnvironmentViewer::new(75.0, 1.0);
        viewer.zoom(-1000.0);
        assert_eq!(viewer.fov, 179.9);
        viewer.projection_mode = ProjectionMode::Stereographic;
        viewer.zoom(1000.0);
        assert_eq!(viewer.fov, 10.0);
        viewer.reset();
        assert_eq!(viewer.fov, 75.0);
    }

    #[test]
    fn drag_clamps_pitch() {
        let mut viewer = EnvironmentViewer::new(75.0, 1.0);
        viewer.drag(0.0, -100_000.0, 800.0, 600.0);
        assert_eq!(viewer.pitch, 90.0);
    }
}
