// scene_lights.rs — lights registered with the scene, one active at a time by default

use glam::Vec3;

use crate::illumination::EstimatedLight;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLight {
    pub direction: Vec3,
    pub color: [f32; 3],
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightSet {
    lights: Vec<SceneLight>,
    enabled: bool,
    active_index: usize,
    pub global_ambient: [f32; 3],
}

impl Default for LightSet {
    fn default() -> Self {
        Self {
            lights: Vec::new(),
            enabled: true,
            active_index: 0,
            global_ambient: [0.2, 0.2, 0.2],
        }
    }
}

impl LightSet {
    /// Register every estimate; only the first one starts active.
    pub fn from_estimates(estimates: &[EstimatedLight]) -> Self {
        let mut set = Self::default();
        for estimate in estimates {
            set.add(estimate.direction, estimate.color);
        }
        set.select(0);
        set
    }

    /// Append an inactive light.
    pub fn add(&mut self, direction: Vec3, color: [f32; 3]) {
        self.lights.push(SceneLight {
            direction: direction.normalize_or_zero(),
            color,
            active: false,
        });
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn lights(&self) -> &[SceneLight] {
        &self.lights
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// The light the scene is lit by, if lighting is on.
    pub fn active(&self) -> Option<&SceneLight> {
        if !self.enabled {
            return None;
        }
        self.lights.get(self.active_index).filter(|l| l.active)
    }

    /// Activate exactly `index`; out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) {
        if index >= self.lights.len() {
            return;
        }
        for (i, light) in self.lights.iter_mut().enumerate() {
            light.active = i == index;
        }
        self.active_index = index;
    }

    /// Move activation to the next light, wrapping around.
    pub fn cycle_active(&mut self) {
        if self.lights.is_empty() {
            return;
        }
        self.select((self.active_index + 1) % self.lights.len());
    }

    /// Flip the master switch and restart from the first light.
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
        self.select(0);
        log::info!("lights turned {}", if self.enabled { "on" } else { "off" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_estimator::PixelPosition;

    fn estimates(n: usize) -> Vec<EstimatedLight> {
        (0..n)
            .map(|i| EstimatedLight {
                position: PixelPosition::new(i as u32, 0),
                direction: Vec3::new(i as f32 + 1.0, 0.0, 0.0),
                color: [1.0, 0.5, 0.25],
            })
            .collect()
    }

    #[test]
    fn only_first_light_starts_active() {
        let set = LightSet::from_estimates(&estimates(3));
        let active: Vec<bool> = set.lights().iter().map(|l| l.active).collect();
        assert_eq!(active, vec![true, false, false]);
        assert_eq!(set.active().map(|l| l.direction), Some(Vec3::X));
    }

    #[test]
    fn cycling_wraps_and_keeps_one_active() {
        let mut set = LightSet::from_estimates(&estimates(3));
        set.cycle_active();
        set.cycle_active();
        assert_eq!(set.active_index(), 2);
        set.cycle_active();
        assert_eq!(set.active_index(), 0);
        assert_eq!(set.lights().iter().filter(|l| l.active).count(), 1);
    }

    #[test]
    fn toggle_disables_and_resets_to_first() {
        let mut set = LightSet::from_estimates(&estimates(2));
        set.cycle_active();
        set.toggle();
        assert!(set.active().is_none());
        set.toggle();
        assert_eq!(set.active_index(), 0);
        assert!(set.active().is_some());
    }

    #[test]
    fn empty_set_ignores_navigation() {
        let mut set = LightSet::from_estimates(&[]);
        set.cycle_active();
        set.select(4);
        assert!(set.active().is_none());
    }
}
