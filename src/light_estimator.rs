// light_estimator.rs — median-cut / variance-cut light position search
//
// Median-cut: http://gl.ict.usc.edu/Research/MedianCut/
// Variance-cut: http://gl.ict.usc.edu/Research/VarianceMin/

use std::cmp::Ordering;

use image::RgbImage;

use crate::error::EnvMapError;
use crate::intensity::{half_energy_offset, Axis, IntensityField, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CutStrategy {
    /// Split at the half-energy line.
    #[default]
    MedianCut,
    /// Split where the larger spread of the two halves is smallest.
    VarianceCut,
}

impl CutStrategy {
    pub fn from_median_flag(use_median_cut: bool) -> Self {
        if use_median_cut {
            CutStrategy::MedianCut
        } else {
            CutStrategy::VarianceCut
        }
    }
}

/// Order in which candidates are reported before truncation to the light count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CandidateOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPosition {
    pub x: u32,
    pub y: u32,
}

impl PixelPosition {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for PixelPosition {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCandidate {
    pub position: PixelPosition,
    /// Field value at `position`.
    pub intensity: f32,
    /// Depth-first index of the terminal region, first/left halves first.
    pub sequence: usize,
}

/// One cut: `region` divided at local `offset` along `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub region: Region,
    pub axis: Axis,
    pub offset: u32,
}

impl Split {
    /// Field coordinate of the cut line.
    pub fn coordinate(&self) -> u32 {
        match self.axis {
            Axis::X => self.region.x + self.offset,
            Axis::Y => self.region.y + self.offset,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LightEstimate {
    /// Reported positions, at most `light_count` of them.
    pub positions: Vec<PixelPosition>,
    /// Every terminal-region candidate, in reporting order.
    pub candidates: Vec<LightCandidate>,
    /// Cuts in depth-first order.
    pub splits: Vec<Split>,
    /// Cut depth used: log2 of the light count rounded up to a power of two.
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightEstimator {
    pub light_count: usize,
    pub strategy: CutStrategy,
    pub order: CandidateOrder,
}

impl LightEstimator {
    pub fn new(light_count: usize) -> Self {
        Self {
            light_count,
            strategy: CutStrategy::default(),
            order: CandidateOrder::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: CutStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_order(mut self, order: CandidateOrder) -> Self {
        self.order = order;
        self
    }

    /// Region count and cut depth for `light_count`: `(next_power_of_two, log2)`.
    pub fn cut_budget(light_count: usize) -> (usize, u32) {
        if light_count == 0 {
            return (0, 0);
        }
        let regions = light_count.next_power_of_two();
        (regions, regions.trailing_zeros())
    }

    pub fn estimate(&self, panorama: &RgbImage) -> Result<LightEstimate, EnvMapError> {
        let field = IntensityField::from_panorama(panorama)?;
        Ok(self.estimate_field(&field))
    }

    pub fn estimate_field(&self, field: &IntensityField) -> LightEstimate {
        let (regions, iterations) = Self::cut_budget(self.light_count);
        if regions == 0 {
            return LightEstimate::default();
        }
        log::info!(
            "finding {} light positions ({:?}, {} cut levels)",
            self.light_count,
            self.strategy,
            iterations
        );

        let root = field.full_region();
        let outcome = match self.strategy {
            CutStrategy::MedianCut => median_cut(field, root, iterations),
            CutStrategy::VarianceCut => variance_cut(field, root, None, iterations),
        };

        let mut candidates: Vec<LightCandidate> = outcome
            .points
            .into_iter()
            .enumerate()
            .map(|(sequence, position)| LightCandidate {
                position,
                intensity: field.at(position.x, position.y),
                sequence,
            })
            .collect();
        candidates.sort_by(|a, b| compare_candidates(a, b, self.order));

        let positions: Vec<PixelPosition> = candidates
            .iter()
            .take(self.light_count)
            .map(|c| c.position)
            .collect();
        for (i, c) in candidates.iter().enumerate() {
            log::debug!(
                "candidate {}: ({}, {}) intensity {:.3}",
                i,
                c.position.x,
                c.position.y,
                c.intensity
            );
        }
        if positions.len() < self.light_count {
            log::warn!(
                "only {} of {} requested lights found",
                positions.len(),
                self.light_count
            );
        }

        LightEstimate {
            positions,
            candidates,
            splits: outcome.splits,
            iterations,
        }
    }
}

/// Estimate up to `light_count` bright points of a longitude-latitude panorama.
pub fn estimate_light_positions(
    panorama: &RgbImage,
    light_count: usize,
    use_median_cut: bool,
) -> Result<Vec<PixelPosition>, EnvMapError> {
    let estimate = LightEstimator::new(light_count)
        .with_strategy(CutStrategy::from_median_flag(use_median_cut))
        .estimate(panorama)?;
    Ok(estimate.positions)
}

fn compare_candidates(a: &LightCandidate, b: &LightCandidate, order: CandidateOrder) -> Ordering {
    let by_intensity = a.intensity.total_cmp(&b.intensity);
    let by_intensity = match order {
        CandidateOrder::Ascending => by_intensity,
        CandidateOrder::Descending => by_intensity.reverse(),
    };
    by_intensity.then(a.sequence.cmp(&b.sequence))
}

/// Wide regions are cut by x, the rest by y.
fn split_axis(region: &Region) -> Axis {
    if region.width > region.height {
        Axis::X
    } else {
        Axis::Y
    }
}

#[derive(Debug, Default)]
struct CutOutcome {
    points: Vec<PixelPosition>,
    splits: Vec<Split>,
}

impl CutOutcome {
    fn terminal(point: (u32, u32)) -> Self {
        Self {
            points: vec![point.into()],
            splits: Vec::new(),
        }
    }

    fn split(split: Split, first: CutOutcome, second: CutOutcome) -> Self {
        let mut splits = Vec::with_capacity(1 + first.splits.len() + second.splits.len());
        splits.push(split);
        splits.extend(first.splits);
        splits.extend(second.splits);

        let mut points = first.points;
        points.extend(second.points);
        Self { points, splits }
    }
}

fn median_cut(field: &IntensityField, region: Region, iteration: u32) -> CutOutcome {
    if !field.contains(&region) {
        return CutOutcome::default();
    }
    if iteration == 0 {
        return CutOutcome::terminal(field.half_energy_point(&region));
    }

    let axis = split_axis(&region);
    let lane_sums = field.lane_sums(&region, axis);
    let half = lane_sums.iter().sum::<f64>() * 0.5;
    let offset = half_energy_offset(&lane_sums, half) as u32;
    let (first, second) = region.split(axis, offset);

    let (first, second) = rayon::join(
        || median_cut(field, first, iteration - 1),
        || median_cut(field, second, iteration - 1),
    );
    CutOutcome::split(Split { region, axis, offset }, first, second)
}

fn variance_cut(
    field: &IntensityField,
    region: Region,
    cached_point: Option<(u32, u32)>,
    iteration: u32,
) -> CutOutcome {
    if !field.contains(&region) {
        return CutOutcome::default();
    }
    if iteration == 0 {
        let point = cached_point.unwrap_or_else(|| field.half_energy_point(&region));
        return CutOutcome::terminal(point);
    }

    let axis = split_axis(&region);
    let Some(best) = min_variance_split(field, &region, axis) else {
        // a single lane cannot be cut further
        return CutOutcome::terminal(field.half_energy_point(&region));
    };
    let (first, second) = region.split(axis, best.offset);

    let (first, second) = rayon::join(
        || variance_cut(field, first, Some(best.first_point), iteration - 1),
        || variance_cut(field, second, Some(best.second_point), iteration - 1),
    );
    CutOutcome::split(
        Split {
            region,
            axis,
            offset: best.offset,
        },
        first,
        second,
    )
}

struct VarianceSplit {
    offset: u32,
    first_point: (u32, u32),
    second_point: (u32, u32),
}

/// Split minimising the larger spread of the two halves, each measured around its own
/// half-energy point. Ties keep the earliest offset.
fn min_variance_split(field: &IntensityField, region: &Region, axis: Axis) -> Option<VarianceSplit> {
    let profile = field.profile(region, axis);
    let lanes = profile.lanes();
    let cross = profile.cross();
    if lanes < 2 {
        return None;
    }

    let mut cross_total = vec![0.0; cross];
    for k in 0..lanes {
        for (t, v) in profile.lane(k).iter().enumerate() {
            cross_total[t] += v;
        }
    }

    let to_field = |k: usize, t: usize| -> (u32, u32) {
        match axis {
            Axis::X => (region.x + k as u32, region.y + t as u32),
            Axis::Y => (region.x + t as u32, region.y + k as u32),
        }
    };

    let mut first_cross = vec![0.0; cross];
    let mut second_cross = vec![0.0; cross];
    let mut best: Option<(f64, VarianceSplit)> = None;

    for s in 1..lanes {
        for (t, v) in profile.lane(s - 1).iter().enumerate() {
            first_cross[t] += v;
        }
        for t in 0..cross {
            second_cross[t] = cross_total[t] - first_cross[t];
        }

        let first_half = profile.total(0, s) * 0.5;
        let first_k = half_energy_offset(&profile.lane_sums()[..s], first_half);
        let first_t = half_energy_offset(&first_cross, first_half);

        let second_half = profile.total(s, lanes) * 0.5;
        let second_k = s + half_energy_offset(&profile.lane_sums()[s..], second_half);
        let second_t = half_energy_offset(&second_cross, second_half);

        let worst = profile
            .spread(0, s, first_k as f64, first_t as f64)
            .max(profile.spread(s, lanes, second_k as f64, second_t as f64));

        if best.as_ref().map_or(true, |(score, _)| worst < *score) {
            best = Some((
                worst,
                VarianceSplit {
                    offset: s as u32,
                    first_point: to_field(first_k, first_t),
                    second_point: to_field(second_k, second_t),
                },
            ));
        }
    }

    best.map(|(_, split)| split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn spikes(width: u32, height: u32, points: &[(u32, u32)]) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for &(x, y) in points {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
        img
    }

    #[test]
    fn budget_rounds_up_to_power_of_two() {
        assert_eq!(LightEstimator::cut_budget(1), (1, 0));
        assert_eq!(LightEstimator::cut_budget(5), (8, 3));
        assert_eq!(LightEstimator::cut_budget(8), (8, 3));
        assert_eq!(LightEstimator::cut_budget(0), (0, 0));
    }

    #[test]
    fn zero_lights_returns_nothing() {
        let img = spikes(8, 4, &[(2, 2)]);
        assert!(estimate_light_positions(&img, 0, true).unwrap().is_empty());
    }

    #[test]
    fn wide_regions_split_by_x() {
        let img = RgbImage::from_pixel(16, 8, Rgb([100, 100, 100]));
        let estimate = LightEstimator::new(2).estimate(&img).unwrap();
        assert_eq!(estimate.splits.len(), 1);
        assert_eq!(estimate.splits[0].axis, Axis::X);

        let img = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let estimate = LightEstimator::new(2).estimate(&img).unwrap();
        assert_eq!(estimate.splits[0].axis, Axis::Y);
    }

    #[test]
    fn variance_cut_separates_two_spikes() {
        let img = spikes(64, 32, &[(10, 16), (50, 16)]);
        let positions = estimate_light_positions(&img, 2, false).unwrap();
        assert_eq!(positions, vec![PixelPosition::new(10, 16), PixelPosition::new(50, 16)]);
    }

    #[test]
    fn equal_intensities_keep_insertion_order() {
        let img = spikes(64, 32, &[(10, 16), (50, 16)]);
        let estimate = LightEstimator::new(2)
            .with_strategy(CutStrategy::VarianceCut)
            .with_order(CandidateOrder::Descending)
            .estimate(&img)
            .unwrap();
        assert_eq!(estimate.candidates.len(), 2);
        assert_eq!(estimate.candidates[0].intensity, estimate.candidates[1].intensity);
        assert!(estimate.candidates[0].sequence < estimate.candidates[1].sequence);
    }

    #[test]
    fn descending_order_reports_brightest_first() {
        let mut img = spikes(64, 32, &[(10, 16)]);
        img.put_pixel(50, 16, Rgb([80, 80, 80]));
        let estimate = LightEstimator::new(2)
            .with_strategy(CutStrategy::VarianceCut)
            .with_order(CandidateOrder::Descending)
            .estimate(&img)
            .unwrap();
        assert_eq!(estimate.positions[0], PixelPosition::new(10, 16));
    }
}
