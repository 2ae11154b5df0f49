// intensity.rs — sine-weighted intensity field and the sums the cut searches run on

use std::f64::consts::PI;

use image::{Rgb, RgbImage};

use crate::error::EnvMapError;

/// Axis-aligned rectangle over an intensity field, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Extent along `axis`.
    pub fn extent(&self, axis: Axis) -> u32 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }

    /// Split at local `offset` along `axis` into `[0, offset)` and `[offset, extent)`.
    pub fn split(&self, axis: Axis, offset: u32) -> (Region, Region) {
        match axis {
            Axis::X => (
                Region::new(self.x, self.y, offset, self.height),
                Region::new(self.x + offset, self.y, self.width - offset, self.height),
            ),
            Axis::Y => (
                Region::new(self.x, self.y, self.width, offset),
                Region::new(self.x, self.y + offset, self.width, self.height - offset),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn cross(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// Grayscale panorama weighted by `sin(colatitude)` per row. All values are >= 0.
#[derive(Debug, Clone)]
pub struct IntensityField {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl IntensityField {
    pub fn from_panorama(panorama: &RgbImage) -> Result<Self, EnvMapError> {
        let (width, height) = panorama.dimensions();
        EnvMapError::check_dimensions(width, height)?;

        let mut values = Vec::with_capacity(width as usize * height as usize);
        for (j, row) in panorama.rows().enumerate() {
            let weight = row_weight(j as u32, height);
            values.extend(row.map(|p| weight * luma(p) as f32));
        }

        Ok(Self { width, height, values })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn full_region(&self) -> Region {
        Region::new(0, 0, self.width, self.height)
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// True when `region` is non-empty and starts inside the field.
    pub fn contains(&self, region: &Region) -> bool {
        !region.is_empty() && region.x < self.width && region.y < self.height
    }

    /// Value at local `(lane, cross)` where `lane` runs along `axis`.
    fn local(&self, region: &Region, axis: Axis, lane: u32, cross: u32) -> f32 {
        match axis {
            Axis::X => self.at(region.x + lane, region.y + cross),
            Axis::Y => self.at(region.x + cross, region.y + lane),
        }
    }

    /// Per-lane totals along `axis`: column sums for `X`, row sums for `Y`.
    pub fn lane_sums(&self, region: &Region, axis: Axis) -> Vec<f64> {
        let lanes = region.extent(axis);
        let cross = region.extent(axis.cross());
        (0..lanes)
            .map(|k| {
                (0..cross)
                    .map(|t| self.local(region, axis, k, t) as f64)
                    .sum()
            })
            .collect()
    }

    pub fn total(&self, region: &Region) -> f64 {
        self.lane_sums(region, Axis::Y).iter().sum()
    }

    /// Half-energy point of `region` in field coordinates.
    pub fn half_energy_point(&self, region: &Region) -> (u32, u32) {
        let columns = self.lane_sums(region, Axis::X);
        let rows = self.lane_sums(region, Axis::Y);
        let half = columns.iter().sum::<f64>() * 0.5;
        let dx = half_energy_offset(&columns, half);
        let dy = half_energy_offset(&rows, half);
        (region.x + dx as u32, region.y + dy as u32)
    }

    /// Lane profile used by the variance-minimising split search.
    pub fn profile(&self, region: &Region, axis: Axis) -> LaneProfile {
        let lanes = region.extent(axis) as usize;
        let cross = region.extent(axis.cross()) as usize;
        let mut cells = Vec::with_capacity(lanes * cross);
        for k in 0..lanes as u32 {
            for t in 0..cross as u32 {
                cells.push(self.local(region, axis, k, t) as f64);
            }
        }
        LaneProfile::new(cells, lanes, cross)
    }
}

/// Rec.601 luma in 14-bit fixed point, rounded half up.
///
/// Weights 0.299 / 0.587 / 0.114, scaled so they sum to exactly `1 << 14`.
pub fn luma(pixel: &Rgb<u8>) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;
    let [r, g, b] = pixel.0;
    ((r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT) as u8
}

/// `sin(j / (H - 1) * pi)`; a single-row field keeps full weight.
pub fn row_weight(row: u32, height: u32) -> f32 {
    if height > 1 {
        (row as f64 / (height - 1) as f64 * PI).sin() as f32
    } else {
        1.0
    }
}

/// First offset where the running sum reaches `half`; the last offset if it never does.
pub fn half_energy_offset(lane_sums: &[f64], half: f64) -> usize {
    let mut running = 0.0;
    for (offset, sum) in lane_sums.iter().enumerate() {
        running += sum;
        if running >= half {
            return offset;
        }
    }
    lane_sums.len().saturating_sub(1)
}

/// Intensity cells of a region laid out lane-major, with prefix moments per lane.
///
/// Coordinates are local: `k` along the lanes, `t` across them.
pub struct LaneProfile {
    cells: Vec<f64>,
    lanes: usize,
    cross: usize,
    lane_sums: Vec<f64>,
    // prefix[k] covers lanes [0, k)
    sum: Vec<f64>,
    sum_k: Vec<f64>,
    sum_kk: Vec<f64>,
    sum_t: Vec<f64>,
    sum_tt: Vec<f64>,
}

impl LaneProfile {
    fn new(cells: Vec<f64>, lanes: usize, cross: usize) -> Self {
        let mut lane_sums = Vec::with_capacity(lanes);
        let mut sum = vec![0.0; lanes + 1];
        let mut sum_k = vec![0.0; lanes + 1];
        let mut sum_kk = vec![0.0; lanes + 1];
        let mut sum_t = vec![0.0; lanes + 1];
        let mut sum_tt = vec![0.0; lanes + 1];

        for k in 0..lanes {
            let lane = &cells[k * cross..(k + 1) * cross];
            let s: f64 = lane.iter().sum();
            let (mut st, mut stt) = (0.0, 0.0);
            for (t, v) in lane.iter().enumerate() {
                let t = t as f64;
                st += v * t;
                stt += v * t * t;
            }
            let kf = k as f64;
            lane_sums.push(s);
            sum[k + 1] = sum[k] + s;
            sum_k[k + 1] = sum_k[k] + s * kf;
            sum_kk[k + 1] = sum_kk[k] + s * kf * kf;
            sum_t[k + 1] = sum_t[k] + st;
            sum_tt[k + 1] = sum_tt[k] + stt;
        }

        Self {
            cells,
            lanes,
            cross,
            lane_sums,
            sum,
            sum_k,
            sum_kk,
            sum_t,
            sum_tt,
        }
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    pub fn cross(&self) -> usize {
        self.cross
    }

    pub fn lane_sums(&self) -> &[f64] {
        &self.lane_sums
    }

    pub fn lane(&self, k: usize) -> &[f64] {
        &self.cells[k * self.cross..(k + 1) * self.cross]
    }

    /// Total over lanes `[a, b)`.
    pub fn total(&self, a: usize, b: usize) -> f64 {
        self.sum[b] - self.sum[a]
    }

    /// Root-mean weighted squared distance from `(ck, ct)` over lanes `[a, b)`.
    pub fn spread(&self, a: usize, b: usize, ck: f64, ct: f64) -> f64 {
        let area = ((b - a) * self.cross) as f64;
        if area == 0.0 {
            return 0.0;
        }
        let s = self.sum[b] - self.sum[a];
        let sk = self.sum_k[b] - self.sum_k[a];
        let skk = self.sum_kk[b] - self.sum_kk[a];
        let st = self.sum_t[b] - self.sum_t[a];
        let stt = self.sum_tt[b] - self.sum_tt[a];
        let weighted = skk - 2.0 * ck * sk + ck * ck * s + stt - 2.0 * ct * st + ct * ct * s;
        (weighted.max(0.0) / area).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poles_carry_no_weight() {
        let panorama = RgbImage::from_pixel(4, 5, Rgb([255, 255, 255]));
        let field = IntensityField::from_panorama(&panorama).unwrap();
        assert_eq!(field.at(0, 0), 0.0);
        assert!(field.at(0, 4).abs() < 1e-4);
        assert!((field.at(3, 2) - 255.0).abs() < 1e-3);
        assert!(field.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn luma_uses_rec601_weights() {
        assert_eq!(luma(&Rgb([255, 0, 0])), 76);
        assert_eq!(luma(&Rgb([0, 255, 0])), 150);
        assert_eq!(luma(&Rgb([0, 0, 255])), 29);
        assert_eq!(luma(&Rgb([255, 255, 255])), 255);
        assert_eq!(luma(&Rgb([0, 60, 0])), 35);
    }

    #[test]
    fn half_energy_offset_stops_at_threshold() {
        assert_eq!(half_energy_offset(&[1.0, 1.0, 1.0, 1.0], 2.0), 1);
        assert_eq!(half_energy_offset(&[0.0, 0.0, 5.0], 2.5), 2);
        assert_eq!(half_energy_offset(&[0.0, 0.0], 0.0), 0);
        assert_eq!(half_energy_offset(&[1.0, 1.0], 10.0), 1);
    }

    #[test]
    fn spread_matches_direct_sum() {
        let mut panorama = RgbImage::new(6, 7);
        for (x, y, p) in panorama.enumerate_pixels_mut() {
            *p = Rgb([(x * 40) as u8, (y * 30) as u8, 10]);
        }
        let field = IntensityField::from_panorama(&panorama).unwrap();
        let region = Region::new(1, 1, 4, 5);
        let profile = field.profile(&region, Axis::X);

        let (ck, ct) = (1.5, 2.0);
        let mut direct = 0.0;
        for k in 1..3u32 {
            for t in 0..5u32 {
                let v = field.at(region.x + k, region.y + t) as f64;
                let (dk, dt) = (k as f64 - ck, t as f64 - ct);
                direct += v * (dk * dk + dt * dt);
            }
        }
        let direct = (direct / 10.0).sqrt();
        assert!((profile.spread(1, 3, ck, ct) - direct).abs() < 1e-9);
    }
}
