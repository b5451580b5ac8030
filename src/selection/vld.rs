//! Virtual line descriptors
//!
//! A virtual line joins two matched features of the same image. When the
//! appearance along the line agrees in both images, the line most likely
//! crosses the same surface in both views, so its pixels are safe to use
//! for color comparison.
//!
//! The descriptor splits the line into cells. Each cell stores its mean
//! gray level and a histogram of gradient orientations measured relative
//! to the line direction, which makes it invariant to in-plane rotation.
//! Gray profiles are z-scored before comparison, so a gain/offset change
//! between the two images, the very thing being corrected, does not
//! reject a line.

use crate::config::VldParams;
use crate::constants::selection::VLD_ORIENTATION_BINS;
use crate::selection::Mask;
use crate::sfm::Feature;
use image::GrayImage;
use std::collections::BTreeSet;
use std::f32::consts::PI;

/// Sample grid per cell along each axis
const CELL_SAMPLES: usize = 3;

/// Appearance of an image along a segment
#[derive(Debug, Clone, PartialEq)]
pub struct LineDescriptor {
    /// Mean gray level per cell
    profile: Vec<f32>,
    /// Orientation histogram per cell, L1 normalized
    orientations: Vec<[f32; VLD_ORIENTATION_BINS]>,
}

impl LineDescriptor {
    /// Describe `image` along the segment `a`-`b` split into `segments` cells
    pub fn compute(image: &GrayImage, a: (f32, f32), b: (f32, f32), segments: usize) -> Self {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let length = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
        let (ux, uy) = (dx / length, dy / length);
        let line_angle = uy.atan2(ux);
        let cell_radius = length / (2.0 * segments as f32);

        let mut profile = Vec::with_capacity(segments);
        let mut orientations = Vec::with_capacity(segments);

        for k in 0..segments {
            let t = (k as f32 + 0.5) / segments as f32;
            let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);

            let mut sum = 0.0;
            let mut samples = 0usize;
            let mut hist = [0.0f32; VLD_ORIENTATION_BINS];

            for si in 0..CELL_SAMPLES {
                for sj in 0..CELL_SAMPLES {
                    let along = offset(si) * cell_radius;
                    let across = offset(sj) * cell_radius;
                    let x = cx + along * ux - across * uy;
                    let y = cy + along * uy + across * ux;

                    let Some((value, gx, gy)) = sample(image, x, y) else {
                        continue;
                    };
                    sum += value;
                    samples += 1;

                    let magnitude = (gx * gx + gy * gy).sqrt();
                    if magnitude > f32::EPSILON {
                        let relative = (gy.atan2(gx) - line_angle).rem_euclid(2.0 * PI);
                        let bin = ((relative / (2.0 * PI)) * VLD_ORIENTATION_BINS as f32) as usize;
                        hist[bin.min(VLD_ORIENTATION_BINS - 1)] += magnitude;
                    }
                }
            }

            profile.push(if samples > 0 { sum / samples as f32 } else { 0.0 });
            orientations.push(normalize_l1(hist));
        }

        Self {
            profile,
            orientations,
        }
    }

    /// Distance in `[0, 1]`; 0 means identical appearance
    pub fn distance(&self, other: &LineDescriptor) -> f32 {
        let p = z_score(&self.profile);
        let q = z_score(&other.profile);
        let n = p.len().min(q.len()).max(1) as f32;

        let profile_distance =
            (p.iter().zip(&q).map(|(a, b)| (a - b).powi(2)).sum::<f32>() / n).sqrt() / 2.0;

        let orientation_distance = self
            .orientations
            .iter()
            .zip(&other.orientations)
            .map(|(h1, h2)| 0.5 * h1.iter().zip(h2).map(|(a, b)| (a - b).abs()).sum::<f32>())
            .sum::<f32>()
            / n;

        (0.5 * (profile_distance.min(1.0) + orientation_distance)).clamp(0.0, 1.0)
    }
}

/// Sample offsets spread evenly over `[-1, 1]`
fn offset(i: usize) -> f32 {
    if CELL_SAMPLES == 1 {
        0.0
    } else {
        -1.0 + 2.0 * i as f32 / (CELL_SAMPLES - 1) as f32
    }
}

/// Gray value and central-difference gradient at the nearest pixel
fn sample(image: &GrayImage, x: f32, y: f32) -> Option<(f32, f32, f32)> {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return None;
    }
    let xi = x.round();
    let yi = y.round();
    if xi < 1.0 || yi < 1.0 || xi > (w - 2) as f32 || yi > (h - 2) as f32 {
        return None;
    }
    let (xi, yi) = (xi as u32, yi as u32);
    let at = |x: u32, y: u32| image.get_pixel(x, y).0[0] as f32;

    let gx = (at(xi + 1, yi) - at(xi - 1, yi)) / 2.0;
    let gy = (at(xi, yi + 1) - at(xi, yi - 1)) / 2.0;
    Some((at(xi, yi), gx, gy))
}

fn normalize_l1(mut hist: [f32; VLD_ORIENTATION_BINS]) -> [f32; VLD_ORIENTATION_BINS] {
    let total: f32 = hist.iter().sum();
    if total > f32::EPSILON {
        hist.iter_mut().for_each(|v| *v /= total);
    } else {
        hist = [1.0 / VLD_ORIENTATION_BINS as f32; VLD_ORIENTATION_BINS];
    }
    hist
}

fn z_score(values: &[f32]) -> Vec<f32> {
    let n = values.len().max(1) as f32;
    let mean = values.iter().sum::<f32>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt();
    if std < 1e-3 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

/// Uniform bucket grid over the image I positions of the matches
struct PointGrid {
    origin: (f32, f32),
    cell: f32,
    cols: usize,
    rows: usize,
    buckets: Vec<Vec<usize>>,
}

impl PointGrid {
    /// Grid sized for about `per_cell` points per bucket; `points` must not be empty
    fn new(points: &[(Feature, Feature)], per_cell: usize) -> Self {
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for (f, _) in points {
            min_x = min_x.min(f.x);
            min_y = min_y.min(f.y);
            max_x = max_x.max(f.x);
            max_y = max_y.max(f.y);
        }

        let width = (max_x - min_x).max(1.0);
        let height = (max_y - min_y).max(1.0);
        let area_per_point = width * height / points.len() as f32;
        let span = width.max(height) / points.len() as f32;
        let cell = (area_per_point * per_cell.max(1) as f32).sqrt().max(span).max(1.0);
        let cols = (width / cell) as usize + 1;
        let rows = (height / cell) as usize + 1;

        let mut grid = Self {
            origin: (min_x, min_y),
            cell,
            cols,
            rows,
            buckets: vec![Vec::new(); cols * rows],
        };
        for (index, (f, _)) in points.iter().enumerate() {
            let (x, y) = grid.cell_of(f);
            grid.buckets[y * grid.cols + x].push(index);
        }
        grid
    }

    fn cell_of(&self, f: &Feature) -> (usize, usize) {
        let x = ((f.x - self.origin.0) / self.cell).max(0.0) as usize;
        let y = ((f.y - self.origin.1) / self.cell).max(0.0) as usize;
        (x.min(self.cols - 1), y.min(self.rows - 1))
    }

    /// Cells at Chebyshev distance `ring` from `(cx, cy)`
    fn ring(&self, cx: usize, cy: usize, ring: usize) -> impl Iterator<Item = (usize, usize)> {
        let (cols, rows) = (self.cols as i64, self.rows as i64);
        let (cx, cy, r) = (cx as i64, cy as i64, ring as i64);
        ((cy - r)..=(cy + r))
            .flat_map(move |y| {
                let step = if y == cy - r || y == cy + r {
                    1
                } else {
                    (2 * r) as usize
                };
                ((cx - r)..=(cx + r)).step_by(step).map(move |x| (x, y))
            })
            .filter(move |&(x, y)| x >= 0 && y >= 0 && x < cols && y < rows)
            .map(|(x, y)| (x as usize, y as usize))
    }

    /// The `k` matches closest to match `m` in image I, nearest first, ties by index
    fn nearest(&self, points: &[(Feature, Feature)], m: usize, k: usize) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        let center = &points[m].0;
        let (cx, cy) = self.cell_of(center);
        let order = |a: &(f32, usize), b: &(f32, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));

        let mut found: Vec<(f32, usize)> = Vec::with_capacity(2 * k);
        for ring in 0..=self.cols.max(self.rows) {
            for (x, y) in self.ring(cx, cy, ring) {
                found.extend(
                    self.buckets[y * self.cols + x]
                        .iter()
                        .filter(|&&n| n != m)
                        .map(|&n| (center.distance(&points[n].0), n)),
                );
            }
            if found.len() >= k {
                found.select_nth_unstable_by(k - 1, order);
                found.truncate(k);
                // anything outside the rings visited so far is at least this far
                if found[k - 1].0 < ring as f32 * self.cell {
                    break;
                }
            }
        }

        found.sort_by(order);
        found.into_iter().map(|(_, n)| n).collect()
    }
}

/// Candidate match index pairs: each match with its nearest neighbours in image I
fn candidate_pairs(points: &[(Feature, Feature)], neighbors: usize) -> BTreeSet<(usize, usize)> {
    let mut candidates = BTreeSet::new();
    if points.len() < 2 || neighbors == 0 {
        return candidates;
    }

    let grid = PointGrid::new(points, neighbors);
    for m in 0..points.len() {
        for n in grid.nearest(points, m, neighbors) {
            candidates.insert((m.min(n), m.max(n)));
        }
    }
    candidates
}

/// Draw the virtual lines that agree between both images into the masks
///
/// Returns the number of accepted lines.
pub fn draw_matching_lines(
    gray_i: &GrayImage,
    gray_j: &GrayImage,
    points: &[(Feature, Feature)],
    params: &VldParams,
    mask_i: &mut Mask,
    mask_j: &mut Mask,
) -> usize {
    let mut accepted = 0;

    for (m, n) in candidate_pairs(points, params.neighbors) {
        let (a_i, a_j) = &points[m];
        let (b_i, b_j) = &points[n];

        let len_i = a_i.distance(b_i);
        let len_j = a_j.distance(b_j);
        let in_range = |len: f32| len >= params.min_length && len <= params.max_length;
        if !in_range(len_i) || !in_range(len_j) {
            continue;
        }

        let segments = params.segments;
        let desc_i = LineDescriptor::compute(gray_i, (a_i.x, a_i.y), (b_i.x, b_i.y), segments);
        let desc_j = LineDescriptor::compute(gray_j, (a_j.x, a_j.y), (b_j.x, b_j.y), segments);
        if desc_i.distance(&desc_j) > params.threshold {
            continue;
        }

        mask_i.draw_segment((a_i.x, a_i.y), (b_i.x, b_i.y), params.thickness);
        mask_j.draw_segment((a_j.x, a_j.y), (b_j.x, b_j.y), params.thickness);
        accepted += 1;
    }

    accepted
}
