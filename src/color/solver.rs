//! Global L-infinity gain/offset solve
//!
//! Every image of the component gets one affine map per channel. For each
//! matched pair and quantile level, the mapped quantile values of both
//! images should coincide; the solver minimizes the largest disagreement
//! over all pairs and levels, with the reference image pinned to identity.
//!
//! The minimax problem is solved with Lawson's algorithm: a sequence of
//! weighted least-squares problems where each row's weight is multiplied
//! by its current absolute residual, which drives the weighted L2 solution
//! toward the Chebyshev (L-infinity) one. Values are scaled to `[0, 1]`
//! while solving so gain and offset columns have comparable magnitude.

use crate::color::histogram::{quantile_levels, ChannelHistogram};
use crate::color::transform::{Channel, GainOffset};
use crate::config::HarmonizeParams;
use crate::constants::histogram::MAX_VALUE;
use crate::constants::solver::RIDGE_WEIGHT;
use crate::error::{HarmonizeError, Result};
use nalgebra::{DMatrix, DVector};

/// Quantile correspondences of one channel between two images
#[derive(Debug, Clone, PartialEq)]
pub struct PairConstraint {
    /// Index of the first image in the solve
    pub i: usize,
    /// Index of the second image in the solve
    pub j: usize,
    /// `(value in i, value in j)` per quantile level, in 0-255 units
    pub samples: Vec<(f64, f64)>,
}

impl PairConstraint {
    /// Pair up the quantiles of two channel histograms
    ///
    /// Returns `None` if either histogram is empty.
    pub fn from_histograms(
        i: usize,
        j: usize,
        hist_i: &ChannelHistogram,
        hist_j: &ChannelHistogram,
        quantile_count: usize,
    ) -> Option<Self> {
        let samples = quantile_levels(quantile_count)
            .into_iter()
            .map(|q| Some((hist_i.quantile(q)? as f64, hist_j.quantile(q)? as f64)))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { i, j, samples })
    }
}

/// Result of solving one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSolution {
    /// Transform per image, indexed like the constraints
    pub transforms: Vec<GainOffset>,
    /// Largest remaining disagreement, in 0-255 units
    pub max_residual: f64,
    /// Lawson iterations run
    pub iterations: usize,
}

/// Minimax solver over all pair constraints of one channel
#[derive(Debug, Clone)]
pub struct GlobalSolver {
    max_iterations: usize,
    tolerance: f64,
    gain_min: f64,
    gain_max: f64,
}

/// One residual `coeffs . theta + constant`, coefficients sparse
struct Row {
    coeffs: Vec<(usize, f64)>,
    constant: f64,
}

impl Row {
    fn residual(&self, theta: &DVector<f64>) -> f64 {
        self.coeffs.iter().map(|(k, a)| a * theta[*k]).sum::<f64>() + self.constant
    }
}

impl GlobalSolver {
    pub fn new(max_iterations: usize, tolerance: f64, gain_min: f64, gain_max: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            gain_min,
            gain_max,
        }
    }

    pub fn from_params(params: &HarmonizeParams) -> Self {
        Self::new(
            params.max_iterations,
            params.tolerance,
            params.gain_min,
            params.gain_max,
        )
    }

    /// Solve one channel
    ///
    /// # Arguments
    ///
    /// * `channel` - Channel being solved, for error reporting
    /// * `image_count` - Number of images; constraint indices are below it
    /// * `reference` - Index of the image fixed to identity
    /// * `constraints` - Quantile correspondences per pair
    ///
    /// # Errors
    ///
    /// Returns `HarmonizeError::SolverError` if the normal equations are
    /// singular or a gain leaves the accepted bounds.
    pub fn solve(
        &self,
        channel: Channel,
        image_count: usize,
        reference: usize,
        constraints: &[PairConstraint],
    ) -> Result<ChannelSolution> {
        let fail = |reason: String| HarmonizeError::SolverError {
            channel: channel.to_string(),
            reason,
        };

        if reference >= image_count {
            return Err(fail(format!(
            "reference index {} out of {} images",
            reference, image_count
        )));
        }

        // parameter slot of each image: gain at 2k, offset at 2k + 1
        let slot = |image: usize| -> Option<usize> {
            match image.cmp(&reference) {
                std::cmp::Ordering::Less => Some(image),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(image - 1),
            }
        };
        let dim = 2 * (image_count - 1);

        let mut rows = Vec::new();
        for constraint in constraints {
            if constraint.i >= image_count || constraint.j >= image_count {
                return Err(fail(format!(
                    "constraint ({}, {}) out of {} images",
                    constraint.i, constraint.j, image_count
                )));
            }
            for &(xi, xj) in &constraint.samples {
                let (xi, xj) = (xi / MAX_VALUE, xj / MAX_VALUE);
                let mut row = Row {
                    coeffs: Vec::with_capacity(4),
                    constant: 0.0,
                };
                match slot(constraint.i) {
                    Some(k) => row.coeffs.extend([(2 * k, xi), (2 * k + 1, 1.0)]),
                    None => row.constant += xi,
                }
                match slot(constraint.j) {
                    Some(k) => row.coeffs.extend([(2 * k, -xj), (2 * k + 1, -1.0)]),
                    None => row.constant -= xj,
                }
                rows.push(row);
            }
        }

        let mut theta = identity(dim);
        let mut iterations = 0;

        if dim > 0 && !rows.is_empty() {
            let mut weights = vec![1.0 / rows.len() as f64; rows.len()];
            let mut best = (f64::INFINITY, theta.clone());
            let mut previous = f64::INFINITY;

            while iterations < self.max_iterations {
                iterations += 1;
                theta = weighted_least_squares(&rows, &weights, dim)
                    .ok_or_else(|| fail("normal equations are not positive definite".into()))?;

                let residuals: Vec<f64> = rows.iter().map(|r| r.residual(&theta).abs()).collect();
                let max_residual = residuals.iter().cloned().fold(0.0, f64::max);
                if max_residual < best.0 {
                    best = (max_residual, theta.clone());
                }

                let weighted: f64 = weights.iter().zip(&residuals).map(|(w, r)| w * r).sum();
                if max_residual < 1e-12 || weighted < 1e-15 {
                    break;
                }
                if (previous - max_residual).abs() <= self.tolerance * max_residual {
                    break;
                }
                previous = max_residual;

                for (w, r) in weights.iter_mut().zip(&residuals) {
                    *w = *w * r / weighted;
                }
            }
            theta = best.1;
        }

        let transforms: Vec<GainOffset> = (0..image_count)
            .map(|image| match slot(image) {
                Some(k) => GainOffset::new(theta[2 * k], theta[2 * k + 1] * MAX_VALUE),
                None => GainOffset::IDENTITY,
            })
            .collect();

        for (image, t) in transforms.iter().enumerate() {
            if !t.gain.is_finite() || t.gain < self.gain_min || t.gain > self.gain_max {
                return Err(fail(format!(
                    "gain {:.4} of image {} outside [{}, {}]",
                    t.gain, image, self.gain_min, self.gain_max
                )));
            }
        }

        let max_residual = rows
            .iter()
            .map(|r| r.residual(&theta).abs())
            .fold(0.0, f64::max)
            * MAX_VALUE;

        tracing::debug!(%channel, iterations, max_residual, "channel solved");

        Ok(ChannelSolution {
            transforms,
            max_residual,
            iterations,
        })
    }
}

/// Identity parameters: gains 1, offsets 0
fn identity(dim: usize) -> DVector<f64> {
    DVector::from_fn(dim, |k, _| if k % 2 == 0 { 1.0 } else { 0.0 })
}

/// Minimize `sum w r^2 + ridge * |theta - identity|^2`
///
/// The ridge scales with the mean diagonal of the normal matrix so it only
/// conditions the solve, whatever the row count or weight distribution.
fn weighted_least_squares(rows: &[Row], weights: &[f64], dim: usize) -> Option<DVector<f64>> {
    let mut normal = DMatrix::<f64>::zeros(dim, dim);
    let mut rhs = DVector::<f64>::zeros(dim);

    for (row, &w) in rows.iter().zip(weights) {
        if w == 0.0 {
            continue;
        }
        for &(a, va) in &row.coeffs {
            rhs[a] -= w * va * row.constant;
            for &(b, vb) in &row.coeffs {
                normal[(a, b)] += w * va * vb;
            }
        }
    }

    let trace = normal.trace();
    let ridge = if trace > 0.0 {
        RIDGE_WEIGHT * trace / dim as f64
    } else {
        RIDGE_WEIGHT
    };
    let prior = identity(dim);
    for k in 0..dim {
        normal[(k, k)] += ridge;
        rhs[k] += ridge * prior[k];
    }

    normal.cholesky().map(|c| c.solve(&rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::solver::{DEFAULT_GAIN_MAX, DEFAULT_GAIN_MIN};

    fn solver() -> GlobalSolver {
        GlobalSolver::new(200, 1e-9, DEFAULT_GAIN_MIN, DEFAULT_GAIN_MAX)
    }

    /// Samples where `value_j = (value_i - offset) / gain`
    fn related(i: usize, j: usize, gain: f64, offset: f64) -> PairConstraint {
        let samples = (1..10)
            .map(|k| {
                let vi = 20.0 * k as f64 + 10.0;
                (vi, (vi - offset) / gain)
            })
            .collect();
        PairConstraint { i, j, samples }
    }

    #[test]
    fn test_recovers_gain_offset() {
        let constraints = vec![related(0, 1, 1.25, 10.0)];
        let solution = solver().solve(Channel::Red, 2, 0, &constraints).unwrap();

        assert_eq!(solution.transforms[0], GainOffset::IDENTITY);
        let t = solution.transforms[1];
        assert!((t.gain - 1.25).abs() < 1e-3, "gain {}", t.gain);
        assert!((t.offset - 10.0).abs() < 0.5, "offset {}", t.offset);
        assert!(solution.max_residual < 0.5);
    }

    #[test]
    fn test_chain_through_middle_image() {
        // 0 <- 1 <- 2 with the reference at the end of the chain
        let constraints = vec![related(1, 2, 1.1, 5.0), related(0, 1, 0.9, -4.0)];
        let solution = solver().solve(Channel::Green, 3, 2, &constraints).unwrap();

        // mapped values of every image agree with the reference
        let probe = 120.0;
        let t = &solution.transforms;
        let v1 = 1.1 * probe + 5.0;
        let v0 = 0.9 * v1 - 4.0;
        let mapped0 = t[0].gain * v0 + t[0].offset;
        let mapped1 = t[1].gain * v1 + t[1].offset;
        assert!((mapped1 - probe).abs() < 0.5, "{}", mapped1);
        assert!((mapped0 - probe).abs() < 0.5, "{}", mapped0);
    }

    #[test]
    fn test_minimax_balances_conflict() {
        // contradicting samples at the same value; the optimum leaves 25/3
        let pair = |samples| PairConstraint {
            i: 0,
            j: 1,
            samples,
        };
        let a = pair(vec![(100.0, 90.0)]);
        let b = pair(vec![(100.0, 110.0)]);
        let c = pair(vec![(50.0, 50.0)]);
        let solution = solver().solve(Channel::Blue, 2, 0, &[a, b, c]).unwrap();

        assert!(
            solution.max_residual < 9.0,
            "residual {}",
            solution.max_residual
        );
    }

    #[test]
    fn test_long_consistent_chain_is_exact() {
        // image k maps onto image k - 1 by gain 1.01, offset 0.5
        let count = 40;
        let mut values: Vec<f64> = (1..20).map(|q| 20.0 + 8.0 * q as f64).collect();
        let mut constraints = Vec::new();
        for k in 1..count {
            let next: Vec<f64> = values.iter().map(|v| (v - 0.5) / 1.01).collect();
            constraints.push(PairConstraint {
                i: k - 1,
                j: k,
                samples: values.iter().copied().zip(next.iter().copied()).collect(),
            });
            values = next;
        }

        let solution = solver().solve(Channel::Red, count, 0, &constraints).unwrap();

        assert!(
            solution.max_residual < 1e-3,
            "residual {}",
            solution.max_residual
        );
        let last = solution.transforms[count - 1];
        let expected = 1.01f64.powi(count as i32 - 1);
        assert!(
            (last.gain - expected).abs() < 1e-4,
            "gain {} vs {}",
            last.gain,
            expected
        );
    }

    #[test]
    fn test_gain_bounds_enforced() {
        let constraints = vec![related(0, 1, 8.0, 0.0)];
        let result = solver().solve(Channel::Red, 2, 0, &constraints);
        assert!(matches!(result, Err(HarmonizeError::SolverError { .. })));
    }

    #[test]
    fn test_single_image() {
        let solution = solver().solve(Channel::Red, 1, 0, &[]).unwrap();
        assert_eq!(solution.transforms, vec![GainOffset::IDENTITY]);
        assert_eq!(solution.max_residual, 0.0);
    }

    #[test]
    fn test_constraint_from_histograms() {
        let mut hi = ChannelHistogram::default();
        let mut hj = ChannelHistogram::default();
        for v in 0..100u8 {
            hi.add(v);
            hj.add(v + 50);
        }
        let c = PairConstraint::from_histograms(0, 1, &hi, &hj, 3).unwrap();
        assert_eq!(c.samples.len(), 3);
        for (a, b) in &c.samples {
            assert_eq!(b - a, 50.0);
        }

        let empty = ChannelHistogram::default();
        let missing = PairConstraint::from_histograms(0, 1, &hi, &empty, 3);
        assert!(missing.is_none());
    }
}
