//! Color module
//!
//! Histograms of selected regions, the per-image affine color model, the
//! global solve that fits it, and Lab measurements for reporting.

pub mod conversion;
pub mod histogram;
pub mod solver;
pub mod transform;

pub use conversion::ColorConverter;
pub use histogram::{ChannelHistogram, RgbHistogram};
pub use solver::{ChannelSolution, GlobalSolver, PairConstraint};
pub use transform::{Channel, ColorTransform, GainOffset};
