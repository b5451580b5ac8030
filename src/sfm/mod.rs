//! Scene description module
//!
//! This module reads everything the harmonizer knows about a scene:
//! the views of the SfM data, per-view feature points and the pairwise
//! matches between them, plus the connectivity of the resulting graph.

pub mod data;
pub mod features;
pub mod graph;
pub mod matches;

pub use data::{SfmData, View, ViewId};
pub use features::Feature;
pub use graph::MatchGraph;
pub use matches::{IndMatch, Pair, PairwiseMatches};
