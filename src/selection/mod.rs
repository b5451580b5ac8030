//! Region selection module
//!
//! For a matched image pair, selects the pixels of each image whose colors
//! are compared: the full frames, discs around matched features, or virtual
//! line segments whose appearance agrees in both views.

pub mod mask;
pub mod vld;

pub use mask::Mask;
pub use vld::LineDescriptor;

use crate::config::{HarmonizeParams, SelectionMethod};
use crate::sfm::Feature;
use image::{imageops, RgbImage};

/// Masks selected for the two images of a pair
#[derive(Debug, Clone)]
pub struct PairMasks {
    pub mask_i: Mask,
    pub mask_j: Mask,
}

impl PairMasks {
    /// Smallest selected pixel count of the two sides
    pub fn min_count(&self) -> usize {
        self.mask_i.count().min(self.mask_j.count())
    }
}

/// Select the compared regions of an image pair
///
/// # Arguments
///
/// * `method` - Selection strategy
/// * `image_i`, `image_j` - The two images of the pair
/// * `points` - Matched feature positions as (feature in I, feature in J)
/// * `params` - Radius and virtual line settings
pub fn select_regions(
    method: SelectionMethod,
    image_i: &RgbImage,
    image_j: &RgbImage,
    points: &[(Feature, Feature)],
    params: &HarmonizeParams,
) -> PairMasks {
    let (wi, hi) = image_i.dimensions();
    let (wj, hj) = image_j.dimensions();

    match method {
        SelectionMethod::FullFrame => PairMasks {
            mask_i: Mask::full(wi, hi),
            mask_j: Mask::full(wj, hj),
        },
        SelectionMethod::MatchedPoints => {
            let mut mask_i = Mask::new(wi, hi);
            let mut mask_j = Mask::new(wj, hj);
            for (fi, fj) in points {
                mask_i.draw_disc(fi.x, fi.y, fi.scale.max(params.min_point_radius));
                mask_j.draw_disc(fj.x, fj.y, fj.scale.max(params.min_point_radius));
            }
            PairMasks { mask_i, mask_j }
        }
        SelectionMethod::VldSegment => {
            let gray_i = imageops::grayscale(image_i);
            let gray_j = imageops::grayscale(image_j);
            let mut mask_i = Mask::new(wi, hi);
            let mut mask_j = Mask::new(wj, hj);
            let accepted = vld::draw_matching_lines(
                &gray_i,
                &gray_j,
                points,
                &params.vld,
                &mut mask_i,
                &mut mask_j,
            );
            tracing::trace!(
                accepted,
                candidates = points.len(),
                "virtual lines accepted"
            );
            PairMasks { mask_i, mask_j }
        }
    }
}
