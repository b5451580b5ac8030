//! Global color harmonization engine
//!
//! Runs the whole pipeline for one scene: load views and matches, keep the
//! largest connected component, select compared regions per pair, solve
//! the per-channel gain/offset model against a reference view, then write
//! the corrected images and a report.

use crate::color::{
    Channel, ColorConverter, ColorTransform, GlobalSolver, PairConstraint, RgbHistogram,
};
use crate::config::{DescriberType, HarmonizeConfig, SelectionMethod};
use crate::constants::output::REPORT_FILE_NAME;
use crate::error::{HarmonizeError, Result};
use crate::image_loader::{load_image, output_path, save_image};
use crate::report::{ChannelReport, HarmonizationReport, ViewReport};
use crate::selection::select_regions;
use crate::sfm::features::load_features;
use crate::sfm::matches::{load_matches, DescriberMatches};
use crate::sfm::{Feature, MatchGraph, Pair, SfmData, ViewId};
use image::RgbImage;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

/// Selection used when none is configured
pub const DEFAULT_SELECTION: SelectionMethod = SelectionMethod::MatchedPoints;

type FeatureTable = HashMap<(ViewId, DescriberType), Vec<Feature>>;

/// Histograms of both sides of a pair, or `None` if the pair was skipped
struct PairOutcome {
    pair: Pair,
    histograms: Option<(RgbHistogram, RgbHistogram)>,
}

/// Harmonizes the colors of every view of a scene
pub struct ColorHarmonizationEngine {
    config: HarmonizeConfig,
}

impl ColorHarmonizationEngine {
    pub fn new(config: HarmonizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarmonizeConfig {
        &self.config
    }

    /// Run the pipeline and write results into the output directory
    ///
    /// # Errors
    ///
    /// Returns `HarmonizeError` if the configuration is invalid, the scene
    /// files cannot be read, fewer than two views are connected, the
    /// reference view is not usable, or the solve fails.
    pub fn process(&self) -> Result<HarmonizationReport> {
        let config = &self.config;
        config.validate()?;

        let sfm = SfmData::from_json_file(&config.sfm_data_path)?;
        tracing::info!(
            views = sfm.len(),
            path = %config.sfm_data_path.display(),
            "loaded SfM data"
        );

        let mut matches = load_matches(
            &config.matches_dir,
            config.geometric_model,
            &config.describer_types,
        )?;
        matches.check_views(&sfm)?;
        tracing::info!(pairs = matches.len(), "loaded matches");

        let graph = MatchGraph::from_pairs(matches.pairs());
        let component = graph.largest_connected_component();
        if component.len() < 2 {
            return Err(HarmonizeError::SceneError {
                reason: format!(
                    "largest connected component has {} view(s), at least 2 are needed",
                    component.len()
                ),
            });
        }
        let pair_count = matches.len();
        matches.retain_views(|v| component.contains(&v));
        if matches.len() < pair_count {
            tracing::info!(
                dropped = pair_count - matches.len(),
                kept_views = component.len(),
                "pairs outside the largest connected component dropped"
            );
        }

        let reference = self.resolve_reference(&graph, &component)?;
        let method = config.selection_method.unwrap_or_else(|| {
            tracing::info!(
                selection = ?DEFAULT_SELECTION,
                "no selection method given, using default"
            );
            DEFAULT_SELECTION
        });
        tracing::info!(reference, ?method, "harmonization settings");

        let features = if method.needs_features() {
            self.load_feature_table(&component)?
        } else {
            FeatureTable::new()
        };

        let images = load_images(&sfm, &component)?;

        let outcomes = matches
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(pair, describer_matches)| -> Result<PairOutcome> {
                let points = resolve_points(*pair, describer_matches, &features, method)?;
                let (image_i, image_j) = (&images[&pair.0], &images[&pair.1]);
                let masks = select_regions(method, image_i, image_j, &points, &config.params);

                let selected = masks.min_count();
                if selected < config.params.min_overlap_pixels {
                    tracing::warn!(
                        i = pair.0,
                        j = pair.1,
                        selected,
                        required = config.params.min_overlap_pixels,
                        "pair skipped, not enough selected pixels"
                    );
                    return Ok(PairOutcome {
                        pair: *pair,
                        histograms: None,
                    });
                }
                tracing::debug!(i = pair.0, j = pair.1, selected, "pair regions selected");

                Ok(PairOutcome {
                    pair: *pair,
                    histograms: Some((
                        RgbHistogram::from_image_mask(image_i, &masks.mask_i),
                        RgbHistogram::from_image_mask(image_j, &masks.mask_j),
                    )),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let pairs_skipped: Vec<Pair> = outcomes
            .iter()
            .filter(|o| o.histograms.is_none())
            .map(|o| o.pair)
            .collect();
        let used: Vec<&PairOutcome> = outcomes.iter().filter(|o| o.histograms.is_some()).collect();

        // skipped pairs may split the component; keep the part holding the reference
        let used_pairs: Vec<Pair> = used.iter().map(|o| o.pair).collect();
        let harmonized: BTreeSet<ViewId> = MatchGraph::from_pairs(&used_pairs)
            .connected_components()
            .into_iter()
            .find(|c| c.contains(&reference))
            .ok_or_else(|| HarmonizeError::SceneError {
                reason: format!("no usable pair involves reference view {}", reference),
            })?;

        let index: BTreeMap<ViewId, usize> = harmonized
            .iter()
            .enumerate()
            .map(|(k, v)| (*v, k))
            .collect();
        let used: Vec<&PairOutcome> = used
            .into_iter()
            .filter(|o| index.contains_key(&o.pair.0) && index.contains_key(&o.pair.1))
            .collect();

        let solver = GlobalSolver::from_params(&config.params);
        let mut transforms = vec![ColorTransform::default(); harmonized.len()];
        let mut channels = Vec::with_capacity(3);

        for channel in Channel::ALL {
            let constraints: Vec<PairConstraint> = used
                .iter()
                .filter_map(|o| {
                    let (hist_i, hist_j) = o.histograms.as_ref()?;
                    PairConstraint::from_histograms(
                        index[&o.pair.0],
                        index[&o.pair.1],
                        &hist_i.channels[channel.index()],
                        &hist_j.channels[channel.index()],
                        config.params.quantile_count,
                    )
                })
                .collect();

            let solution =
                solver.solve(channel, harmonized.len(), index[&reference], &constraints)?;
            for (transform, gain_offset) in transforms.iter_mut().zip(&solution.transforms) {
                *transform.channel_mut(channel) = *gain_offset;
            }
            tracing::info!(
                %channel,
                max_residual = solution.max_residual,
                iterations = solution.iterations,
                "channel harmonized"
            );
            channels.push(ChannelReport {
                channel,
                max_residual: solution.max_residual,
                iterations: solution.iterations,
            });
        }

        std::fs::create_dir_all(&config.output_dir)
            .map_err(|e| HarmonizeError::io(&config.output_dir, e))?;

        let converter = ColorConverter::new();
        let reference_lab = converter.mean_lab(&images[&reference]);

        let views = harmonized
            .iter()
            .zip(&transforms)
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(view_id, transform)| -> Result<ViewReport> {
                let view = sfm.view(*view_id).ok_or_else(|| HarmonizeError::SceneError {
                    reason: format!("view {} vanished from the scene", view_id),
                })?;
                let mut image = images[view_id].clone();
                let delta_e_before = converter.delta_e(converter.mean_lab(&image), reference_lab);
                transform.apply(&mut image);
                let delta_e_after = converter.delta_e(converter.mean_lab(&image), reference_lab);

                let path = output_path(&view.path, &config.output_dir);
                save_image(&image, &path)?;
                tracing::debug!(
                    view = view_id,
                    path = %path.display(),
                    delta_e_before,
                    delta_e_after,
                    "view written"
                );

                Ok(ViewReport {
                    view_id: *view_id,
                    output_path: path,
                    transform: *transform,
                    delta_e_before,
                    delta_e_after,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let excluded_views = sfm
            .views()
            .map(|v| v.id)
            .filter(|id| !harmonized.contains(id))
            .collect::<Vec<_>>();
        if !excluded_views.is_empty() {
            tracing::warn!(
                count = excluded_views.len(),
                "views left out of harmonization"
            );
        }

        let report = HarmonizationReport {
            reference_view: reference,
            selection_method: method,
            geometric_model: config.geometric_model,
            describer_types: config.describer_types.clone(),
            pairs_used: used.iter().map(|o| o.pair).collect(),
            pairs_skipped,
            excluded_views,
            channels,
            views,
        };

        let report_path: PathBuf = config.output_dir.join(REPORT_FILE_NAME);
        report.to_json_file(&report_path)?;
        tracing::info!(path = %report_path.display(), views = report.views.len(), "report written");

        Ok(report)
    }

    /// Configured reference if it is in the component, else the best connected view
    fn resolve_reference(
        &self,
        graph: &MatchGraph,
        component: &BTreeSet<ViewId>,
    ) -> Result<ViewId> {
        match self.config.reference_view {
            Some(view_id) if component.contains(&view_id) => Ok(view_id),
            Some(view_id) => Err(HarmonizeError::InvalidReference { view_id }),
            None => {
                let view_id = graph.most_connected(component).ok_or_else(|| {
                    HarmonizeError::SceneError {
                        reason: "empty component".into(),
                    }
                })?;
                tracing::info!(
                    view_id,
                    degree = graph.degree(view_id),
                    "reference view chosen"
                );
                Ok(view_id)
            }
        }
    }

    fn load_feature_table(&self, component: &BTreeSet<ViewId>) -> Result<FeatureTable> {
        let keys: Vec<(ViewId, DescriberType)> = component
            .iter()
            .flat_map(|v| self.config.describer_types.iter().map(move |d| (*v, *d)))
            .collect();

        keys.into_par_iter()
            .map(|(view, describer)| -> Result<((ViewId, DescriberType), Vec<Feature>)> {
                let features = load_features(&self.config.matches_dir, view, describer)?;
                Ok(((view, describer), features))
            })
            .collect()
    }
}

/// Decode every view of the component
fn load_images(sfm: &SfmData, component: &BTreeSet<ViewId>) -> Result<HashMap<ViewId, RgbImage>> {
    component
        .iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|view_id| -> Result<(ViewId, RgbImage)> {
            let view = sfm.view(*view_id).ok_or_else(|| HarmonizeError::SceneError {
                reason: format!("view {} missing from SfM data", view_id),
            })?;
            let image = load_image(&view.path)?;
            if let (Some(w), Some(h)) = (view.width, view.height) {
                if image.dimensions() != (w, h) {
                    tracing::warn!(
                        view = view_id,
                        declared = ?(w, h),
                        actual = ?image.dimensions(),
                        "image size differs from SfM data"
                    );
                }
            }
            Ok((*view_id, image))
        })
        .collect()
}

/// Feature positions of every match of a pair
fn resolve_points(
    pair: Pair,
    describer_matches: &DescriberMatches,
    features: &FeatureTable,
    method: SelectionMethod,
) -> Result<Vec<(Feature, Feature)>> {
    if !method.needs_features() {
        return Ok(Vec::new());
    }

    let mut points = Vec::new();
    for (describer, matches) in describer_matches {
        let lookup = |view: ViewId| {
            features.get(&(view, *describer)).ok_or_else(|| HarmonizeError::SceneError {
                reason: format!("no {} features loaded for view {}", describer, view),
            })
        };
        let (feats_i, feats_j) = (lookup(pair.0)?, lookup(pair.1)?);

        for m in matches {
            match (feats_i.get(m.i), feats_j.get(m.j)) {
                (Some(fi), Some(fj)) => points.push((*fi, *fj)),
                _ => {
                    return Err(HarmonizeError::SceneError {
                        reason: format!(
                            "{} match ({}, {}) of pair ({}, {}) is out of range ({} / {} features)",
                            describer,
                            m.i,
                            m.j,
                            pair.0,
                            pair.1,
                            feats_i.len(),
                            feats_j.len()
                        ),
                    })
                }
            }
        }
    }
    Ok(points)
}
