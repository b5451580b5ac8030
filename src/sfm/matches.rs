//! Pairwise matches files
//!
//! A matches file holds one block per image pair:
//!
//! ```text
//! I J
//! <number of describer blocks>
//! <describer name> <number of matches>
//! <feature index in I> <feature index in J>
//! ...
//! ```
//!
//! Pairs are normalized so the smaller view id comes first.

use crate::config::{DescriberType, GeometricModel};
use crate::error::{HarmonizeError, Result};
use crate::sfm::{SfmData, ViewId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Ordered image pair with `0 < 1`
pub type Pair = (ViewId, ViewId);

/// Correspondence between feature indices of the two views of a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndMatch {
    pub i: usize,
    pub j: usize,
}

/// Matches of one pair grouped by describer type
pub type DescriberMatches = BTreeMap<DescriberType, Vec<IndMatch>>;

/// All pairwise matches of a scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairwiseMatches {
    pairs: BTreeMap<Pair, DescriberMatches>,
}

impl PairwiseMatches {
    /// Add matches for a pair, swapping indices if `a > b`
    pub fn insert(
        &mut self,
        a: ViewId,
        b: ViewId,
        describer: DescriberType,
        matches: Vec<IndMatch>,
    ) {
        let (pair, matches) = if a <= b {
            ((a, b), matches)
        } else {
            (
                (b, a),
                matches.into_iter().map(|m| IndMatch { i: m.j, j: m.i }).collect(),
            )
        };
        self.pairs
            .entry(pair)
            .or_default()
            .entry(describer)
            .or_default()
            .extend(matches);
    }

    /// Matches of a pair, if any
    pub fn get(&self, pair: &Pair) -> Option<&DescriberMatches> {
        self.pairs.get(pair)
    }

    /// Pairs in ascending order
    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pair, &DescriberMatches)> {
        self.pairs.iter()
    }

    /// Total number of correspondences of a pair over all describers
    pub fn match_count(&self, pair: &Pair) -> usize {
        self.pairs
            .get(pair)
            .map(|d| d.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Keep only pairs whose two views satisfy `keep`
    pub fn retain_views(&mut self, mut keep: impl FnMut(ViewId) -> bool) {
        self.pairs.retain(|(a, b), _| keep(*a) && keep(*b));
    }

    /// Drop pairs that ended up with no correspondence
    pub fn remove_empty(&mut self) {
        self.pairs
            .retain(|_, describers| describers.values().any(|m| !m.is_empty()));
    }

    /// Fail if a pair references a view missing from the scene
    pub fn check_views(&self, sfm: &SfmData) -> Result<()> {
        for (a, b) in self.pairs.keys() {
            for id in [a, b] {
                if !sfm.contains(*id) {
                    return Err(HarmonizeError::SceneError {
                        reason: format!("matches reference unknown view {}", id),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Path of the matches file for a geometric model
pub fn matches_file_path(dir: &Path, model: GeometricModel) -> PathBuf {
    dir.join(model.matches_file_name())
}

/// Load the matches file of `model`, keeping only the `describers` blocks
pub fn load_matches(
    dir: &Path,
    model: GeometricModel,
    describers: &[DescriberType],
) -> Result<PairwiseMatches> {
    let path = matches_file_path(dir, model);
    let content = std::fs::read_to_string(&path).map_err(|e| HarmonizeError::io(&path, e))?;
    parse_matches(&content, &path, describers)
}

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    path: &'a Path,
    line: usize,
}

impl<'a> Lines<'a> {
    fn next_tokens(&mut self) -> Option<Vec<&'a str>> {
        for (index, line) in self.inner.by_ref() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if !tokens.is_empty() {
                self.line = index + 1;
                return Some(tokens);
            }
        }
        None
    }

    fn expect_tokens(&mut self, what: &str) -> Result<Vec<&'a str>> {
        self.next_tokens().ok_or_else(|| HarmonizeError::ParseError {
            path: self.path.to_path_buf(),
            line: self.line + 1,
            reason: format!("unexpected end of file, expected {}", what),
        })
    }

    fn error(&self, reason: impl Into<String>) -> HarmonizeError {
        HarmonizeError::ParseError {
            path: self.path.to_path_buf(),
            line: self.line,
            reason: reason.into(),
        }
    }

    fn number<T: std::str::FromStr>(&self, token: &str, what: &str) -> Result<T> {
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {} '{}'", what, token)))
    }
}

/// Parse a matches file; `path` is only used in error messages
pub fn parse_matches(
    content: &str,
    path: &Path,
    describers: &[DescriberType],
) -> Result<PairwiseMatches> {
    let mut lines = Lines {
        inner: content.lines().enumerate(),
        path,
        line: 0,
    };
    let mut result = PairwiseMatches::default();

    while let Some(tokens) = lines.next_tokens() {
        let (a, b) = match tokens.as_slice() {
            [a, b] => (
                lines.number::<ViewId>(a, "view id")?,
                lines.number::<ViewId>(b, "view id")?,
            ),
            _ => return Err(lines.error("expected a view id pair")),
        };
        if a == b {
            return Err(lines.error(format!("pair matches view {} with itself", a)));
        }

        let tokens = lines.expect_tokens("describer block count")?;
        let block_count: usize = match tokens.as_slice() {
            [count] => lines.number(count, "describer block count")?,
            _ => return Err(lines.error("expected a describer block count")),
        };

        for _ in 0..block_count {
            let tokens = lines.expect_tokens("describer header")?;
            let (name, count) = match tokens.as_slice() {
                [name, count] => (*name, lines.number::<usize>(count, "match count")?),
                _ => return Err(lines.error("expected '<describer> <count>'")),
            };
            let describer = name
                .parse::<DescriberType>()
                .ok()
                .filter(|d| describers.contains(d));

            let mut matches = Vec::with_capacity(if describer.is_some() { count } else { 0 });
            for _ in 0..count {
                let tokens = lines.expect_tokens("feature index pair")?;
                match tokens.as_slice() {
                    [i, j] => {
                        if describer.is_some() {
                            matches.push(IndMatch {
                                i: lines.number(i, "feature index")?,
                                j: lines.number(j, "feature index")?,
                            });
                        }
                    }
                    _ => return Err(lines.error("expected two feature indices")),
                }
            }

            if let Some(describer) = describer {
                result.insert(a, b, describer, matches);
            }
        }
    }

    result.remove_empty();
    Ok(result)
}
