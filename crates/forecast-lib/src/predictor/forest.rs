//! Random forests of CART trees
//!
//! Each tree is grown on a bootstrap sample with histogram-based split
//! search: feature values are bucketed once per forest into at most
//! `max_bins` quantile bins, and every node scans bin histograms instead of
//! sorted values. Regression trees minimise squared error and store the leaf
//! mean; classification trees minimise Gini impurity and store the leaf class
//! distribution. Trees are grown in parallel, each from a seed derived from
//! the forest seed, so a fixed training set always yields the same forest.

use crate::error::TrainingError;
use crate::models::{FeatureRow, FEATURE_COUNT};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    Sqrt,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt() as usize).max(1),
        }
    }
}

/// Forest hyperparameters
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Upper bound on histogram bins per feature (2..=256)
    pub max_bins: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 15,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            max_bins: 64,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn regression() -> Self {
        Self::default()
    }

    pub fn classification() -> Self {
        Self {
            max_features: MaxFeatures::Sqrt,
            ..Self::default()
        }
    }
}

/// Quantile bin edges per feature
#[derive(Debug, Clone)]
struct Binner {
    edges: Vec<Vec<f64>>,
}

impl Binner {
    fn fit(rows: &[FeatureRow], max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, 256);
        let edges = (0..FEATURE_COUNT)
            .map(|f| {
                let mut values: Vec<f64> = rows.iter().map(|r| r[f]).collect();
                values.sort_by(f64::total_cmp);
                let mut unique = values.clone();
                unique.dedup();

                if unique.len() <= max_bins {
                    unique.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
                } else {
                    let n = values.len();
                    let mut cuts: Vec<f64> =
                        (1..max_bins).map(|q| values[q * n / max_bins]).collect();
                    cuts.dedup();
                    cuts
                }
            })
            .collect();
        Self { edges }
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.edges[feature].len() + 1
    }

    /// Bin index such that `value <= edges[k]` iff `bin <= k`
    fn bin(&self, feature: usize, value: f64) -> u8 {
        self.edges[feature].partition_point(|&e| e < value) as u8
    }

    /// Column-major binned copy of `rows`
    fn transform(&self, rows: &[FeatureRow]) -> Vec<Vec<u8>> {
        (0..FEATURE_COUNT)
            .map(|f| rows.iter().map(|r| self.bin(f, r[f])).collect())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Continuous(&'a [f64]),
    Classes { labels: &'a [usize], n_classes: usize },
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(Box<[f64]>),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_for(&self, row: &FeatureRow) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct BestSplit {
    feature: usize,
    bin: usize,
    score: f64,
}

struct TreeBuilder<'a> {
    binned: &'a [Vec<u8>],
    binner: &'a Binner,
    target: Target<'a>,
    params: &'a ForestParams,
    features_per_split: usize,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn grow(&mut self, indices: &mut [u32], depth: usize, rng: &mut StdRng) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf(Box::default()));

        let split = if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split.max(2)
            || self.is_pure(indices)
        {
            None
        } else {
            self.best_split(indices, rng)
        };

        match split {
            None => self.nodes[id] = Node::Leaf(self.leaf_value(indices)),
            Some(best) => {
                let column = &self.binned[best.feature];
                let mut boundary = 0;
                for j in 0..indices.len() {
                    if column[indices[j] as usize] as usize <= best.bin {
                        indices.swap(boundary, j);
                        boundary += 1;
                    }
                }
                let (left_idx, right_idx) = indices.split_at_mut(boundary);
                let left = self.grow(left_idx, depth + 1, rng);
                let right = self.grow(right_idx, depth + 1, rng);
                self.nodes[id] = Node::Split {
                    feature: best.feature,
                    threshold: self.binner.edges[best.feature][best.bin],
                    left,
                    right,
                };
            }
        }
        id
    }

    fn is_pure(&self, indices: &[u32]) -> bool {
        match self.target {
            Target::Continuous(y) => {
                let first = y[indices[0] as usize];
                indices.iter().all(|&i| (y[i as usize] - first).abs() < 1e-12)
            }
            Target::Classes { labels, .. } => {
                let first = labels[indices[0] as usize];
                indices.iter().all(|&i| labels[i as usize] == first)
            }
        }
    }

    fn leaf_value(&self, indices: &[u32]) -> Box<[f64]> {
        let n = indices.len().max(1) as f64;
        match self.target {
            Target::Continuous(y) => {
                let sum: f64 = indices.iter().map(|&i| y[i as usize]).sum();
                vec![sum / n].into_boxed_slice()
            }
            Target::Classes { labels, n_classes } => {
                let mut dist = vec![0.0; n_classes];
                for &i in indices {
                    dist[labels[i as usize]] += 1.0;
                }
                dist.iter_mut().for_each(|c| *c /= n);
                dist.into_boxed_slice()
            }
        }
    }

    /// Best (feature, bin) among a random feature subset, if it lowers impurity
    fn best_split(&self, indices: &[u32], rng: &mut StdRng) -> Option<BestSplit> {
        let min_leaf = self.params.min_samples_leaf.max(1) as f64;
        let parent = self.parent_score(indices);
        let mut best: Option<BestSplit> = None;

        for feature in sample(rng, FEATURE_COUNT, self.features_per_split).iter() {
            let n_bins = self.binner.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let column = &self.binned[feature];

            let candidate = match self.target {
                Target::Continuous(y) => {
                    let mut counts = vec![0.0; n_bins];
                    let mut sums = vec![0.0; n_bins];
                    for &i in indices {
                        let b = column[i as usize] as usize;
                        counts[b] += 1.0;
                        sums[b] += y[i as usize];
                    }
                    let total_n: f64 = counts.iter().sum();
                    let total_s: f64 = sums.iter().sum();

                    let (mut n_left, mut s_left) = (0.0, 0.0);
                    let mut local: Option<(usize, f64)> = None;
                    for k in 0..n_bins - 1 {
                        n_left += counts[k];
                        s_left += sums[k];
                        let n_right = total_n - n_left;
                        if n_left < min_leaf || n_right < min_leaf {
                            continue;
                        }
                        let s_right = total_s - s_left;
                        let score = s_left * s_left / n_left + s_right * s_right / n_right;
                        if local.map_or(true, |(_, s)| score > s) {
                            local = Some((k, score));
                        }
                    }
                    local
                }
                Target::Classes { labels, n_classes } => {
                    let mut hist = vec![0.0; n_bins * n_classes];
                    for &i in indices {
                        let b = column[i as usize] as usize;
                        hist[b * n_classes + labels[i as usize]] += 1.0;
                    }
                    let mut totals = vec![0.0; n_classes];
                    for b in 0..n_bins {
                        for c in 0..n_classes {
                            totals[c] += hist[b * n_classes + c];
                        }
                    }
                    let total_n: f64 = totals.iter().sum();

                    let mut left = vec![0.0; n_classes];
                    let mut n_left = 0.0;
                    let mut local: Option<(usize, f64)> = None;
                    for k in 0..n_bins - 1 {
                        for c in 0..n_classes {
                            left[c] += hist[k * n_classes + c];
                        }
                        n_left += hist[k * n_classes..(k + 1) * n_classes].iter().sum::<f64>();
                        let n_right = total_n - n_left;
                        if n_left < min_leaf || n_right < min_leaf {
                            continue;
                        }
                        let sq_left: f64 = left.iter().map(|c| c * c).sum();
                        let sq_right: f64 = left
                            .iter()
                            .zip(totals.iter())
                            .map(|(l, t)| (t - l) * (t - l))
                            .sum();
                        let score = sq_left / n_left + sq_right / n_right;
                        if local.map_or(true, |(_, s)| score > s) {
                            local = Some((k, score));
                        }
                    }
                    local
                }
            };

            if let Some((bin, score)) = candidate {
                if best.as_ref().map_or(true, |b| score > b.score) {
                    best = Some(BestSplit {
                        feature,
                        bin,
                        score,
                    });
                }
            }
        }

        best.filter(|b| b.score > parent + 1e-9 * parent.abs().max(1.0))
    }

    /// Split score of leaving the node whole; a split must beat this
    fn parent_score(&self, indices: &[u32]) -> f64 {
        let n = indices.len() as f64;
        match self.target {
            Target::Continuous(y) => {
                let s: f64 = indices.iter().map(|&i| y[i as usize]).sum();
                s * s / n
            }
            Target::Classes { labels, n_classes } => {
                let mut counts = vec![0.0; n_classes];
                for &i in indices {
                    counts[labels[i as usize]] += 1.0;
                }
                counts.iter().map(|c| c * c).sum::<f64>() / n
            }
        }
    }
}

fn fit_trees(
    rows: &[FeatureRow],
    target: Target<'_>,
    params: &ForestParams,
) -> Result<Vec<DecisionTree>, TrainingError> {
    if rows.is_empty() || params.n_trees == 0 {
        return Err(TrainingError::EmptyTrainingSet);
    }

    let binner = Binner::fit(rows, params.max_bins);
    let binned = binner.transform(rows);
    let features_per_split = params.max_features.resolve(FEATURE_COUNT);
    let n = rows.len();

    let mut seeder = StdRng::seed_from_u64(params.seed);
    let seeds: Vec<u64> = (0..params.n_trees).map(|_| seeder.gen()).collect();

    let trees = seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut indices: Vec<u32> = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n) as u32).collect()
            } else {
                (0..n as u32).collect()
            };
            let mut builder = TreeBuilder {
                binned: &binned,
                binner: &binner,
                target,
                params,
                features_per_split,
                nodes: Vec::new(),
            };
            builder.grow(&mut indices, 0, &mut rng);
            DecisionTree {
                nodes: builder.nodes,
            }
        })
        .collect();
    Ok(trees)
}

/// Averaging forest of regression trees
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTree>,
}

impl RandomForestRegressor {
    pub fn fit(rows: &[FeatureRow], y: &[f64], params: &ForestParams) -> Result<Self, TrainingError> {
        if rows.len() != y.len() {
            return Err(TrainingError::LengthMismatch {
                rows: rows.len(),
                targets: y.len(),
            });
        }
        if let Some(row) = y.iter().position(|v| !v.is_finite()) {
            return Err(TrainingError::NonFiniteTarget { row });
        }
        let trees = fit_trees(rows, Target::Continuous(y), params)?;
        Ok(Self { trees })
    }

    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.leaf_for(row)[0]).sum();
        sum / self.trees.len() as f64
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

/// Voting forest of classification trees
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForestClassifier {
    /// Fit on class indices in `0..n_classes`
    pub fn fit(
        rows: &[FeatureRow],
        labels: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self, TrainingError> {
        if rows.len() != labels.len() {
            return Err(TrainingError::LengthMismatch {
                rows: rows.len(),
                targets: labels.len(),
            });
        }
        if let Some(&label) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(TrainingError::LabelOutOfRange { label, n_classes });
        }
        let trees = fit_trees(rows, Target::Classes { labels, n_classes }, params)?;
        Ok(Self { trees, n_classes })
    }

    /// Mean of the trees' leaf class distributions
    pub fn predict_proba(&self, row: &FeatureRow) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, v) in proba.iter_mut().zip(tree.leaf_for(row)) {
                *p += v;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    /// Most probable class and its probability
    pub fn predict(&self, row: &FeatureRow) -> (usize, f64) {
        self.predict_proba(row)
            .into_iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (c, p)| if p > best.1 { (c, p) } else { best })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(x0: f64, x1: f64) -> FeatureRow {
        let mut r = [0.0; FEATURE_COUNT];
        r[0] = x0;
        r[1] = x1;
        r
    }

    fn small_params(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            max_depth: 6,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_binner_threshold_semantics() {
        let rows: Vec<_> = (0..10).map(|i| row(i as f64, 0.0)).collect();
        let binner = Binner::fit(&rows, 64);
        // Few unique values: midpoints between neighbours
        assert_eq!(binner.edges[0].len(), 9);
        assert_eq!(binner.edges[0][0], 0.5);
        // Constant feature has a single bin
        assert_eq!(binner.n_bins(1), 1);
        for v in [0.0, 0.5, 0.7, 4.0, 9.0] {
            let b = binner.bin(0, v) as usize;
            for (k, edge) in binner.edges[0].iter().enumerate() {
                assert_eq!(v <= *edge, b <= k);
            }
        }
    }

    #[test]
    fn test_binner_caps_bins() {
        let rows: Vec<_> = (0..1000).map(|i| row(i as f64 * 0.37, 0.0)).collect();
        let binner = Binner::fit(&rows, 16);
        assert!(binner.n_bins(0) <= 16);
    }

    #[test]
    fn test_regressor_learns_step_function() {
        let rows: Vec<_> = (0..200).map(|i| row(i as f64, (i % 7) as f64)).collect();
        let y: Vec<f64> = (0..200).map(|i| if i < 100 { 5.0 } else { 15.0 }).collect();
        let forest = RandomForestRegressor::fit(&rows, &y, &small_params(10)).unwrap();
        assert!((forest.predict(&row(20.0, 3.0)) - 5.0).abs() < 1.0);
        assert!((forest.predict(&row(180.0, 3.0)) - 15.0).abs() < 1.0);
    }

    #[test]
    fn test_classifier_probabilities_sum_to_one() {
        let rows: Vec<_> = (0..300).map(|i| row((i % 30) as f64, (i / 30) as f64)).collect();
        let labels: Vec<usize> = (0..300).map(|i| (i % 30) / 10).collect();
        let forest = RandomForestClassifier::fit(&rows, &labels, 3, &small_params(15)).unwrap();

        let proba = forest.predict_proba(&row(25.0, 4.0));
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let (class, confidence) = forest.predict(&row(25.0, 4.0));
        assert_eq!(class, 2);
        assert!(confidence > 0.5);
    }

    #[test]
    fn test_max_depth_is_respected() {
        let rows: Vec<_> = (0..500).map(|i| row(i as f64, (i * 31 % 17) as f64)).collect();
        let y: Vec<f64> = (0..500).map(|i| ((i * 13) % 11) as f64).collect();
        let params = ForestParams {
            n_trees: 3,
            max_depth: 4,
            ..ForestParams::default()
        };
        let forest = RandomForestRegressor::fit(&rows, &y, &params).unwrap();
        assert!(forest.trees().iter().all(|t| t.depth() <= 4));
    }

    #[test]
    fn test_fixed_seed_gives_identical_structure() {
        let rows: Vec<_> = (0..150).map(|i| row(i as f64, (i % 5) as f64)).collect();
        let y: Vec<f64> = (0..150).map(|i| (i as f64).sin()).collect();
        let a = RandomForestRegressor::fit(&rows, &y, &small_params(5)).unwrap();
        let b = RandomForestRegressor::fit(&rows, &y, &small_params(5)).unwrap();
        let probe = row(42.0, 2.0);
        assert_eq!(a.predict(&probe), b.predict(&probe));
        let counts = |f: &RandomForestRegressor| f.trees().iter().map(DecisionTree::node_count).collect::<Vec<_>>();
        assert_eq!(counts(&a), counts(&b));
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let params = small_params(2);
        assert_eq!(
            RandomForestRegressor::fit(&[], &[], &params).unwrap_err(),
            TrainingError::EmptyTrainingSet
        );
        assert_eq!(
            RandomForestRegressor::fit(&[row(1.0, 1.0)], &[1.0, 2.0], &params).unwrap_err(),
            TrainingError::LengthMismatch { rows: 1, targets: 2 }
        );
        assert_eq!(
            RandomForestRegressor::fit(&[row(1.0, 1.0)], &[f64::NAN], &params).unwrap_err(),
            TrainingError::NonFiniteTarget { row: 0 }
        );
        assert_eq!(
            RandomForestClassifier::fit(&[row(1.0, 1.0)], &[4], 3, &params).unwrap_err(),
            TrainingError::LabelOutOfRange { label: 4, n_classes: 3 }
        );
    }
}
