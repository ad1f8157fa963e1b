//! Isolation-forest outlier detection.
//!
//! Each tree recursively splits a random subsample on a random feature at a
//! random threshold. Outliers are isolated in fewer splits, so a short
//! average path length means a high anomaly score. Rows whose score falls in
//! the top `contamination` share of the dataset are flagged.

use super::patterns::NumericProjection;
use super::types::{AnomalyReport, DegradedReason};
use ndarray::{Array2, ArrayView1};
use rand::Rng as _;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::index::sample;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Uniform point in `[min, max)`. Interpolates so that spans wider than
/// `f64::MAX` still yield a finite threshold.
fn split_point(min: f64, max: f64, rng: &mut StdRng) -> f64 {
    let t: f64 = rng.r#gen();
    let threshold = min * (1.0 - t) + max * t;
    threshold.clamp(min, max)
}

fn build_tree(
    data: &Array2<f64>,
    rows: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    // Only features that still vary within this node can split it.
    let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
        .filter_map(|feature| {
            let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &r| {
                let v = data[[r, feature]];
                (acc.0.min(v), acc.1.max(v))
            });
            (max > min).then_some((feature, min, max))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = split_point(min, max, rng);

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.iter().copied().partition(|&r| data[[r, feature]] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(data, &left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(data, &right_rows, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, row: ArrayView1<'_, f64>, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// A fitted forest over one matrix.
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    subsample_size: usize,
}

impl IsolationForest {
    pub fn fit(data: &Array2<f64>, params: &ForestParams) -> Self {
        let n = data.nrows();
        if n == 0 {
            return Self {
                trees: Vec::new(),
                subsample_size: 0,
            };
        }
        let subsample_size = params.max_samples.min(n).max(1);
        let max_depth = (subsample_size as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_trees)
            .map(|_| {
                let rows = sample(&mut rng, n, subsample_size).into_vec();
                build_tree(data, &rows, 0, max_depth, &mut rng)
            })
            .collect();

        Self {
            trees,
            subsample_size,
        }
    }

    /// Anomaly score in (0, 1]; higher is more anomalous.
    pub fn score_samples(&self, data: &Array2<f64>) -> Vec<f64> {
        let normaliser = average_path_length(self.subsample_size).max(f64::EPSILON);
        let n_trees = self.trees.len().max(1) as f64;

        data.outer_iter()
            .map(|row| {
                let mean_path = self
                    .trees
                    .iter()
                    .map(|tree| path_length(tree, row, 0))
                    .sum::<f64>()
                    / n_trees;
                2f64.powf(-mean_path / normaliser)
            })
            .collect()
    }
}

/// Linear-interpolated percentile of already sorted values.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Flags for each score: `true` when the score lies strictly above the
/// `(1 - contamination)` percentile.
pub fn flag_outliers(scores: &[f64], contamination: f64) -> Vec<bool> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let cutoff = percentile(&sorted, 100.0 * (1.0 - contamination));
    scores.iter().map(|s| *s > cutoff).collect()
}

/// Run detection over a projection. Requires more than `min_rows` rows.
pub fn detect_anomalies(
    projection: &NumericProjection,
    params: &ForestParams,
    min_rows: usize,
) -> Result<AnomalyReport, DegradedReason> {
    let n = projection.n_rows();
    if n <= min_rows {
        return Err(DegradedReason::InsufficientRows {
            required: min_rows,
            actual: n,
        });
    }
    if !(0.0..=0.5).contains(&params.contamination) {
        return Err(DegradedReason::failed(format!(
            "contamination {} outside [0, 0.5]",
            params.contamination
        )));
    }

    let forest = IsolationForest::fit(&projection.records, params);
    let scores = forest.score_samples(&projection.records);
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(DegradedReason::failed("non-finite anomaly score"));
    }

    let anomaly_count = flag_outliers(&scores, params.contamination)
        .into_iter()
        .filter(|flagged| *flagged)
        .count();

    Ok(AnomalyReport {
        anomaly_count,
        anomaly_percentage: anomaly_count as f64 / n as f64 * 100.0,
    })
}
