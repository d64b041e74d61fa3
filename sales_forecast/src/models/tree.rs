//! Regression trees fitted to gradients
//!
//! Trees are grown depth first on squared-error gradients with L2
//! regularised leaf weights. Missing feature values (NaN) follow a default
//! branch learned per split.

/// Node of a fitted tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        default_left: bool,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree, stored as a flat node arena rooted at index 0
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Walk the tree; `feature(i)` returns the i-th input
    pub fn predict_by<F>(&self, feature: F) -> f64
    where
        F: Fn(usize) -> f64,
    {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature: f,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let value = feature(*f);
                    let go_left = if value.is_nan() {
                        *default_left
                    } else {
                        value < *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }

    /// Predict one row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.predict_by(|f| row.get(f).copied().unwrap_or(f64::NAN))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Features used by at least one split
    pub fn split_features(&self) -> Vec<usize> {
        let mut features: Vec<usize> = self
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .collect();
        features.sort_unstable();
        features.dedup();
        features
    }
}

/// Growth limits of a single tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub lambda: f64,
    pub min_child_weight: f64,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    default_left: bool,
    gain: f64,
}

/// Grows one tree over column-major features
pub(crate) struct TreeBuilder<'a> {
    columns: &'a [Vec<f64>],
    gradients: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
}

const MIN_GAIN: f64 = 1e-12;

impl<'a> TreeBuilder<'a> {
    pub fn new(columns: &'a [Vec<f64>], gradients: &'a [f64], params: TreeParams) -> Self {
        Self {
            columns,
            gradients,
            params,
            nodes: Vec::new(),
        }
    }

    /// Grow a tree on the given sample rows
    pub fn build(mut self, rows: Vec<usize>) -> RegressionTree {
        self.grow(rows, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -self.params.learning_rate * g / (h + self.params.lambda)
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&r| self.gradients[r]).sum();
        // squared loss: unit hessian per row
        let h = rows.len() as f64;
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            weight: self.leaf_weight(g, h),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }

        let split = match self.best_split(&rows, g, h) {
            Some(split) => split,
            None => return idx,
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows.into_iter().partition(|&r| {
            let value = self.columns[split.feature][r];
            if value.is_nan() {
                split.default_left
            } else {
                value < split.threshold
            }
        });

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            default_left: split.default_left,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let parent = self.score(g, h);
        let min_child = self.params.min_child_weight;
        let mut best: Option<SplitCandidate> = None;

        for (feature, column) in self.columns.iter().enumerate() {
            let mut present: Vec<(f64, usize)> = rows
                .iter()
                .filter(|&&r| !column[r].is_nan())
                .map(|&r| (column[r], r))
                .collect();
            if present.len() < 2 {
                continue;
            }
            present.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let g_present: f64 = present.iter().map(|&(_, r)| self.gradients[r]).sum();
            let g_missing = g - g_present;
            let h_missing = h - present.len() as f64;
            let directions: &[bool] = if h_missing > 0.0 { &[true, false] } else { &[true] };

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for i in 0..present.len() - 1 {
                let (value, row) = present[i];
                g_left += self.gradients[row];
                h_left += 1.0;

                let next = present[i + 1].0;
                if next <= value {
                    continue;
                }

                for &default_left in directions {
                    let (gl, hl) = if default_left {
                        (g_left + g_missing, h_left + h_missing)
                    } else {
                        (g_left, h_left)
                    };
                    let (gr, hr) = (g - gl, h - hl);
                    if hl < min_child || hr < min_child {
                        continue;
                    }

                    let gain = self.score(gl, hl) + self.score(gr, hr) - parent;
                    if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                        best = Some(SplitCandidate {
                            feature,
                            threshold: value + (next - value) / 2.0,
                            default_left,
                            gain,
                        });
                    }
                }
            }
        }

        best
    }
}
