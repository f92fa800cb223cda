use anyhow::{bail, Context, Result};
use std::{collections::HashMap, fmt::Display, fs, path::Path, str::FromStr};

use crate::error::PredictError;
use crate::predictor::Classifier;

const CATEGORICAL_MASK: u8 = 1;
const DEFAULT_LEFT_MASK: u8 = 2;
const ZERO_THRESHOLD: f64 = 1e-35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

impl MissingType {
    fn from_decision(dt: u8) -> Self {
        match (dt >> 2) & 3 {
            1 => MissingType::Zero,
            2 => MissingType::NaN,
            _ => MissingType::None,
        }
    }
}

/// One regression tree in LightGBM's array layout: internal nodes are
/// indexed from 0, a negative child `c` points at leaf `!c`.
#[derive(Debug, Clone)]
struct Tree {
    split_feature: Vec<usize>,
    threshold: Vec<f64>,
    decision_type: Vec<u8>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_value: Vec<f64>,
    cat_boundaries: Vec<usize>,
    cat_threshold: Vec<u32>,
}

impl Tree {
    fn predict(&self, x: &[f64]) -> f64 {
        if self.split_feature.is_empty() {
            return self.leaf_value[0];
        }
        let mut node = 0i32;
        while node >= 0 {
            node = self.next_node(node as usize, x);
        }
        self.leaf_value[!node as usize]
    }

    fn next_node(&self, node: usize, x: &[f64]) -> i32 {
        let fval = x[self.split_feature[node]];
        if self.decision_type[node] & CATEGORICAL_MASK != 0 {
            self.categorical_decision(fval, node)
        } else {
            self.numerical_decision(fval, node)
        }
    }

    fn numerical_decision(&self, mut fval: f64, node: usize) -> i32 {
        let dt = self.decision_type[node];
        let missing = MissingType::from_decision(dt);
        if fval.is_nan() && missing != MissingType::NaN {
            fval = 0.0;
        }
        let is_missing = match missing {
            MissingType::Zero => fval >= -ZERO_THRESHOLD && fval <= ZERO_THRESHOLD,
            MissingType::NaN => fval.is_nan(),
            MissingType::None => false,
        };
        if is_missing {
            return if dt & DEFAULT_LEFT_MASK != 0 {
                self.left_child[node]
            } else {
                self.right_child[node]
            };
        }
        if fval <= self.threshold[node] {
            self.left_child[node]
        } else {
            self.right_child[node]
        }
    }

    fn categorical_decision(&self, fval: f64, node: usize) -> i32 {
        if fval.is_nan() || fval < 0.0 {
            return self.right_child[node];
        }
        let cat = fval as u32;
        let idx = self.threshold[node] as usize;
        let bits = &self.cat_threshold[self.cat_boundaries[idx]..self.cat_boundaries[idx + 1]];
        let word = (cat / 32) as usize;
        if word < bits.len() && (bits[word] >> (cat % 32)) & 1 == 1 {
            self.left_child[node]
        } else {
            self.right_child[node]
        }
    }
}

/// A binary LightGBM booster loaded from its text dump.
#[derive(Debug, Clone)]
pub struct Booster {
    trees: Vec<Tree>,
    num_features: usize,
    feature_names: Vec<String>,
    sigmoid: f64,
    average_output: bool,
    pandas_categorical: Option<Vec<Vec<serde_json::Value>>>,
}

impl Booster {
    pub fn load(model_path: &Path) -> Result<Self> {
        let text = fs::read_to_string(model_path)
            .with_context(|| format!("failed to read model at {}", model_path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("failed to parse LightGBM model {}", model_path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().peekable();
        let mut header: HashMap<&str, &str> = HashMap::new();
        let mut average_output = false;

        while let Some(&line) = lines.peek() {
            let line = line.trim();
            if line.starts_with("Tree=") || line == "end of trees" {
                break;
            }
            if line == "average_output" {
                average_output = true;
            } else if let Some((k, v)) = line.split_once('=') {
                header.insert(k.trim(), v.trim());
            }
            lines.next();
        }

        let num_class: usize = parse_scalar(&header, "num_class").unwrap_or(Ok(1))?;
        let per_iter: usize =
            parse_scalar(&header, "num_tree_per_iteration").unwrap_or(Ok(1))?;
        if num_class != 1 || per_iter != 1 {
            bail!("only binary models are supported (num_class={num_class}, num_tree_per_iteration={per_iter})");
        }
        let max_feature_idx: usize = parse_scalar(&header, "max_feature_idx")
            .context("model header lacks max_feature_idx")??;
        let num_features = max_feature_idx + 1;
        let feature_names: Vec<String> = header
            .get("feature_names")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let sigmoid = parse_objective(header.get("objective").copied())?;

        let mut trees = Vec::new();
        let mut block: Option<HashMap<&str, &str>> = None;
        let mut pandas_categorical = None;
        for line in lines {
            let line = line.trim();
            if line.starts_with("Tree=") || line == "end of trees" {
                if let Some(b) = block.take() {
                    let idx = trees.len();
                    trees.push(parse_tree(&b, num_features).with_context(|| format!("tree {idx}"))?);
                }
                if line.starts_with("Tree=") {
                    block = Some(HashMap::new());
                }
            } else if let Some(rest) = line.strip_prefix("pandas_categorical:") {
                pandas_categorical = serde_json::from_str(rest.trim())
                    .context("malformed pandas_categorical line")?;
            } else if let Some(b) = block.as_mut() {
                if let Some((k, v)) = line.split_once('=') {
                    b.insert(k.trim(), v.trim());
                }
            }
        }
        if let Some(b) = block.take() {
            let idx = trees.len();
            trees.push(parse_tree(&b, num_features).with_context(|| format!("tree {idx}"))?);
        }
        if trees.is_empty() {
            bail!("model contains no trees");
        }

        Ok(Self {
            trees,
            num_features,
            feature_names,
            sigmoid,
            average_output,
            pandas_categorical,
        })
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Training-time category lists, one per categorical column in column order.
    pub fn pandas_categorical(&self) -> Option<&[Vec<serde_json::Value>]> {
        self.pandas_categorical.as_deref()
    }

    pub fn predict_raw(&self, x: &[f64]) -> Result<f64, PredictError> {
        if x.len() != self.num_features {
            return Err(PredictError::WidthMismatch {
                got: x.len(),
                expected: self.num_features,
            });
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        if self.average_output {
            Ok(sum / self.trees.len() as f64)
        } else {
            Ok(sum)
        }
    }
}

impl Classifier for Booster {
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictError> {
        let raw = self.predict_raw(row)?;
        let p = 1.0 / (1.0 + (-self.sigmoid * raw).exp());
        Ok([1.0 - p, p])
    }

    fn predict(&self, row: &[f64]) -> Result<u8, PredictError> {
        let [p0, p1] = self.predict_proba(row)?;
        Ok(u8::from(p1 > p0))
    }
}

impl FromStr for Booster {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_objective(raw: Option<&str>) -> Result<f64> {
    let raw = raw.context("model header lacks objective")?;
    let mut parts = raw.split_whitespace();
    let name = parts.next().unwrap_or_default();
    match name {
        "binary" => {
            for p in parts {
                if let Some(v) = p.strip_prefix("sigmoid:") {
                    return v.parse().with_context(|| format!("bad sigmoid parameter {v:?}"));
                }
            }
            Ok(1.0)
        }
        "cross_entropy" | "xentropy" => Ok(1.0),
        other => bail!("unsupported objective {other:?}, expected a binary classifier"),
    }
}

fn parse_scalar<T>(map: &HashMap<&str, &str>, key: &str) -> Option<Result<T>>
where
    T: FromStr,
    T::Err: Display,
{
    map.get(key).map(|v| {
        v.parse::<T>()
            .map_err(|e| anyhow::anyhow!("bad {key}={v:?}: {e}"))
    })
}

fn parse_list<T>(map: &HashMap<&str, &str>, key: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = map.get(key).copied().unwrap_or("");
    raw.split_whitespace()
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| anyhow::anyhow!("bad {key} entry {v:?}: {e}"))
        })
        .collect()
}

fn parse_tree(block: &HashMap<&str, &str>, num_features: usize) -> Result<Tree> {
    let num_leaves: usize = parse_scalar(block, "num_leaves").context("missing num_leaves")??;
    if num_leaves == 0 {
        bail!("num_leaves must be positive");
    }
    if parse_scalar::<u8>(block, "is_linear").transpose()?.unwrap_or(0) != 0 {
        bail!("linear trees are not supported");
    }
    let num_cat: usize = parse_scalar(block, "num_cat").transpose()?.unwrap_or(0);

    let tree = Tree {
        split_feature: parse_list(block, "split_feature")?,
        threshold: parse_list(block, "threshold")?,
        decision_type: parse_list(block, "decision_type")?,
        left_child: parse_list(block, "left_child")?,
        right_child: parse_list(block, "right_child")?,
        leaf_value: parse_list(block, "leaf_value")?,
        cat_boundaries: if num_cat > 0 { parse_list(block, "cat_boundaries")? } else { Vec::new() },
        cat_threshold: if num_cat > 0 { parse_list(block, "cat_threshold")? } else { Vec::new() },
    };

    let internal = num_leaves - 1;
    if tree.leaf_value.len() != num_leaves {
        bail!("expected {num_leaves} leaf values, found {}", tree.leaf_value.len());
    }
    for (name, len) in [
        ("split_feature", tree.split_feature.len()),
        ("threshold", tree.threshold.len()),
        ("decision_type", tree.decision_type.len()),
        ("left_child", tree.left_child.len()),
        ("right_child", tree.right_child.len()),
    ] {
        if len != internal {
            bail!("expected {internal} {name} entries, found {len}");
        }
    }
    if tree.cat_boundaries.windows(2).any(|w| w[0] > w[1])
        || tree.cat_boundaries.last().is_some_and(|&b| b > tree.cat_threshold.len())
    {
        bail!("cat_boundaries do not index cat_threshold");
    }

    for node in 0..internal {
        if tree.split_feature[node] >= num_features {
            bail!("node {node} splits on feature {} of {num_features}", tree.split_feature[node]);
        }
        // Children must point forward so traversal always terminates.
        for child in [tree.left_child[node], tree.right_child[node]] {
            let ok = if child >= 0 {
                (child as usize) > node && (child as usize) < internal
            } else {
                (!child as usize) < num_leaves
            };
            if !ok {
                bail!("node {node} has invalid child {child}");
            }
        }
        if tree.decision_type[node] & CATEGORICAL_MASK != 0 {
            let t = tree.threshold[node];
            if t < 0.0 || (t as usize) + 1 >= tree.cat_boundaries.len() {
                bail!("node {node} references missing category set {t}");
            }
        }
    }
    Ok(tree)
}
