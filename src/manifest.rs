use anyhow::{bail, Context, Result};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use crate::types::Value;

/// Ordered model input columns plus the subset trained as categorical.
#[derive(Debug, Clone)]
pub struct FeatureManifest {
    columns: Vec<String>,
    categorical: HashSet<String>,
}

impl FeatureManifest {
    pub fn new(columns: Vec<String>, categorical: impl IntoIterator<Item = String>) -> Self {
        Self {
            columns,
            categorical: categorical.into_iter().collect(),
        }
    }

    pub fn load(columns_path: &Path, categorical_path: &Path) -> Result<Self> {
        let columns = read_name_list(columns_path)?;
        if columns.is_empty() {
            bail!("column manifest {} is empty", columns_path.display());
        }
        let categorical = read_name_list(categorical_path)?;
        Ok(Self::new(columns, categorical))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical.contains(column)
    }

    /// Categorical columns that the model actually sees, in column order.
    /// Names flagged categorical but absent from `columns` are ignored.
    pub fn categorical_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| self.categorical.contains(*c))
    }
}

fn read_name_list(path: &Path) -> Result<Vec<String>> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    serde_json::from_str(&txt)
        .with_context(|| format!("manifest {} is not a JSON array of strings", path.display()))
}

/// Maps categorical values to the integer codes the trees were trained on.
///
/// A value outside the training-time category list gets no code and is fed
/// to the model as missing. Without category lists the model was trained on
/// integer codes directly, so numeric values pass through and text is unseen.
#[derive(Debug, Clone, Default)]
pub struct CategoryEncoding {
    by_column: Option<HashMap<String, HashMap<String, u32>>>,
}

impl CategoryEncoding {
    pub fn build(
        manifest: &FeatureManifest,
        pandas_categorical: Option<&[Vec<serde_json::Value>]>,
    ) -> Result<Self> {
        let Some(lists) = pandas_categorical else {
            return Ok(Self::default());
        };
        let cat_cols: Vec<&str> = manifest.categorical_columns().collect();
        if lists.len() != cat_cols.len() {
            bail!(
                "model carries {} category lists but the manifest has {} categorical columns",
                lists.len(),
                cat_cols.len()
            );
        }
        let by_column = cat_cols
            .into_iter()
            .zip(lists)
            .map(|(col, cats)| {
                let codes = cats
                    .iter()
                    .enumerate()
                    .map(|(code, v)| (json_category_key(v), code as u32))
                    .collect();
                (col.to_string(), codes)
            })
            .collect();
        Ok(Self {
            by_column: Some(by_column),
        })
    }

    pub fn has_category_lists(&self) -> bool {
        self.by_column.is_some()
    }

    pub fn encode(&self, column: &str, value: &Value) -> Option<u32> {
        match &self.by_column {
            Some(maps) => {
                let key = category_key(value)?;
                maps.get(column)?.get(&key).copied()
            }
            None => match value {
                Value::Num(v) if *v >= 0.0 && v.is_finite() => Some(v.min(u32::MAX as f64) as u32),
                _ => None,
            },
        }
    }
}

/// Canonical text of a category value: strings verbatim, numbers in their
/// shortest form with integral values printed without a fraction.
pub fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::Num(v) => Some(canonical_number(*v)),
        Value::Text(s) => Some(s.clone()),
        Value::Missing => None,
    }
}

pub fn canonical_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn json_category_key(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => canonical_number(n.as_f64().unwrap_or(f64::NAN)),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest() -> FeatureManifest {
        FeatureManifest::new(
            vec!["Airline".into(), "Dep_Delay".into(), "Model".into()],
            vec!["Model".into(), "Airline".into(), "Not_A_Column".into()],
        )
    }

    #[test]
    fn categorical_columns_follow_column_order() {
        let m = manifest();
        assert_eq!(m.categorical_columns().collect::<Vec<_>>(), ["Airline", "Model"]);
        assert!(m.is_categorical("Not_A_Column"));
        assert!(!m.is_categorical("Dep_Delay"));
    }

    #[test]
    fn encodes_against_training_lists() {
        let lists = vec![
            vec![json!("Delta Air Lines Inc."), json!("Endeavor Air")],
            vec![json!(0), json!(737), json!(1.5)],
        ];
        let enc = CategoryEncoding::build(&manifest(), Some(&lists)).unwrap();
        assert!(enc.has_category_lists());
        assert_eq!(enc.encode("Airline", &Value::from("Endeavor Air")), Some(1));
        assert_eq!(enc.encode("Airline", &Value::from("Unknown")), None);
        assert_eq!(enc.encode("Model", &Value::Num(737.0)), Some(1));
        assert_eq!(enc.encode("Model", &Value::Num(0.0)), Some(0));
        assert_eq!(enc.encode("Model", &Value::Num(1.5)), Some(2));
        assert_eq!(enc.encode("Model", &Value::from("737")), Some(1));
        assert_eq!(enc.encode("Dep_Delay", &Value::Num(1.0)), None);
    }

    #[test]
    fn list_count_must_match() {
        let lists = vec![vec![json!("a")]];
        assert!(CategoryEncoding::build(&manifest(), Some(&lists)).is_err());
    }

    #[test]
    fn passthrough_without_lists() {
        let enc = CategoryEncoding::build(&manifest(), None).unwrap();
        assert!(!enc.has_category_lists());
        assert_eq!(enc.encode("Airline", &Value::Num(3.0)), Some(3));
        assert_eq!(enc.encode("Airline", &Value::Num(-1.0)), None);
        assert_eq!(enc.encode("Airline", &Value::from("Delta")), None);
    }

    #[test]
    fn canonical_numbers() {
        assert_eq!(canonical_number(0.0), "0");
        assert_eq!(canonical_number(-3.0), "-3");
        assert_eq!(canonical_number(2.25), "2.25");
    }

    #[test]
    fn loads_json_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let cols = dir.path().join("cols.json");
        let cats = dir.path().join("cats.json");
        fs::write(&cols, r#"["a", "b"]"#).unwrap();
        fs::write(&cats, r#"["b"]"#).unwrap();
        let m = FeatureManifest::load(&cols, &cats).unwrap();
        assert_eq!(m.columns(), ["a", "b"]);
        assert!(m.is_categorical("b"));

        fs::write(&cats, r#"{"b": 1}"#).unwrap();
        assert!(FeatureManifest::load(&cols, &cats).is_err());
        assert!(FeatureManifest::load(&dir.path().join("nope.json"), &cats).is_err());
    }
}
