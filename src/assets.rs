use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::features::FeatureAssembler;
use crate::manifest::{CategoryEncoding, FeatureManifest};
use crate::model::Booster;
use crate::predictor::Classifier;
use crate::weather::WeatherTable;

/// Everything loaded at startup. Immutable afterwards and shared by every
/// request behind an `Arc`.
#[derive(Debug)]
pub struct Assets {
    pub model: Booster,
    pub weather: WeatherTable,
    pub manifest: FeatureManifest,
    pub encoding: CategoryEncoding,
}

impl Assets {
    pub fn load(cfg: &Config) -> Result<Self> {
        let model = Booster::load(&cfg.model_path)?;
        let weather = WeatherTable::load(&cfg.weather_path)?;
        let manifest = FeatureManifest::load(&cfg.columns_path, &cfg.categorical_path)?;
        Self::from_parts(model, weather, manifest)
    }

    /// Cross-checks the three artifacts and builds the category encoding.
    pub fn from_parts(
        model: Booster,
        weather: WeatherTable,
        manifest: FeatureManifest,
    ) -> Result<Self> {
        if model.num_features() != manifest.len() {
            bail!(
                "model expects {} features but the column manifest lists {}",
                model.num_features(),
                manifest.len()
            );
        }
        if !model.feature_names().is_empty() && model.feature_names() != manifest.columns() {
            tracing::warn!(
                "model feature names differ from the column manifest; using manifest order"
            );
        }
        if weather.duplicate_keys() > 0 {
            tracing::warn!(
                "weather table has {} duplicate (airport, date) rows; the first one wins",
                weather.duplicate_keys()
            );
        }
        let encoding = CategoryEncoding::build(&manifest, model.pandas_categorical())
            .context("categorical manifest does not match the model")?;

        tracing::info!(
            "loaded model trees={} features={} weather_rows={} weather_cols={} categorical={}",
            model.num_trees(),
            manifest.len(),
            weather.len(),
            weather.columns().len(),
            manifest.categorical_columns().count()
        );

        Ok(Self {
            model,
            weather,
            manifest,
            encoding,
        })
    }

    pub fn assembler(&self) -> FeatureAssembler<'_> {
        FeatureAssembler::new(&self.weather, &self.manifest, &self.encoding)
    }

    /// One forward pass over an all-zero row.
    pub fn warmup(&self) -> Result<()> {
        let zeros = vec![0.0; self.manifest.len()];
        self.model
            .predict_proba(&zeros)
            .context("warmup prediction failed")?;
        Ok(())
    }
}
