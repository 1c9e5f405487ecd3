//! Regression trainer
//!
//! Fits the wave and wind models from the full session log. Each model is a
//! linear map over min-max normalized features, solved with the
//! ridge-regularized normal equation. Too few usable entries or a singular
//! system leave the model untrained (`None`); neither is an error.

use crate::config::{EngineConfig, ModelConfig};
use crate::features::FeatureExtractor;
use crate::linalg::{design_matrix, ridge_normal_equation};
use crate::types::{FeatureStats, ModelSet, SessionLogEntry, TrainedModel, WeightShare};
use ndarray::Array1;

/// Which of the two models a fit is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Wave,
    Wind,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Wave => "wave",
            ModelKind::Wind => "wind",
        }
    }
}

/// Fit one linear model over normalized rows
///
/// Returns `None` with fewer than `min_samples` rows, on mismatched targets,
/// or when the regularized system is singular.
pub fn fit_model<R: AsRef<[f64]>>(
    rows: &[R],
    targets: &[f64],
    config: &ModelConfig,
) -> Option<TrainedModel> {
    if rows.len() < config.min_samples || rows.len() != targets.len() {
        return None;
    }

    let stats = FeatureStats::fit(rows)?;
    let normalized: Vec<Vec<f64>> = rows.iter().map(|r| stats.normalize(r.as_ref())).collect();
    let x = design_matrix(&normalized)?;
    let y = Array1::from(targets.to_vec());
    let weights = ridge_normal_equation(&x, &y, config.ridge_lambda, config.pivot_epsilon)?;

    Some(TrainedModel {
        weights: weights.to_vec(),
        stats,
        samples: rows.len(),
    })
}

/// Per-feature share of the total absolute weight
///
/// `None` when every weight is zero, which happens when no feature varied
/// across the log.
pub fn weight_shares(model: &TrainedModel, names: &[&str]) -> Option<Vec<WeightShare>> {
    let total: f64 = model.weights.iter().map(|w| w.abs()).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    Some(
        model
            .weights
            .iter()
            .zip(names)
            .map(|(&weight, name)| WeightShare {
                name: (*name).to_string(),
                weight,
                share: weight.abs() / total,
            })
            .collect(),
    )
}

/// Builds both models from a log
#[derive(Debug, Clone)]
pub struct Trainer {
    extractor: FeatureExtractor,
    config: ModelConfig,
}

impl Trainer {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(config.break_config.swell_window),
            config: config.model.clone(),
        }
    }

    /// (wave vector, wave target) pairs for entries with conditions and swell
    pub fn wave_samples(&self, entries: &[SessionLogEntry]) -> (Vec<Vec<f64>>, Vec<f64>) {
        entries
            .iter()
            .filter_map(|e| {
                let conditions = e.conditions.as_ref()?;
                let wave = self.extractor.wave(conditions)?;
                Some((wave.to_vec(), e.ratings.wave_target()))
            })
            .unzip()
    }

    /// (wind vector, wind target) pairs for entries with conditions
    pub fn wind_samples(&self, entries: &[SessionLogEntry]) -> (Vec<Vec<f64>>, Vec<f64>) {
        entries
            .iter()
            .filter_map(|e| {
                let conditions = e.conditions.as_ref()?;
                Some((
                    FeatureExtractor::wind(conditions).to_vec(),
                    e.ratings.wind_target(),
                ))
            })
            .unzip()
    }

    /// Retrain both models from the full log
    pub fn train(&self, entries: &[SessionLogEntry], revision: u64) -> ModelSet {
        let (wave_rows, wave_targets) = self.wave_samples(entries);
        let (wind_rows, wind_targets) = self.wind_samples(entries);

        tracing::debug!(
            revision,
            entries = entries.len(),
            wave_samples = wave_rows.len(),
            wind_samples = wind_rows.len(),
            "retraining models"
        );

        ModelSet {
            wave: self.fit(ModelKind::Wave, &wave_rows, &wave_targets),
            wind: self.fit(ModelKind::Wind, &wind_rows, &wind_targets),
            revision,
        }
    }

    fn fit(&self, kind: ModelKind, rows: &[Vec<f64>], targets: &[f64]) -> Option<TrainedModel> {
        if rows.len() < self.config.min_samples {
            tracing::debug!(
                model = kind.as_str(),
                samples = rows.len(),
                min_samples = self.config.min_samples,
                "not enough usable entries"
            );
            return None;
        }
        let model = fit_model(rows, targets, &self.config);
        if model.is_none() {
            tracing::warn!(
                model = kind.as_str(),
                samples = rows.len(),
                "normal equation is singular, leaving model untrained"
            );
        }
        model
    }
}
