//! Similarity scoring and rating prediction

use crate::features::ConditionFeatures;
use crate::round::RoundTo;
use crate::types::{ModelSet, TrainedModel};

/// Bounds of a predicted rating
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 10.0;

/// Wave and wind similarity for one (logged, forecast) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub wave_match: u8,
    pub wind_match: u8,
}

impl MatchScore {
    pub fn combined(&self) -> f64 {
        (f64::from(self.wave_match) + f64::from(self.wind_match)) / 2.0
    }
}

fn to_percent(d: f64) -> u8 {
    (100.0 * (-d).exp()).round().clamp(0.0, 100.0) as u8
}

/// Similarity between a logged and a forecast vector, 0-100
///
/// A trained model weights each normalized dimension by `|w|` and skips
/// dimensions that never varied. Without one, the raw Euclidean distance is
/// scaled by the vector length.
pub fn similarity(logged: &[f64], forecast: &[f64], model: Option<&TrainedModel>) -> u8 {
    match model {
        Some(m) => {
            let stats = &m.stats;
            let d2: f64 = (0..m.dimensions().min(logged.len()).min(forecast.len()))
                .filter(|&j| stats.has_range(j))
                .map(|j| {
                    let diff =
                        stats.normalize_value(j, logged[j]) - stats.normalize_value(j, forecast[j]);
                    m.weights[j].abs() * diff * diff
                })
                .sum();
            to_percent(d2.sqrt())
        }
        None => {
            let n = logged.len().min(forecast.len());
            if n == 0 {
                return 100;
            }
            let d2: f64 = logged
                .iter()
                .zip(forecast)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            to_percent(d2.sqrt() / n as f64)
        }
    }
}

/// Predicted rating for a vector, clamped to 1-10 with one decimal
pub fn predict(features: &[f64], model: Option<&TrainedModel>) -> Option<f64> {
    let m = model?;
    let normalized = m.stats.normalize(features);
    let raw: f64 = m.weights.iter().zip(&normalized).map(|(w, x)| w * x).sum();
    Some(raw.clamp(MIN_RATING, MAX_RATING).round_to(1))
}

/// Score a logged snapshot against a forecast one
///
/// `None` when either side lacks a wave vector.
pub fn score(
    logged: &ConditionFeatures,
    forecast: &ConditionFeatures,
    models: &ModelSet,
) -> Option<MatchScore> {
    let (lw, fw) = (logged.wave.as_ref()?, forecast.wave.as_ref()?);
    Some(MatchScore {
        wave_match: similarity(lw, fw, models.wave.as_ref()),
        wind_match: similarity(&logged.wind, &forecast.wind, models.wind.as_ref()),
    })
}
