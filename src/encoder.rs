//! Report encoding
//!
//! This module packages trained models and best-match results into a
//! versioned `MatchReport` for hosts and the CLI.

use crate::error::ComputeError;
use crate::features::{WAVE_FEATURE_NAMES, WIND_FEATURE_NAMES};
use crate::trainer::weight_shares;
use crate::types::{
    DayMatch, LogSummary, MatchReport, ModelReport, ModelSet, ReportProducer, SessionLogEntry,
    TrainedModel,
};
use crate::{PRODUCER_NAME, SURF_MATCH_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Report encoder for producing versioned JSON payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build a report from the log, its models and a set of matches
    pub fn encode(
        &self,
        break_name: &str,
        entries: &[SessionLogEntry],
        models: &ModelSet,
        matches: &[DayMatch],
    ) -> Result<MatchReport, ComputeError> {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: SURF_MATCH_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let log = LogSummary {
            total_entries: entries.len(),
            usable_entries: entries.iter().filter(|e| e.conditions.is_some()).count(),
        };

        Ok(MatchReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            generated_at_utc: Utc::now().to_rfc3339(),
            break_name: break_name.to_string(),
            log,
            wave_model: model_report(models.wave.as_ref(), &WAVE_FEATURE_NAMES)?,
            wind_model: model_report(models.wind.as_ref(), &WIND_FEATURE_NAMES)?,
            matches: matches.to_vec(),
        })
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        break_name: &str,
        entries: &[SessionLogEntry],
        models: &ModelSet,
        matches: &[DayMatch],
    ) -> Result<String, ComputeError> {
        let report = self.encode(break_name, entries, models, matches)?;
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}

fn model_report(model: Option<&TrainedModel>, names: &[&str]) -> Result<ModelReport, ComputeError> {
    let Some(m) = model else {
        return Ok(ModelReport {
            trained: false,
            samples: 0,
            features: Vec::new(),
        });
    };
    if m.dimensions() != names.len() {
        return Err(ComputeError::EncodingError(format!(
            "model has {} weights but {} feature names",
            m.dimensions(),
            names.len()
        )));
    }
    Ok(ModelReport {
        trained: true,
        samples: m.samples,
        features: weight_shares(m, names).unwrap_or_default(),
    })
}
