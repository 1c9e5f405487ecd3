//! Pipeline orchestration
//!
//! This module provides the public API for Surf Match. It wires the stages
//! together: session log → conditions → feature vectors → trained models →
//! per-day matches → report.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::features::{WAVE_FEATURE_NAMES, WIND_FEATURE_NAMES};
use crate::search::{best_match_per_day, compare};
use crate::snapshot::SnapshotBuilder;
use crate::trainer::{weight_shares, ModelKind, Trainer};
use crate::types::{
    Comparison, DayMatch, HourlySeries, ModelSet, Ratings, SessionLogEntry, WeightShare,
};

/// Train on a log and report the best forecast match per day.
///
/// # Arguments
/// * `log_json` - JSON array of `SessionLogEntry`
/// * `forecast_json` - JSON `HourlySeries` for the forecast horizon
/// * `config` - Break geometry and model parameters
///
/// # Returns
/// A pretty-printed `MatchReport`
///
/// # Example
/// ```ignore
/// let report = best_matches_json(&log_json, &forecast_json, &EngineConfig::default())?;
/// ```
pub fn best_matches_json(
    log_json: &str,
    forecast_json: &str,
    config: &EngineConfig,
) -> Result<String, ComputeError> {
    config.validate()?;
    let entries: Vec<SessionLogEntry> = serde_json::from_str(log_json)?;
    let forecast: HourlySeries = serde_json::from_str(forecast_json)?;

    let models = Trainer::new(config).train(&entries, 0);
    let matches = best_match_per_day(&entries, &forecast, &models, config)?;

    ReportEncoder::new().encode_to_json(&config.break_config.name, &entries, &models, &matches)
}

/// Shared holder for the latest trained models.
///
/// Hosts that retrain off the interactive path publish through this cell. A
/// set is installed only when its revision is newer than the installed one,
/// so a slow retrain finishing late cannot overwrite a newer result.
#[derive(Debug, Clone, Default)]
pub struct ModelSlot {
    inner: Arc<RwLock<ModelSet>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `models` if it is newer; returns whether it was installed
    pub fn install(&self, models: ModelSet) -> bool {
        let mut current = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if models.revision > current.revision {
            *current = models;
            true
        } else {
            tracing::debug!(
                installed = current.revision,
                offered = models.revision,
                "discarding stale model set"
            );
            false
        }
    }

    /// Copy of the installed models
    pub fn current(&self) -> ModelSet {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).revision
    }
}

/// Stateful processor owning the session log and its trained models.
///
/// Every mutation bumps the log revision and retrains both models from the
/// full log.
pub struct SurfLogProcessor {
    config: EngineConfig,
    entries: Vec<SessionLogEntry>,
    models: ModelSet,
    revision: u64,
    trainer: Trainer,
    builder: SnapshotBuilder,
    encoder: ReportEncoder,
}

impl Default for SurfLogProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfLogProcessor {
    /// Create a processor for the default break
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Create a processor for a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            trainer: Trainer::new(&config),
            builder: SnapshotBuilder::new(&config.break_config),
            encoder: ReportEncoder::new(),
            config,
            entries: Vec::new(),
            models: ModelSet::default(),
            revision: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Log entries, newest first
    pub fn entries(&self) -> &[SessionLogEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&SessionLogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the whole log from JSON
    ///
    /// A repeated id rejects the whole document and leaves the log untouched.
    pub fn load_log(&mut self, json: &str) -> Result<(), ComputeError> {
        let mut entries: Vec<SessionLogEntry> = serde_json::from_str(json)?;
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries.iter_mut() {
            if entry.id.is_empty() {
                entry.id = Uuid::new_v4().to_string();
            }
            if !seen.insert(entry.id.clone()) {
                return Err(ComputeError::DuplicateEntry(entry.id.clone()));
            }
        }
        sort_newest_first(&mut entries);
        self.entries = entries;
        self.retrain();
        Ok(())
    }

    /// Serialize the log to JSON
    pub fn save_log(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.entries).map_err(ComputeError::JsonError)
    }

    /// Add an entry; an empty id is replaced with a fresh one
    pub fn add_entry(&mut self, mut entry: SessionLogEntry) -> Result<String, ComputeError> {
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        } else if self.entry(&entry.id).is_some() {
            return Err(ComputeError::DuplicateEntry(entry.id));
        }
        let id = entry.id.clone();
        let pos = self
            .entries
            .iter()
            .position(|e| e.timestamp <= entry.timestamp)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        self.retrain();
        Ok(id)
    }

    /// Record a session, building its conditions from historical series
    ///
    /// A history without swell data still records the session, just without
    /// conditions, so it never contributes to training.
    pub fn log_session(
        &mut self,
        timestamp: NaiveDateTime,
        ratings: Ratings,
        notes: String,
        history: Option<&HourlySeries>,
    ) -> Result<String, ComputeError> {
        let conditions = match history {
            Some(series) => match self.builder.historical(series, timestamp) {
                Ok(c) => Some(c),
                Err(ComputeError::NoSwellData(at)) => {
                    tracing::warn!(%at, "no swell data for session, logging without conditions");
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };
        self.add_entry(SessionLogEntry {
            id: String::new(),
            timestamp,
            ratings,
            notes,
            conditions,
        })
    }

    /// Replace the entry with the same id
    pub fn update_entry(&mut self, entry: SessionLogEntry) -> Result<(), ComputeError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| ComputeError::UnknownEntry(entry.id.clone()))?;
        *slot = entry;
        sort_newest_first(&mut self.entries);
        self.retrain();
        Ok(())
    }

    /// Remove an entry by id, returning it
    pub fn delete_entry(&mut self, id: &str) -> Result<SessionLogEntry, ComputeError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| ComputeError::UnknownEntry(id.to_string()))?;
        let removed = self.entries.remove(pos);
        self.retrain();
        Ok(removed)
    }

    /// Merge entries into the log, skipping ids already present
    ///
    /// Returns the number of entries imported. The log is retrained only when
    /// something was imported.
    pub fn import_entries(&mut self, incoming: Vec<SessionLogEntry>) -> usize {
        let mut imported = 0;
        for mut entry in incoming {
            if entry.id.is_empty() {
                entry.id = Uuid::new_v4().to_string();
            } else if self.entry(&entry.id).is_some() {
                continue;
            }
            self.entries.push(entry);
            imported += 1;
        }
        if imported > 0 {
            sort_newest_first(&mut self.entries);
            self.retrain();
        }
        tracing::debug!(imported, total = self.entries.len(), "imported log entries");
        imported
    }

    /// [`Self::import_entries`] from a JSON array
    pub fn import_json(&mut self, json: &str) -> Result<usize, ComputeError> {
        let incoming: Vec<SessionLogEntry> = serde_json::from_str(json)?;
        Ok(self.import_entries(incoming))
    }

    /// Feature weight shares of one model, `None` when untrained or without variance
    pub fn weight_shares(&self, kind: ModelKind) -> Option<Vec<WeightShare>> {
        match kind {
            ModelKind::Wave => weight_shares(self.models.wave.as_ref()?, &WAVE_FEATURE_NAMES),
            ModelKind::Wind => weight_shares(self.models.wind.as_ref()?, &WIND_FEATURE_NAMES),
        }
    }

    /// Best match per forecast day using the current models
    pub fn best_matches(&self, forecast: &HourlySeries) -> Result<Vec<DayMatch>, ComputeError> {
        best_match_per_day(&self.entries, forecast, &self.models, &self.config)
    }

    /// Compare a logged session with one forecast hour
    pub fn compare(
        &self,
        id: &str,
        forecast: &HourlySeries,
        hour_index: usize,
    ) -> Result<Comparison, ComputeError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| ComputeError::UnknownEntry(id.to_string()))?;
        compare(entry, forecast, hour_index, &self.models, &self.config)
    }

    /// Full report for a forecast as JSON
    pub fn report_json(&self, forecast: &HourlySeries) -> Result<String, ComputeError> {
        let matches = self.best_matches(forecast)?;
        self.encoder.encode_to_json(
            &self.config.break_config.name,
            &self.entries,
            &self.models,
            &matches,
        )
    }

    fn retrain(&mut self) {
        self.revision += 1;
        let models = self.trainer.train(&self.entries, self.revision);
        log_transition("wave", self.models.wave.is_some(), models.wave.is_some());
        log_transition("wind", self.models.wind.is_some(), models.wind.is_some());
        self.models = models;
    }
}

fn log_transition(model: &str, was_trained: bool, is_trained: bool) {
    match (was_trained, is_trained) {
        (false, true) => tracing::info!(model, "model trained"),
        (true, false) => tracing::info!(model, "model no longer trained"),
        _ => {}
    }
}

fn sort_newest_first(entries: &mut [SessionLogEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Conditions, DerivedConditions, SwellReading, WindReading};
    use chrono::{Duration, NaiveDate};

    fn at(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    fn make_entry(id: &str, h: i64, size: u8) -> SessionLogEntry {
        let f = h as f64;
        SessionLogEntry {
            id: id.to_string(),
            timestamp: at(h),
            ratings: Ratings {
                size,
                wind_quality: 11 - size,
                ride_quality: 5,
            },
            notes: String::new(),
            conditions: Some(Conditions {
                swell: Some(SwellReading {
                    height_ft: 1.0 + (h % 7) as f64 * 0.6,
                    period_s: 6.0 + (h % 5) as f64,
                    direction_deg: 120.0 + (h % 9) as f64 * 4.0,
                    secondary: None,
                }),
                wind: WindReading {
                    speed_mph: 3.0 + (h % 6) as f64 * 2.5,
                    direction_deg: 330.0,
                },
                tide: None,
                derived: DerivedConditions {
                    blown_water_index: 0.0,
                    offshore_alignment_score: (f * 0.13).fract(),
                },
                lag: None,
            }),
        }
    }

    fn make_log(n: i64) -> Vec<SessionLogEntry> {
        (0..n)
            .map(|h| make_entry(&format!("s{h}"), h * 30, (1 + h % 10) as u8))
            .collect()
    }

    fn make_forecast(hours: usize) -> HourlySeries {
        HourlySeries {
            time: (0..hours as i64).map(|h| at(1008 + h)).collect(),
            swell_height_ft: (0..hours).map(|i| Some(1.5 + (i % 10) as f64 * 0.3)).collect(),
            swell_period_s: vec![Some(9.0); hours],
            swell_direction_deg: vec![Some(135.0); hours],
            wind_speed_mph: (0..hours).map(|i| Some(4.0 + (i % 8) as f64)).collect(),
            wind_direction_deg: vec![Some(340.0); hours],
            ..Default::default()
        }
    }

    #[test]
    fn test_add_entry_assigns_id_and_orders_newest_first() {
        let mut processor = SurfLogProcessor::new();
        let id = processor.add_entry(make_entry("", 0, 5)).unwrap();
        assert!(!id.is_empty());

        processor.add_entry(make_entry("newer", 48, 6)).unwrap();
        processor.add_entry(make_entry("middle", 24, 6)).unwrap();
        let ids: Vec<&str> = processor.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "middle", id.as_str()]);
        assert_eq!(processor.revision(), 3);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut processor = SurfLogProcessor::new();
        processor.add_entry(make_entry("a", 0, 5)).unwrap();
        assert!(matches!(
            processor.add_entry(make_entry("a", 5, 5)),
            Err(ComputeError::DuplicateEntry(_))
        ));
    }

    #[test]
    fn test_models_follow_the_log() {
        let mut processor = SurfLogProcessor::new();
        for entry in make_log(7) {
            processor.add_entry(entry).unwrap();
        }
        assert!(!processor.models().is_trained());

        processor.add_entry(make_entry("eighth", 500, 9)).unwrap();
        assert!(processor.models().wave.is_some());
        assert!(processor.models().wind.is_some());
        assert_eq!(processor.models().revision, processor.revision());
        assert!(processor.weight_shares(ModelKind::Wind).is_some());

        processor.delete_entry("eighth").unwrap();
        assert!(!processor.models().is_trained());
        assert!(processor.weight_shares(ModelKind::Wave).is_none());
    }

    #[test]
    fn test_update_and_delete_unknown() {
        let mut processor = SurfLogProcessor::new();
        processor.add_entry(make_entry("a", 0, 5)).unwrap();

        let mut edited = make_entry("a", 0, 8);
        edited.notes = "bigger than it looked".to_string();
        processor.update_entry(edited).unwrap();
        assert_eq!(processor.entry("a").unwrap().ratings.size, 8);

        assert!(matches!(
            processor.update_entry(make_entry("zzz", 0, 1)),
            Err(ComputeError::UnknownEntry(_))
        ));
        assert!(matches!(
            processor.delete_entry("zzz"),
            Err(ComputeError::UnknownEntry(_))
        ));
    }

    #[test]
    fn test_import_skips_duplicates() {
        let mut processor = SurfLogProcessor::new();
        processor.add_entry(make_entry("s0", 0, 5)).unwrap();
        let revision = processor.revision();

        let imported = processor.import_entries(make_log(3));
        assert_eq!(imported, 2);
        assert_eq!(processor.entries().len(), 3);
        assert_eq!(processor.entries()[0].id, "s2");
        assert_eq!(processor.revision(), revision + 1);

        assert_eq!(processor.import_entries(make_log(3)), 0);
        assert_eq!(processor.revision(), revision + 1);
    }

    #[test]
    fn test_log_roundtrip() {
        let mut processor = SurfLogProcessor::new();
        processor.import_entries(make_log(9));
        let saved = processor.save_log().unwrap();

        let mut restored = SurfLogProcessor::new();
        restored.load_log(&saved).unwrap();
        let ids = |p: &SurfLogProcessor| -> Vec<String> {
            p.entries().iter().map(|e| e.id.clone()).collect()
        };
        assert_eq!(ids(&restored), ids(&processor));
        assert!(restored.models().wave.is_some());
    }

    #[test]
    fn test_load_log_rejects_repeated_ids() {
        let mut processor = SurfLogProcessor::new();
        processor.import_entries(make_log(3));
        let revision = processor.revision();

        let doubled = serde_json::to_string(&vec![make_entry("x", 0, 4), make_entry("x", 5, 6)])
            .unwrap();
        assert!(matches!(
            processor.load_log(&doubled),
            Err(ComputeError::DuplicateEntry(id)) if id == "x"
        ));
        assert_eq!(processor.entries().len(), 3);
        assert_eq!(processor.revision(), revision);
    }

    #[test]
    fn test_log_session_without_swell_keeps_entry() {
        let mut processor = SurfLogProcessor::new();
        let history = HourlySeries {
            time: (0..6).map(at).collect(),
            wind_speed_mph: vec![Some(5.0); 6],
            wind_direction_deg: vec![Some(300.0); 6],
            ..Default::default()
        };
        let ratings = Ratings {
            size: 3,
            wind_quality: 4,
            ride_quality: 5,
        };
        let id = processor
            .log_session(at(4), ratings, "flat".to_string(), Some(&history))
            .unwrap();
        assert!(processor.entry(&id).unwrap().conditions.is_none());
    }

    #[test]
    fn test_best_matches_and_report() {
        let mut processor = SurfLogProcessor::new();
        processor.import_entries(make_log(10));
        let forecast = make_forecast(48);

        let matches = processor.best_matches(&forecast).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.predicted_wave.is_some()));

        let json = processor.report_json(&forecast).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["log"]["total_entries"], 10);
        assert_eq!(report["wave_model"]["trained"], true);
        assert_eq!(report["matches"].as_array().unwrap().len(), 2);

        let view = processor.compare(&matches[0].entry_id, &forecast, matches[0].hour_index);
        assert_eq!(view.unwrap().wave_match, matches[0].wave_match);
    }

    #[test]
    fn test_best_matches_json_one_shot() {
        let log = serde_json::to_string(&make_log(4)).unwrap();
        let forecast = serde_json::to_string(&make_forecast(24)).unwrap();
        let json = best_matches_json(&log, &forecast, &EngineConfig::default()).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["wave_model"]["trained"], false);
        assert_eq!(report["matches"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_json() {
        let result = best_matches_json("not valid json", "{}", &EngineConfig::default());
        assert!(matches!(result, Err(ComputeError::JsonError(_))));
    }

    #[test]
    fn test_model_slot_ignores_stale_sets() {
        let slot = ModelSlot::new();
        let newer = ModelSet {
            revision: 5,
            ..Default::default()
        };
        let stale = ModelSet {
            revision: 3,
            ..Default::default()
        };
        assert!(slot.install(newer));
        assert!(!slot.install(stale));
        assert_eq!(slot.revision(), 5);

        let shared = slot.clone();
        assert!(shared.install(ModelSet {
            revision: 6,
            ..Default::default()
        }));
        assert_eq!(slot.current().revision, 6);
    }
}
