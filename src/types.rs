//! Core types for the Surf Match engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw hourly series, condition snapshots, log entries, trained models
//! and the per-day match records handed to the presentation layer.

use chrono::{NaiveDate, NaiveDateTime};
use std::ops::Range;
use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Tide direction of travel at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideStage {
    Rising,
    Falling,
}

impl TideStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TideStage::Rising => "rising",
            TideStage::Falling => "falling",
        }
    }

    /// +1 for a rising tide, -1 for a falling tide
    pub fn sign(&self) -> f64 {
        match self {
            TideStage::Rising => 1.0,
            TideStage::Falling => -1.0,
        }
    }
}

/// Kind of tide extreme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideKind {
    #[serde(alias = "H")]
    High,
    #[serde(alias = "L")]
    Low,
}

/// A discrete high or low tide event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideExtreme {
    /// Local time of the event at the break
    pub time: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: TideKind,
    /// Predicted height (feet above datum)
    pub height_ft: f64,
}

/// Secondary swell train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondarySwell {
    pub height_ft: f64,
    pub period_s: f64,
    pub direction_deg: f64,
}

/// Primary swell reading, optionally with a secondary train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwellReading {
    pub height_ft: f64,
    pub period_s: f64,
    pub direction_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<SecondarySwell>,
}

/// Wind reading at the break
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindReading {
    pub speed_mph: f64,
    pub direction_deg: f64,
}

/// Tide state at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideState {
    pub height_ft: f64,
    pub stage: TideStage,
    /// Hours between the snapshot time and the nearest extreme (one decimal)
    pub hours_to_next_extreme: f64,
}

/// Scalars derived from the wind history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedConditions {
    /// Mean positive onshore wind component over the trailing 24 h
    pub blown_water_index: f64,
    /// 1.0 when the wind blows from the offshore center, 0.0 at or beyond the half window
    pub offshore_alignment_score: f64,
}

/// Swell travel-time correction applied when sampling swell fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwellLag {
    /// Travel time from the sensor to the break (hours, one decimal)
    pub lag_hours: f64,
    /// The time the session (or forecast hour) was logged for
    pub logged_at: NaiveDateTime,
    /// The time the swell fields were sampled at
    pub sampled_at: NaiveDateTime,
}

/// Canonical conditions snapshot for one (timestamp, data source) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Absent only for manually entered conditions; built snapshots always carry swell
    #[serde(default)]
    pub swell: Option<SwellReading>,
    pub wind: WindReading,
    #[serde(default)]
    pub tide: Option<TideState>,
    #[serde(default)]
    pub derived: DerivedConditions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lag: Option<SwellLag>,
}

/// Self-assessed session ratings, each 1-10 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub size: u8,
    pub wind_quality: u8,
    pub ride_quality: u8,
}

impl Ratings {
    /// Regression target for the wave model: size-weighted blend with ride quality
    pub fn wave_target(&self) -> f64 {
        0.75 * f64::from(self.size) + 0.25 * f64::from(self.ride_quality)
    }

    /// Regression target for the wind model
    pub fn wind_target(&self) -> f64 {
        f64::from(self.wind_quality)
    }

    /// Plain average of the three ratings
    pub fn average(&self) -> f64 {
        (f64::from(self.size) + f64::from(self.wind_quality) + f64::from(self.ride_quality)) / 3.0
    }
}

/// One logged surf session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    /// Stable identifier; assigned on insert when empty
    #[serde(default)]
    pub id: String,
    /// Local time of the session at the break
    pub timestamp: NaiveDateTime,
    pub ratings: Ratings,
    #[serde(default)]
    pub notes: String,
    /// Conditions at the session time; entries without them are kept but never trained on
    #[serde(default)]
    pub conditions: Option<Conditions>,
}

/// Parallel hourly series for one location
///
/// Every non-empty value series must have the same length as `time`. An empty
/// series means the provider did not supply that variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    /// Hourly local timestamps, ascending
    pub time: Vec<NaiveDateTime>,
    #[serde(default)]
    pub swell_height_ft: Vec<Option<f64>>,
    #[serde(default)]
    pub swell_period_s: Vec<Option<f64>>,
    #[serde(default)]
    pub swell_direction_deg: Vec<Option<f64>>,
    /// Combined-sea fallbacks used when the swell component is missing
    #[serde(default)]
    pub wave_height_ft: Vec<Option<f64>>,
    #[serde(default)]
    pub wave_period_s: Vec<Option<f64>>,
    #[serde(default)]
    pub wave_direction_deg: Vec<Option<f64>>,
    #[serde(default)]
    pub secondary_height_ft: Vec<Option<f64>>,
    #[serde(default)]
    pub secondary_period_s: Vec<Option<f64>>,
    #[serde(default)]
    pub secondary_direction_deg: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_mph: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_deg: Vec<Option<f64>>,
    /// Tide extrema covering the series window
    #[serde(default)]
    pub tide_extrema: Vec<TideExtreme>,
}

impl HourlySeries {
    /// Number of hours in the series
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Check that the time axis never goes backwards and that every supplied
    /// value series lines up with it
    pub fn validate(&self) -> Result<(), ComputeError> {
        if let Some(i) = self.time.windows(2).position(|w| w[1] < w[0]) {
            return Err(ComputeError::UnorderedTime(i + 1));
        }
        let expected = self.time.len();
        let fields: [(&'static str, usize); 11] = [
            ("swell_height_ft", self.swell_height_ft.len()),
            ("swell_period_s", self.swell_period_s.len()),
            ("swell_direction_deg", self.swell_direction_deg.len()),
            ("wave_height_ft", self.wave_height_ft.len()),
            ("wave_period_s", self.wave_period_s.len()),
            ("wave_direction_deg", self.wave_direction_deg.len()),
            ("secondary_height_ft", self.secondary_height_ft.len()),
            ("secondary_period_s", self.secondary_period_s.len()),
            ("secondary_direction_deg", self.secondary_direction_deg.len()),
            ("wind_speed_mph", self.wind_speed_mph.len()),
            ("wind_direction_deg", self.wind_direction_deg.len()),
        ];
        for (field, actual) in fields {
            if actual != 0 && actual != expected {
                return Err(ComputeError::SeriesLengthMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Swell height at an hour, falling back to the combined sea height
    pub fn swell_height_at(&self, i: usize) -> Option<f64> {
        value_at(&self.swell_height_ft, i).or_else(|| value_at(&self.wave_height_ft, i))
    }

    /// Swell period at an hour, falling back to the combined sea period
    pub fn swell_period_at(&self, i: usize) -> Option<f64> {
        value_at(&self.swell_period_s, i).or_else(|| value_at(&self.wave_period_s, i))
    }

    /// Swell direction at an hour, falling back to the combined sea direction
    pub fn swell_direction_at(&self, i: usize) -> Option<f64> {
        value_at(&self.swell_direction_deg, i).or_else(|| value_at(&self.wave_direction_deg, i))
    }

    pub fn secondary_at(&self, i: usize) -> (Option<f64>, Option<f64>, Option<f64>) {
        (
            value_at(&self.secondary_height_ft, i),
            value_at(&self.secondary_period_s, i),
            value_at(&self.secondary_direction_deg, i),
        )
    }

    pub fn wind_speed_at(&self, i: usize) -> Option<f64> {
        value_at(&self.wind_speed_mph, i)
    }

    pub fn wind_direction_at(&self, i: usize) -> Option<f64> {
        value_at(&self.wind_direction_deg, i)
    }

    /// Indices of the hours within `[start, end]`, found by binary search
    pub fn hours_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Range<usize> {
        let lo = self.time.partition_point(|t| *t < start);
        let hi = self.time.partition_point(|t| *t <= end);
        lo..hi.max(lo)
    }

    /// Hour indices grouped by calendar day, in time order
    pub fn hours_by_day(&self) -> Vec<(NaiveDate, Vec<usize>)> {
        let mut days: Vec<(NaiveDate, Vec<usize>)> = Vec::new();
        for (i, t) in self.time.iter().enumerate() {
            let day = t.date();
            match days.last_mut() {
                Some((d, idxs)) if *d == day => idxs.push(i),
                _ => days.push((day, vec![i])),
            }
        }
        days
    }
}

/// Read an optional sample, treating missing and non-finite values as absent
pub(crate) fn value_at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten().filter(|v| v.is_finite())
}

/// Per-dimension normalization statistics captured at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub mean: Vec<f64>,
}

/// A fitted linear model over normalized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub weights: Vec<f64>,
    pub stats: FeatureStats,
    /// Number of (vector, target) pairs the model was fitted on
    pub samples: usize,
}

impl TrainedModel {
    pub fn dimensions(&self) -> usize {
        self.weights.len()
    }
}

/// Wave and wind models trained from one revision of the log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    /// `None` means untrained (too few usable entries or a singular system)
    pub wave: Option<TrainedModel>,
    pub wind: Option<TrainedModel>,
    /// Log revision the models were trained from
    pub revision: u64,
}

impl ModelSet {
    pub fn is_trained(&self) -> bool {
        self.wave.is_some() || self.wind.is_some()
    }
}

/// Share of the total absolute weight carried by one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightShare {
    pub name: String,
    pub weight: f64,
    /// `|weight| / sum(|weights|)`, in [0, 1]
    pub share: f64,
}

/// Best (log entry, forecast hour) pair for one forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayMatch {
    pub day: NaiveDate,
    pub hour_index: usize,
    pub time: NaiveDateTime,
    pub entry_id: String,
    /// Wave similarity, 0-100
    pub wave_match: u8,
    /// Wind similarity, 0-100
    pub wind_match: u8,
    pub predicted_wave: Option<f64>,
    pub predicted_wind: Option<f64>,
}

impl DayMatch {
    /// Average of the wave and wind match percentages
    pub fn combined(&self) -> f64 {
        (f64::from(self.wave_match) + f64::from(self.wind_match)) / 2.0
    }
}

/// Side-by-side view of a logged session and one forecast hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub entry_id: String,
    pub logged: Conditions,
    pub forecast: Conditions,
    pub forecast_time: NaiveDateTime,
    pub wave_match: u8,
    pub wind_match: u8,
}

/// Producer metadata stamped on every report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Log counts at report time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_entries: usize,
    /// Entries with recorded conditions
    pub usable_entries: usize,
}

/// Presentation view of one trained (or untrained) model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub trained: bool,
    pub samples: usize,
    /// Empty when untrained or when no feature carries weight
    pub features: Vec<WeightShare>,
}

/// Full engine output for one forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub generated_at_utc: String,
    pub break_name: String,
    pub log: LogSummary,
    pub wave_model: ModelReport,
    pub wind_model: ModelReport,
    pub matches: Vec<DayMatch>,
}
