//! Conditions snapshot construction
//!
//! Turns parallel hourly series (swell, wind) and tide extrema into one
//! canonical [`Conditions`] record for a target time:
//! - swell fields are sampled at the lag-corrected time (see [`crate::lag`])
//! - wind and tide are sampled at the target time itself
//! - the blown-water index summarizes the trailing 24 h of wind
//!
//! A snapshot with neither swell height nor swell period is reported as
//! [`ComputeError::NoSwellData`]; zeros are never substituted for missing swell.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::compass::circular_distance;
use crate::config::BreakConfig;
use crate::error::ComputeError;
use crate::lag::SwellLagEstimator;
use crate::round::RoundTo;
use crate::types::{
    Conditions, DerivedConditions, HourlySeries, SecondarySwell, SwellLag, SwellReading,
    TideExtreme, TideKind, TideStage, TideState, WindReading,
};

/// Trailing window for the blown-water index
pub const BLOWN_WATER_WINDOW_HOURS: i64 = 24;

/// Look-back of the short-range source when queried for recent sessions
pub const SHORT_RANGE_PAST_DAYS: i64 = 7;

/// Which upstream source holds history for a session time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalSource {
    /// Short-range forecast model with a few days of past data
    ShortRange,
    /// Reanalysis archive
    Archive,
}

/// Date span a collaborator must fetch so the snapshot has enough history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalQuery {
    pub source: HistoricalSource,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl HistoricalQuery {
    /// Pick the source and span for a session at `t`, as seen from `now`
    ///
    /// The archive span starts the day before `t` so the lag window and the
    /// blown-water window have data even for early-morning sessions.
    pub fn for_session(now: NaiveDateTime, t: NaiveDateTime, config: &BreakConfig) -> Self {
        let age_days = (now - t).num_milliseconds() as f64 / 86_400_000.0;
        if age_days <= config.recency_threshold_days {
            Self {
                source: HistoricalSource::ShortRange,
                start_date: now.date() - Duration::days(SHORT_RANGE_PAST_DAYS),
                end_date: now.date(),
            }
        } else {
            Self {
                source: HistoricalSource::Archive,
                start_date: t.date() - Duration::days(1),
                end_date: t.date(),
            }
        }
    }
}

/// Index of the hour closest to `t` in an ascending axis; the earliest wins ties
pub fn nearest_hour_index(times: &[NaiveDateTime], t: NaiveDateTime) -> Option<usize> {
    let after = times.partition_point(|ts| *ts < t);
    let before = after.checked_sub(1);
    match (before, times.get(after)) {
        (Some(b), Some(a)) if (*a - t) < (t - times[b]) => Some(after),
        (Some(b), _) => {
            // Walk back over repeated timestamps so the first one wins
            let first = times[..=b].partition_point(|ts| *ts < times[b]);
            Some(first)
        }
        (None, Some(_)) => Some(after),
        (None, None) => None,
    }
}

/// Tide state at `t` from the nearest extreme event
pub fn tide_at(extrema: &[TideExtreme], t: NaiveDateTime) -> Option<TideState> {
    let nearest = extrema.iter().fold(None, |best: Option<(&TideExtreme, i64)>, e| {
        let d = (e.time - t).num_milliseconds().abs();
        match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((e, d)),
        }
    });

    nearest.map(|(e, d)| {
        let stage = match (e.time > t, e.kind) {
            (true, TideKind::High) | (false, TideKind::Low) => TideStage::Rising,
            (true, TideKind::Low) | (false, TideKind::High) => TideStage::Falling,
        };
        TideState {
            height_ft: e.height_ft,
            stage,
            hours_to_next_extreme: (d as f64 / 3_600_000.0).round_to(1),
        }
    })
}

/// Mean positive onshore wind component over the 24 h ending at `t`
pub fn blown_water_index(series: &HourlySeries, t: NaiveDateTime, onshore_axis_deg: f64) -> f64 {
    let window_start = t - Duration::hours(BLOWN_WATER_WINDOW_HOURS);
    let (sum, count) = series
        .hours_between(window_start, t)
        .filter_map(|i| match (series.wind_speed_at(i), series.wind_direction_at(i)) {
            (Some(speed), Some(dir)) => Some(speed * (dir - onshore_axis_deg).to_radians().cos()),
            _ => None,
        })
        .filter(|onshore| *onshore > 0.0)
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        0.0
    } else {
        (sum / count as f64).round_to(2)
    }
}

/// 1.0 for a dead-offshore wind, falling linearly to 0.0 at the half window
pub fn offshore_alignment_score(wind_direction_deg: Option<f64>, config: &BreakConfig) -> f64 {
    match wind_direction_deg {
        Some(dir) => {
            let distance = circular_distance(dir, config.offshore_center_deg);
            (1.0 - distance / config.offshore_half_window_deg)
                .max(0.0)
                .round_to(2)
        }
        None => 0.0,
    }
}

/// Builds condition snapshots for one break
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    config: BreakConfig,
    lag: SwellLagEstimator,
}

impl SnapshotBuilder {
    pub fn new(config: &BreakConfig) -> Self {
        Self {
            config: config.clone(),
            lag: SwellLagEstimator::new(config.sensor_distance_miles),
        }
    }

    pub fn config(&self) -> &BreakConfig {
        &self.config
    }

    /// Snapshot for a logged session at `t`, rounded for storage
    pub fn historical(
        &self,
        series: &HourlySeries,
        t: NaiveDateTime,
    ) -> Result<Conditions, ComputeError> {
        series.validate()?;
        let conditions = self.build_at(series, t)?;
        Ok(round_for_storage(conditions))
    }

    /// Snapshot for one hour of a forecast series
    pub fn forecast_hour(
        &self,
        series: &HourlySeries,
        hour_index: usize,
    ) -> Result<Conditions, ComputeError> {
        series.validate()?;
        self.forecast_hour_unchecked(series, hour_index)
    }

    /// Forecast snapshot for a series that has already been validated
    pub(crate) fn forecast_hour_unchecked(
        &self,
        series: &HourlySeries,
        hour_index: usize,
    ) -> Result<Conditions, ComputeError> {
        let t = *series
            .time
            .get(hour_index)
            .ok_or(ComputeError::HourOutOfRange {
                index: hour_index,
                len: series.len(),
            })?;
        self.build_at(series, t)
    }

    fn build_at(&self, series: &HourlySeries, t: NaiveDateTime) -> Result<Conditions, ComputeError> {
        if series.is_empty() {
            return Err(ComputeError::EmptySeries("time".to_string()));
        }

        let lag = self.lag.estimate(series, t);
        let sampled_at = lag.sample_time(t);
        let swell = self
            .sample_swell(series, sampled_at)
            .ok_or_else(|| {
                tracing::debug!(%t, %sampled_at, "no swell height or period at sampled hour");
                ComputeError::NoSwellData(t.to_string())
            })?;

        let wind_idx = nearest_hour_index(&series.time, t).unwrap_or(0);
        let wind_direction = series.wind_direction_at(wind_idx);
        let wind = WindReading {
            speed_mph: series.wind_speed_at(wind_idx).unwrap_or(0.0),
            direction_deg: wind_direction.unwrap_or(0.0),
        };

        let derived = DerivedConditions {
            blown_water_index: blown_water_index(series, t, self.config.onshore_axis_deg),
            offshore_alignment_score: offshore_alignment_score(wind_direction, &self.config),
        };

        let lag_meta = (lag.lag_hours > 0.0).then(|| {
            tracing::debug!(
                %t,
                %sampled_at,
                lag_hours = lag.lag_hours,
                mean_period_s = lag.mean_period_s,
                "applied swell travel-time correction"
            );
            SwellLag {
                lag_hours: lag.lag_hours.round_to(1),
                logged_at: t,
                sampled_at,
            }
        });

        Ok(Conditions {
            swell: Some(swell),
            wind,
            tide: tide_at(&series.tide_extrema, t),
            derived,
            lag: lag_meta,
        })
    }

    fn sample_swell(&self, series: &HourlySeries, sampled_at: NaiveDateTime) -> Option<SwellReading> {
        let idx = nearest_hour_index(&series.time, sampled_at)?;
        let height = series.swell_height_at(idx);
        let period = series.swell_period_at(idx);
        if height.is_none() && period.is_none() {
            return None;
        }

        let secondary = match series.secondary_at(idx) {
            (Some(h), period_s, direction_deg) if h > self.config.secondary_min_height_ft => {
                Some(SecondarySwell {
                    height_ft: h,
                    period_s: period_s.unwrap_or(0.0),
                    direction_deg: direction_deg.unwrap_or(0.0),
                })
            }
            _ => None,
        };

        Some(SwellReading {
            height_ft: height.unwrap_or(0.0),
            period_s: period.unwrap_or(0.0),
            direction_deg: series.swell_direction_at(idx).unwrap_or(0.0),
            secondary,
        })
    }
}

/// Storage precision: heights and periods to 0.1, bearings and wind speed to whole units
fn round_for_storage(mut c: Conditions) -> Conditions {
    if let Some(swell) = c.swell.as_mut() {
        swell.height_ft = swell.height_ft.round_to(1);
        swell.period_s = swell.period_s.round_to(1);
        swell.direction_deg = swell.direction_deg.round();
        if let Some(sec) = swell.secondary.as_mut() {
            sec.height_ft = sec.height_ft.round_to(1);
            sec.period_s = sec.period_s.round_to(1);
            sec.direction_deg = sec.direction_deg.round();
        }
    }
    c.wind.speed_mph = c.wind.speed_mph.round();
    c.wind.direction_deg = c.wind.direction_deg.round();
    if let Some(tide) = c.tide.as_mut() {
        tide.height_ft = tide.height_ft.round_to(1);
    }
    c
}
