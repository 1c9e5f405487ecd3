//! Best-match-per-day search over a forecast horizon
//!
//! Every forecast hour is turned into a snapshot and feature vectors once,
//! then scored against every logged session that has conditions. For each
//! calendar day the (session, hour) pair with the highest average of wave and
//! wind similarity wins; the earliest pair keeps a tie.

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::features::{ConditionFeatures, FeatureExtractor};
use crate::matcher::{predict, score, similarity};
use crate::snapshot::SnapshotBuilder;
use crate::types::{Comparison, DayMatch, HourlySeries, ModelSet, SessionLogEntry};

struct HourFeatures {
    index: usize,
    features: ConditionFeatures,
}

fn forecast_features(
    builder: &SnapshotBuilder,
    extractor: &FeatureExtractor,
    forecast: &HourlySeries,
    hours: &[usize],
) -> Result<Vec<HourFeatures>, ComputeError> {
    let mut out = Vec::with_capacity(hours.len());
    for &index in hours {
        match builder.forecast_hour_unchecked(forecast, index) {
            Ok(conditions) => out.push(HourFeatures {
                index,
                features: extractor.extract(&conditions),
            }),
            Err(ComputeError::NoSwellData(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Best (session, hour) pair for each forecast day that has one
pub fn best_match_per_day(
    entries: &[SessionLogEntry],
    forecast: &HourlySeries,
    models: &ModelSet,
    config: &EngineConfig,
) -> Result<Vec<DayMatch>, ComputeError> {
    forecast.validate()?;
    let builder = SnapshotBuilder::new(&config.break_config);
    let extractor = FeatureExtractor::new(config.break_config.swell_window);

    let logged: Vec<(&SessionLogEntry, ConditionFeatures)> = entries
        .iter()
        .filter_map(|e| {
            let features = extractor.extract(e.conditions.as_ref()?);
            features.wave.is_some().then_some((e, features))
        })
        .collect();

    if logged.is_empty() {
        tracing::debug!("no logged sessions with conditions to match against");
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for (day, hours) in forecast.hours_by_day() {
        let hour_features = forecast_features(&builder, &extractor, forecast, &hours)?;

        let mut best: Option<(f64, &SessionLogEntry, &HourFeatures, u8, u8)> = None;
        for hour in &hour_features {
            for (entry, features) in &logged {
                let Some(s) = score(features, &hour.features, models) else {
                    continue;
                };
                let combined = s.combined();
                if best.as_ref().map_or(true, |(b, ..)| combined > *b) {
                    best = Some((combined, *entry, hour, s.wave_match, s.wind_match));
                }
            }
        }

        if let Some((_, entry, hour, wave_match, wind_match)) = best {
            matches.push(DayMatch {
                day,
                hour_index: hour.index,
                time: forecast.time[hour.index],
                entry_id: entry.id.clone(),
                wave_match,
                wind_match,
                predicted_wave: hour
                    .features
                    .wave
                    .as_ref()
                    .and_then(|w| predict(w, models.wave.as_ref())),
                predicted_wind: predict(&hour.features.wind, models.wind.as_ref()),
            });
        }
    }

    tracing::debug!(
        days = matches.len(),
        sessions = logged.len(),
        hours = forecast.len(),
        "best match search complete"
    );
    Ok(matches)
}

/// Side-by-side comparison of one logged session with one forecast hour
pub fn compare(
    entry: &SessionLogEntry,
    forecast: &HourlySeries,
    hour_index: usize,
    models: &ModelSet,
    config: &EngineConfig,
) -> Result<Comparison, ComputeError> {
    let logged = entry
        .conditions
        .as_ref()
        .ok_or_else(|| ComputeError::MissingConditions(entry.id.clone()))?;
    let builder = SnapshotBuilder::new(&config.break_config);
    let extractor = FeatureExtractor::new(config.break_config.swell_window);
    let snapshot = builder.forecast_hour(forecast, hour_index)?;

    let lf = extractor.extract(logged);
    let ff = extractor.extract(&snapshot);
    let wave_match = match (&lf.wave, &ff.wave) {
        (Some(l), Some(f)) => similarity(l, f, models.wave.as_ref()),
        _ => 0,
    };

    Ok(Comparison {
        entry_id: entry.id.clone(),
        logged: logged.clone(),
        forecast: snapshot,
        forecast_time: forecast.time[hour_index],
        wave_match,
        wind_match: similarity(&lf.wind, &ff.wind, models.wind.as_ref()),
    })
}
