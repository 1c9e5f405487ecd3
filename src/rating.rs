//! Non-personalized surf rating and best-window search
//!
//! A fixed 1-5 heuristic over wave height, period, wind speed and swell
//! direction. It needs no log, so it stands in for the personalized matcher
//! until enough sessions have been recorded.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::BreakConfig;
use crate::types::{value_at, HourlySeries, TideKind};

/// Maximum number of hours scanned by [`best_window`]
pub const BEST_WINDOW_HORIZON_HOURS: usize = 168;

/// Winds below this speed (mph) count as light
pub const LIGHT_WIND_MPH: f64 = 8.0;

const DAYLIGHT_FIRST_HOUR: u32 = 5;
const DAYLIGHT_LAST_HOUR: u32 = 18;
const MORNING_LAST_HOUR: u32 = 10;
const LOW_TIDE_PROXIMITY_HOURS: i64 = 2;
const LOW_TIDE_BONUS: f64 = 0.3;
const MORNING_BONUS: f64 = 0.2;

/// Swell direction relative to the break's window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionClass {
    In,
    Edge,
    Out,
}

impl DirectionClass {
    pub fn classify(direction_deg: f64, config: &BreakConfig) -> Self {
        let window = &config.swell_window;
        let edge = config.swell_window_edge_deg;
        if window.contains(direction_deg) {
            DirectionClass::In
        } else if (direction_deg >= window.min_deg - edge && direction_deg < window.min_deg)
            || (direction_deg > window.max_deg && direction_deg <= window.max_deg + edge)
        {
            DirectionClass::Edge
        } else {
            DirectionClass::Out
        }
    }
}

/// Display label for a 1-5 rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingLabel {
    Flat,
    Poor,
    Fair,
    Good,
    Epic,
}

impl RatingLabel {
    pub fn for_score(score: u8) -> Self {
        match score {
            5.. => RatingLabel::Epic,
            4 => RatingLabel::Good,
            3 => RatingLabel::Fair,
            2 => RatingLabel::Poor,
            _ => RatingLabel::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingLabel::Flat => "Flat",
            RatingLabel::Poor => "Poor",
            RatingLabel::Fair => "Fair",
            RatingLabel::Good => "Good",
            RatingLabel::Epic => "Epic",
        }
    }
}

/// Unrounded heuristic score before clamping
fn raw_score(
    wave_height_ft: Option<f64>,
    period_s: Option<f64>,
    wind_speed_mph: Option<f64>,
    swell_direction_deg: Option<f64>,
    config: &BreakConfig,
) -> f64 {
    let mut score = 0.0;

    if let Some(h) = wave_height_ft {
        score += if (3.0..=8.0).contains(&h) {
            2.0
        } else if (2.0..3.0).contains(&h) || (h > 8.0 && h <= 12.0) {
            1.5
        } else if h >= 1.0 {
            0.5
        } else {
            0.0
        };
    }

    if let Some(p) = period_s {
        score += if p >= 10.0 {
            1.0
        } else if p >= 7.0 {
            0.5
        } else {
            0.0
        };
    }

    if let Some(ws) = wind_speed_mph {
        score += if ws < LIGHT_WIND_MPH {
            1.5
        } else if ws < 15.0 {
            1.0
        } else if ws < 25.0 {
            0.5
        } else {
            0.0
        };
    }

    if let Some(dir) = swell_direction_deg {
        score += match DirectionClass::classify(dir, config) {
            DirectionClass::In => 0.5,
            DirectionClass::Edge => 0.25,
            DirectionClass::Out => 0.0,
        };
    }

    score
}

/// Heuristic surf rating, 1-5
pub fn surf_rating(
    wave_height_ft: Option<f64>,
    period_s: Option<f64>,
    wind_speed_mph: Option<f64>,
    swell_direction_deg: Option<f64>,
    config: &BreakConfig,
) -> u8 {
    raw_score(
        wave_height_ft,
        period_s,
        wind_speed_mph,
        swell_direction_deg,
        config,
    )
    .round()
    .clamp(1.0, 5.0) as u8
}

fn size_words(height_ft: f64) -> &'static str {
    match height_ft {
        h if h < 2.0 => "ankle-to-knee high",
        h if h < 3.0 => "waist high",
        h if h < 4.0 => "chest high",
        h if h < 6.0 => "overhead",
        h if h < 8.0 => "well overhead",
        h if h < 12.0 => "double overhead",
        _ => "triple overhead+",
    }
}

fn period_words(period_s: Option<f64>) -> &'static str {
    match period_s {
        Some(p) if p >= 10.0 => "long-period",
        Some(p) if p >= 7.0 => "mid-period",
        _ => "short-period",
    }
}

fn wind_words(speed_mph: f64) -> &'static str {
    if speed_mph < 15.0 {
        "light winds"
    } else if speed_mph < 25.0 {
        "moderate winds"
    } else {
        "strong winds"
    }
}

/// One-sentence plain-language description of the conditions
///
/// e.g. `Chest high long-period surf, light winds, swell in the window.`
/// Empty when neither a wave height nor a wind speed is known.
pub fn conditions_summary(
    wave_height_ft: Option<f64>,
    period_s: Option<f64>,
    wind_speed_mph: Option<f64>,
    swell_direction_deg: Option<f64>,
    config: &BreakConfig,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(h) = wave_height_ft {
        if h < 1.0 {
            parts.push("flat conditions".to_string());
        } else {
            parts.push(format!("{} {} surf", size_words(h), period_words(period_s)));
        }
    }
    if let Some(ws) = wind_speed_mph {
        parts.push(wind_words(ws).to_string());
    }
    match swell_direction_deg.map(|d| DirectionClass::classify(d, config)) {
        Some(DirectionClass::In) => parts.push("swell in the window".to_string()),
        Some(DirectionClass::Edge) => parts.push("swell on edge of window".to_string()),
        _ => {}
    }

    if parts.is_empty() {
        return String::new();
    }
    let text = parts.join(", ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Highest-scoring upcoming daylight hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestWindow {
    pub time: NaiveDateTime,
    pub hour_index: usize,
    /// Rating plus tide and morning tiebreak bonuses
    pub score: f64,
    pub wave_height_ft: f64,
}

fn low_tide_near(series: &HourlySeries, t: NaiveDateTime) -> bool {
    let proximity = Duration::hours(LOW_TIDE_PROXIMITY_HOURS);
    series
        .tide_extrema
        .iter()
        .any(|e| e.kind == TideKind::Low && (e.time - t).abs() < proximity)
}

/// Scan up to a week of forecast hours from `now` for the best daylight hour
///
/// Hours before `now`, outside 05:00-18:00 or with waves under 1 ft are
/// skipped. Ties keep the earliest hour.
pub fn best_window(series: &HourlySeries, now: NaiveDateTime, config: &BreakConfig) -> Option<BestWindow> {
    let mut best: Option<BestWindow> = None;

    for (i, &t) in series.time.iter().enumerate().take(BEST_WINDOW_HORIZON_HOURS) {
        if t < now {
            continue;
        }
        let Some(height) = value_at(&series.wave_height_ft, i).or_else(|| series.swell_height_at(i))
        else {
            continue;
        };
        if height < 1.0 {
            continue;
        }
        let hour = t.hour();
        if !(DAYLIGHT_FIRST_HOUR..=DAYLIGHT_LAST_HOUR).contains(&hour) {
            continue;
        }

        let period = value_at(&series.wave_period_s, i).or_else(|| series.swell_period_at(i));
        let rating = surf_rating(
            Some(height),
            period,
            series.wind_speed_at(i),
            value_at(&series.swell_direction_deg, i),
            config,
        );

        let mut score = f64::from(rating);
        if low_tide_near(series, t) {
            score += LOW_TIDE_BONUS;
        }
        if hour <= MORNING_LAST_HOUR {
            score += MORNING_BONUS;
        }

        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(BestWindow {
                time: t,
                hour_index: i,
                score,
                wave_height_ft: height,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TideExtreme;
    use chrono::NaiveDate;

    fn at(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    #[test]
    fn test_direction_classes() {
        let config = BreakConfig::default();
        assert_eq!(DirectionClass::classify(136.0, &config), DirectionClass::In);
        assert_eq!(DirectionClass::classify(112.0, &config), DirectionClass::Edge);
        assert_eq!(DirectionClass::classify(163.0, &config), DirectionClass::Edge);
        assert_eq!(DirectionClass::classify(170.0, &config), DirectionClass::Out);
    }

    #[test]
    fn test_surf_rating_extremes() {
        let config = BreakConfig::default();
        // 2 + 1 + 1.5 + 0.5 = 5
        assert_eq!(
            surf_rating(Some(4.0), Some(12.0), Some(5.0), Some(140.0), &config),
            5
        );
        assert_eq!(surf_rating(None, None, None, None, &config), 1);
        assert_eq!(
            surf_rating(Some(0.5), Some(4.0), Some(30.0), Some(300.0), &config),
            1
        );
        // 1.5 + 0.5 + 1.0 = 3
        assert_eq!(
            surf_rating(Some(2.5), Some(8.0), Some(10.0), Some(250.0), &config),
            3
        );
    }

    #[test]
    fn test_conditions_summary_sentences() {
        let config = BreakConfig::default();
        assert_eq!(
            conditions_summary(Some(3.5), Some(11.0), Some(5.0), Some(136.0), &config),
            "Chest high long-period surf, light winds, swell in the window."
        );
        assert_eq!(
            conditions_summary(Some(0.5), None, Some(30.0), Some(160.0), &config),
            "Flat conditions, strong winds, swell on edge of window."
        );
        assert_eq!(
            conditions_summary(Some(2.5), Some(6.0), Some(18.0), Some(40.0), &config),
            "Waist high short-period surf, moderate winds."
        );
        assert_eq!(conditions_summary(None, None, None, None, &config), "");
    }

    #[test]
    fn test_rating_labels() {
        assert_eq!(RatingLabel::for_score(5), RatingLabel::Epic);
        assert_eq!(RatingLabel::for_score(3).as_str(), "Fair");
        assert_eq!(RatingLabel::for_score(1), RatingLabel::Flat);
    }

    fn make_series(hours: usize) -> HourlySeries {
        HourlySeries {
            time: (0..hours as i64).map(at).collect(),
            wave_height_ft: vec![Some(3.5); hours],
            wave_period_s: vec![Some(9.0); hours],
            swell_direction_deg: vec![Some(140.0); hours],
            wind_speed_mph: vec![Some(10.0); hours],
            ..Default::default()
        }
    }

    #[test]
    fn test_best_window_prefers_morning() {
        let series = make_series(24);
        let best = best_window(&series, at(0), &BreakConfig::default()).unwrap();
        assert_eq!(best.hour_index, 5);
        assert!((best.score - 4.2).abs() < 1e-9);
    }

    #[test]
    fn test_best_window_low_tide_bonus() {
        let mut series = make_series(24);
        series.tide_extrema.push(TideExtreme {
            time: at(14),
            kind: TideKind::Low,
            height_ft: -0.3,
        });
        let best = best_window(&series, at(0), &BreakConfig::default()).unwrap();
        // Afternoon low tide outweighs the morning bonus
        assert_eq!(best.hour_index, 13);
        assert!((best.score - 4.3).abs() < 1e-9);
    }

    #[test]
    fn test_best_window_skips_past_night_and_small() {
        let mut series = make_series(48);
        for h in series.wave_height_ft.iter_mut().take(24) {
            *h = Some(0.5);
        }
        let best = best_window(&series, at(20), &BreakConfig::default()).unwrap();
        assert_eq!(best.hour_index, 29);

        let flat = HourlySeries {
            wave_height_ft: vec![Some(0.5); 48],
            ..make_series(48)
        };
        assert!(best_window(&flat, at(0), &BreakConfig::default()).is_none());
    }
}
