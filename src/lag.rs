//! Swell travel-time estimation
//!
//! Swell energy recorded at an offshore sensor reaches the break later, at the
//! deep-water group velocity `v_g = g·T/(4π)`. The builder uses the resulting
//! lag to sample swell fields at the time the energy now arriving was observed.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::HourlySeries;

/// Gravitational acceleration (m/s²)
pub const GRAVITY_MS2: f64 = 9.81;

/// Metres per statute mile
pub const METERS_PER_MILE: f64 = 1609.34;

/// Period samples this many hours before the session start the averaging window
pub const LAG_WINDOW_START_HOURS: i64 = 5;

/// Period samples this many hours before the session end the averaging window
pub const LAG_WINDOW_END_HOURS: i64 = 2;

/// Longest lag applied; anything beyond comes from a corrupt period sample
pub const MAX_LAG_HOURS: f64 = 72.0;

/// Deep-water group velocity (m/s) for a wave period (s)
pub fn group_velocity_ms(period_s: f64) -> f64 {
    GRAVITY_MS2 * period_s / (4.0 * std::f64::consts::PI)
}

/// Travel time of swell energy over a fixed distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwellArrival {
    pub seconds: f64,
    /// Travel time rounded to whole minutes
    pub minutes: i64,
    pub velocity_ms: f64,
}

impl SwellArrival {
    pub fn hours(&self) -> f64 {
        self.seconds / 3600.0
    }

    /// Short human label, e.g. `~2 hr 23 min`
    pub fn label(&self) -> String {
        let hours = self.minutes / 60;
        let mins = self.minutes % 60;
        if hours > 0 {
            format!("~{hours} hr {mins} min")
        } else {
            format!("~{mins} min")
        }
    }
}

/// Travel time for a swell of `period_s` over `distance_miles`
///
/// Returns `None` for a non-positive or non-finite period.
pub fn swell_arrival(period_s: f64, distance_miles: f64) -> Option<SwellArrival> {
    if !period_s.is_finite() || period_s <= 0.0 {
        return None;
    }
    let velocity_ms = group_velocity_ms(period_s);
    let seconds = distance_miles * METERS_PER_MILE / velocity_ms;
    Some(SwellArrival {
        seconds,
        minutes: (seconds / 60.0).round() as i64,
        velocity_ms,
    })
}

/// Result of a lag estimate for one target time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagEstimate {
    /// Zero when the averaging window held no period samples
    pub lag_hours: f64,
    pub mean_period_s: Option<f64>,
    pub samples: usize,
}

impl LagEstimate {
    /// No correction: sample swell at the target time itself
    pub fn direct() -> Self {
        Self {
            lag_hours: 0.0,
            mean_period_s: None,
            samples: 0,
        }
    }

    /// The time swell fields should be sampled at for target `t`
    ///
    /// Falls back to `t` itself when the shifted time is not representable.
    pub fn sample_time(&self, t: NaiveDateTime) -> NaiveDateTime {
        if !self.lag_hours.is_finite() {
            return t;
        }
        Duration::try_milliseconds((self.lag_hours * 3_600_000.0).round() as i64)
            .and_then(|lag| t.checked_sub_signed(lag))
            .unwrap_or(t)
    }
}

/// Estimates swell lag from a fixed sensor-to-break distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwellLagEstimator {
    distance_miles: f64,
}

impl SwellLagEstimator {
    pub fn new(distance_miles: f64) -> Self {
        Self { distance_miles }
    }

    pub fn distance_miles(&self) -> f64 {
        self.distance_miles
    }

    /// Lag in hours for a known mean period
    pub fn lag_for_period(&self, period_s: f64) -> f64 {
        swell_arrival(period_s, self.distance_miles)
            .map(|a| a.hours())
            .unwrap_or(0.0)
    }

    /// Estimate the lag for target `t` from the periods observed 2-5 h before it
    ///
    /// `series.time` must be ascending.
    pub fn estimate(&self, series: &HourlySeries, t: NaiveDateTime) -> LagEstimate {
        let window_start = t - Duration::hours(LAG_WINDOW_START_HOURS);
        let window_end = t - Duration::hours(LAG_WINDOW_END_HOURS);

        let (sum, count) = series
            .hours_between(window_start, window_end)
            .filter_map(|i| series.swell_period_at(i))
            .filter(|p| *p > 0.0)
            .fold((0.0, 0usize), |(s, c), p| (s + p, c + 1));

        if count == 0 {
            return LagEstimate::direct();
        }

        let mean_period = sum / count as f64;
        let lag_hours = self.lag_for_period(mean_period);
        if !lag_hours.is_finite() || lag_hours > MAX_LAG_HOURS {
            tracing::debug!(%t, mean_period, lag_hours, "discarding implausible swell lag");
            return LagEstimate::direct();
        }
        LagEstimate {
            lag_hours,
            mean_period_s: Some(mean_period),
            samples: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    fn series_with_periods(periods: Vec<Option<f64>>) -> HourlySeries {
        HourlySeries {
            time: (0..periods.len() as i64).map(at).collect(),
            swell_period_s: periods,
            ..Default::default()
        }
    }

    #[test]
    fn test_group_velocity_twelve_seconds() {
        assert!((group_velocity_ms(12.0) - 9.366).abs() < 0.01);
    }

    #[test]
    fn test_arrival_over_fifty_miles() {
        let arrival = swell_arrival(12.0, 50.0).unwrap();
        assert!((arrival.seconds - 8594.0).abs() < 10.0);
        assert_eq!(arrival.minutes, 143);
        assert_eq!(arrival.label(), "~2 hr 23 min");
    }

    #[test]
    fn test_short_arrival_label() {
        let arrival = swell_arrival(14.0, 5.0).unwrap();
        assert!(arrival.label().starts_with('~'));
        assert!(!arrival.label().contains("hr"));
    }

    #[test]
    fn test_non_positive_period_has_no_arrival() {
        assert!(swell_arrival(0.0, 50.0).is_none());
        assert!(swell_arrival(-3.0, 50.0).is_none());
        assert!(swell_arrival(f64::NAN, 50.0).is_none());
    }

    #[test]
    fn test_empty_window_means_direct_sampling() {
        // Only samples at or after t-1h: nothing in [t-5h, t-2h]
        let series = series_with_periods(vec![None, None, None, None, None, None, Some(10.0)]);
        let estimate = SwellLagEstimator::new(50.0).estimate(&series, at(6));
        assert_eq!(estimate, LagEstimate::direct());
        assert_eq!(estimate.sample_time(at(6)), at(6));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let mut periods = vec![None; 10];
        periods[3] = Some(8.0); // t-5h
        periods[6] = Some(12.0); // t-2h
        periods[7] = Some(100.0); // t-1h, outside
        let series = series_with_periods(periods);
        let estimate = SwellLagEstimator::new(50.0).estimate(&series, at(8));
        assert_eq!(estimate.samples, 2);
        assert_eq!(estimate.mean_period_s, Some(10.0));
        assert!(estimate.lag_hours > 0.0);
    }

    #[test]
    fn test_lag_grows_with_distance_and_shrinks_with_period() {
        let near = SwellLagEstimator::new(20.0);
        let far = SwellLagEstimator::new(80.0);
        assert!(far.lag_for_period(10.0) > near.lag_for_period(10.0));
        // Longer periods travel faster, so the lag shrinks as the period grows
        assert!(near.lag_for_period(8.0) > near.lag_for_period(16.0));
    }

    #[test]
    fn test_sample_time_subtracts_lag() {
        let estimate = LagEstimate {
            lag_hours: 2.5,
            mean_period_s: Some(12.0),
            samples: 4,
        };
        assert_eq!(
            estimate.sample_time(at(10)),
            at(7) + Duration::minutes(30)
        );
    }

    #[test]
    fn test_tiny_period_falls_back_to_direct_sampling() {
        let mut periods = vec![None; 10];
        periods[4] = Some(1e-9);
        let series = series_with_periods(periods);
        let estimate = SwellLagEstimator::new(50.0).estimate(&series, at(8));
        assert_eq!(estimate, LagEstimate::direct());
        assert_eq!(estimate.sample_time(at(8)), at(8));
    }

    #[test]
    fn test_huge_distance_does_not_shift_out_of_range() {
        let mut periods = vec![None; 10];
        periods[4] = Some(12.0);
        let series = series_with_periods(periods);
        let estimate = SwellLagEstimator::new(1e13).estimate(&series, at(8));
        assert_eq!(estimate.lag_hours, 0.0);

        let unrepresentable = LagEstimate {
            lag_hours: 1e15,
            mean_period_s: Some(12.0),
            samples: 1,
        };
        assert_eq!(unrepresentable.sample_time(at(8)), at(8));
    }
}
