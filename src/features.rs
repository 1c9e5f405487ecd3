//! Feature extraction
//!
//! This module maps a conditions snapshot to the fixed-order vectors the
//! regression models are trained on:
//! - wave features (target: 0.75 × size + 0.25 × ride quality)
//! - wind features (target: wind quality)
//!
//! Order and dimensionality are part of the model contract; changing either
//! invalidates every trained model.

use crate::config::SwellWindow;
use crate::types::Conditions;

pub const WAVE_FEATURE_COUNT: usize = 9;
pub const WIND_FEATURE_COUNT: usize = 2;

/// Cap on how far outside the swell window a direction is measured
pub const MAX_OUTSIDE_DEG: f64 = 45.0;

pub const WAVE_FEATURE_NAMES: [&str; WAVE_FEATURE_COUNT] = [
    "swell_height",
    "swell_period",
    "swell_dir_alignment",
    "swell_dir_outside_deg",
    "sec_swell_height",
    "sec_swell_period",
    "sec_dir_in_window",
    "tide_height",
    "tide_stage",
];

pub const WIND_FEATURE_NAMES: [&str; WIND_FEATURE_COUNT] = ["wind_speed", "wind_offshore_score"];

pub type WaveFeatures = [f64; WAVE_FEATURE_COUNT];
pub type WindFeatures = [f64; WIND_FEATURE_COUNT];

/// Both feature vectors for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionFeatures {
    /// `None` when the snapshot carries no swell
    pub wave: Option<WaveFeatures>,
    pub wind: WindFeatures,
}

/// Linear alignment with the window center: 1.0 at the center, 0.0 at the edges and beyond
pub fn direction_alignment(direction_deg: f64, window: &SwellWindow) -> f64 {
    (1.0 - (direction_deg - window.center()).abs() / window.half_width()).max(0.0)
}

/// Degrees beyond the nearer window edge, 0 inside the window, capped at 45
pub fn degrees_outside(direction_deg: f64, window: &SwellWindow) -> f64 {
    (window.min_deg - direction_deg)
        .max(direction_deg - window.max_deg)
        .clamp(0.0, MAX_OUTSIDE_DEG)
}

/// Feature extractor bound to one break's swell window
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    window: SwellWindow,
}

impl FeatureExtractor {
    pub fn new(window: SwellWindow) -> Self {
        Self { window }
    }

    /// Extract both vectors from a snapshot
    pub fn extract(&self, conditions: &Conditions) -> ConditionFeatures {
        ConditionFeatures {
            wave: self.wave(conditions),
            wind: Self::wind(conditions),
        }
    }

    /// Wave feature vector, or `None` when the snapshot has no swell
    ///
    /// Secondary swell direction only contributes an in-window flag; it does
    /// not stand in for the primary direction.
    pub fn wave(&self, conditions: &Conditions) -> Option<WaveFeatures> {
        let swell = conditions.swell.as_ref()?;

        let (sec_height, sec_period, sec_in_window) = match &swell.secondary {
            Some(sec) => (
                sec.height_ft,
                sec.period_s,
                if self.window.contains(sec.direction_deg) { 1.0 } else { 0.0 },
            ),
            None => (0.0, 0.0, 0.0),
        };

        let (tide_height, tide_sign) = conditions
            .tide
            .as_ref()
            .map(|t| (t.height_ft, t.stage.sign()))
            .unwrap_or((0.0, 1.0));

        Some([
            swell.height_ft,
            swell.period_s,
            direction_alignment(swell.direction_deg, &self.window),
            degrees_outside(swell.direction_deg, &self.window),
            sec_height,
            sec_period,
            sec_in_window,
            tide_height,
            tide_sign,
        ])
    }

    /// Wind feature vector
    pub fn wind(conditions: &Conditions) -> WindFeatures {
        [
            conditions.wind.speed_mph,
            conditions.derived.offshore_alignment_score,
        ]
    }
}
