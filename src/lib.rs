//! Surf Match - personalized surf-session matching engine
//!
//! Surf Match correlates a surfer's self-rated sessions with the ocean and
//! weather conditions at the time, then scans a forecast for the hours most
//! like past good sessions. The pipeline is deterministic: hourly series →
//! conditions snapshot → feature vectors → ridge regression → similarity
//! search → report encoding.
//!
//! ## Modules
//!
//! - **Conditions**: snapshot construction with a swell travel-time correction
//! - **Model**: feature extraction, normalization and the normal-equation trainer
//! - **Matching**: similarity, prediction and the best-match-per-day search
//! - **Baseline rating**: a log-free 1-5 heuristic and best-window finder

pub mod compass;
pub mod config;
pub mod encoder;
pub mod error;
pub mod export;
pub mod features;
pub mod lag;
pub mod linalg;
pub mod matcher;
pub mod normalizer;
pub mod pipeline;
pub mod rating;
pub mod round;
pub mod search;
pub mod snapshot;
pub mod trainer;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{BreakConfig, EngineConfig, ModelConfig, SwellWindow};
pub use encoder::ReportEncoder;
pub use error::ComputeError;
pub use features::{FeatureExtractor, WAVE_FEATURE_NAMES, WIND_FEATURE_NAMES};
pub use lag::SwellLagEstimator;
pub use pipeline::{best_matches_json, ModelSlot, SurfLogProcessor};
pub use search::{best_match_per_day, compare};
pub use snapshot::{HistoricalQuery, HistoricalSource, SnapshotBuilder};
pub use trainer::{ModelKind, Trainer};
pub use types::{
    Conditions, DayMatch, HourlySeries, MatchReport, ModelSet, Ratings, SessionLogEntry,
    TrainedModel,
};

/// Library version embedded in all reports
pub const SURF_MATCH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "surf-match";
