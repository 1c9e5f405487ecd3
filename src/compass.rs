//! Compass helpers shared by the snapshot builder and the rating heuristics

const POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Smallest angle between two bearings, in [0, 180]
pub fn circular_distance(a_deg: f64, b_deg: f64) -> f64 {
    let d = (a_deg - b_deg).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// 16-point compass label for a bearing
pub fn compass_label(deg: f64) -> &'static str {
    if !deg.is_finite() {
        return "-";
    }
    let normalized = deg.rem_euclid(360.0);
    let idx = (normalized / 22.5).round() as usize % POINTS.len();
    POINTS[idx]
}
