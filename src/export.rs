//! CSV export of the session log

use serde::Serialize;
use std::io::Write;

use crate::error::ComputeError;
use crate::round::RoundTo;
use crate::types::SessionLogEntry;

/// One flattened log row; absent conditions become empty cells
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    date: String,
    size: u8,
    #[serde(rename = "windQuality")]
    wind_quality: u8,
    #[serde(rename = "rideQuality")]
    ride_quality: u8,
    avg: f64,
    notes: &'a str,
    #[serde(rename = "swellH")]
    swell_height_ft: Option<f64>,
    #[serde(rename = "swellDir")]
    swell_direction_deg: Option<f64>,
    #[serde(rename = "swellPer")]
    swell_period_s: Option<f64>,
    #[serde(rename = "windSpd")]
    wind_speed_mph: Option<f64>,
    #[serde(rename = "windDir")]
    wind_direction_deg: Option<f64>,
    #[serde(rename = "tideH")]
    tide_height_ft: Option<f64>,
    #[serde(rename = "tideStage")]
    tide_stage: Option<&'static str>,
    bwi: Option<f64>,
    wos: Option<f64>,
}

impl<'a> From<&'a SessionLogEntry> for CsvRow<'a> {
    fn from(e: &'a SessionLogEntry) -> Self {
        let c = e.conditions.as_ref();
        let swell = c.and_then(|c| c.swell.as_ref());
        let tide = c.and_then(|c| c.tide.as_ref());
        Self {
            id: &e.id,
            date: e.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            size: e.ratings.size,
            wind_quality: e.ratings.wind_quality,
            ride_quality: e.ratings.ride_quality,
            avg: e.ratings.average().round_to(1),
            notes: &e.notes,
            swell_height_ft: swell.map(|s| s.height_ft),
            swell_direction_deg: swell.map(|s| s.direction_deg),
            swell_period_s: swell.map(|s| s.period_s),
            wind_speed_mph: c.map(|c| c.wind.speed_mph),
            wind_direction_deg: c.map(|c| c.wind.direction_deg),
            tide_height_ft: tide.map(|t| t.height_ft),
            tide_stage: tide.map(|t| t.stage.as_str()),
            bwi: c.map(|c| c.derived.blown_water_index),
            wos: c.map(|c| c.derived.offshore_alignment_score),
        }
    }
}

/// Write the log as CSV with a header row
pub fn write_csv<W: Write>(entries: &[SessionLogEntry], writer: W) -> Result<(), ComputeError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        wtr.serialize(CsvRow::from(entry))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render the log as a CSV string
pub fn to_csv_string(entries: &[SessionLogEntry]) -> Result<String, ComputeError> {
    let mut buf = Vec::new();
    write_csv(entries, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Conditions, DerivedConditions, Ratings, SwellReading, TideStage, TideState, WindReading,
    };
    use chrono::NaiveDate;

    fn make_entry(with_conditions: bool) -> SessionLogEntry {
        SessionLogEntry {
            id: "abc".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 4)
                .unwrap()
                .and_hms_opt(6, 30, 0)
                .unwrap(),
            ratings: Ratings {
                size: 6,
                wind_quality: 7,
                ride_quality: 9,
            },
            notes: "glassy, \"fun\" lefts".to_string(),
            conditions: with_conditions.then(|| Conditions {
                swell: Some(SwellReading {
                    height_ft: 3.2,
                    period_s: 11.0,
                    direction_deg: 140.0,
                    secondary: None,
                }),
                wind: WindReading {
                    speed_mph: 6.0,
                    direction_deg: 340.0,
                },
                tide: Some(TideState {
                    height_ft: 1.4,
                    stage: TideStage::Rising,
                    hours_to_next_extreme: 2.0,
                }),
                derived: DerivedConditions {
                    blown_water_index: 0.0,
                    offshore_alignment_score: 0.97,
                },
                lag: None,
            }),
        }
    }

    #[test]
    fn test_header_and_row() {
        let csv = to_csv_string(&[make_entry(true)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,date,size,windQuality,rideQuality,avg,notes,swellH,swellDir,swellPer,windSpd,windDir,tideH,tideStage,bwi,wos"
        );
        assert_eq!(
            lines.next().unwrap(),
            "abc,2024-05-04T06:30:00,6,7,9,7.3,\"glassy, \"\"fun\"\" lefts\",3.2,140.0,11.0,6.0,340.0,1.4,rising,0.0,0.97"
        );
    }

    #[test]
    fn test_missing_conditions_leave_empty_cells() {
        let csv = to_csv_string(&[make_entry(false)]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",,,,,,,,,"));
    }
}
