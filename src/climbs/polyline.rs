//! Elevation profile polyline decoding.
//!
//! Profiles arrive as encoded-polyline varint pairs of
//! `(distance delta, elevation delta)`. Route sources usually encode raw
//! meters (precision 1), but some use the standard 1e5 scale, so decoding
//! validates the result and falls back.

use crate::climbs::types::ClimbSegment;
use crate::metrics::smoothing::centered_moving_average;
use serde::{Deserialize, Serialize};

/// Scale used by route sources that encode raw meters.
const DEFAULT_PRECISION: f64 = 1.0;
/// Standard encoded-polyline scale.
const ALT_PRECISION: f64 = 1e5;
/// Largest plausible route distance (m).
const MAX_DISTANCE_M: f64 = 1_000_000.0;
/// Plausible elevation range (m).
const MIN_ELEVATION_M: f64 = -500.0;
const MAX_ELEVATION_M: f64 = 9_000.0;
/// Smoothing window for decoded profiles.
pub const SMOOTHING_WINDOW: usize = 5;
/// Segment length used for lookahead analysis (m).
pub const SEGMENT_LENGTH_M: f64 = 100.0;

/// A point on an elevation profile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElevationPoint {
    /// Distance from profile start (m)
    pub distance_m: f64,
    /// Altitude (m)
    pub elevation_m: f64,
}

/// Polyline decoding errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolylineError {
    #[error("Empty polyline")]
    Empty,

    #[error("Invalid character {0:?} at offset {1}")]
    InvalidCharacter(char, usize),

    #[error("Varint overflow at offset {0}")]
    Overflow(usize),

    #[error("Decoded values out of range with both precisions")]
    OutOfRange,
}

/// Decode a profile, validating the values and falling back to the 1e5 scale.
pub fn decode(encoded: &str) -> Result<Vec<ElevationPoint>, PolylineError> {
    if encoded.is_empty() {
        return Err(PolylineError::Empty);
    }

    let points = decode_with_precision(encoded, DEFAULT_PRECISION)?;
    if points.is_empty() {
        return Err(PolylineError::Empty);
    }

    let plausible = points.iter().all(|p| {
        (0.0..=MAX_DISTANCE_M).contains(&p.distance_m)
            && (MIN_ELEVATION_M..=MAX_ELEVATION_M).contains(&p.elevation_m)
    });
    if plausible {
        return Ok(points);
    }

    tracing::warn!("Polyline values implausible at precision 1, retrying at 1e5");
    let points = decode_with_precision(encoded, ALT_PRECISION)?;
    let valid = !points.is_empty()
        && points
            .iter()
            .all(|p| p.distance_m >= 0.0 && p.elevation_m >= MIN_ELEVATION_M);
    if valid {
        Ok(points)
    } else {
        Err(PolylineError::OutOfRange)
    }
}

fn decode_with_precision(encoded: &str, precision: f64) -> Result<Vec<ElevationPoint>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut distance = 0.0;
    let mut elevation = 0.0;
    let mut points = Vec::new();

    while index < bytes.len() {
        let distance_delta = next_value(bytes, &mut index)?;
        let elevation_delta = next_value(bytes, &mut index)?;
        distance += distance_delta as f64 / precision;
        elevation += elevation_delta as f64 / precision;
        points.push(ElevationPoint {
            distance_m: distance,
            elevation_m: elevation,
        });
    }

    Ok(points)
}

/// Read one zigzag varint. A truncated value ends the stream.
fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    while *index < bytes.len() {
        let offset = *index;
        let raw = bytes[offset];
        if !(63..=126).contains(&raw) {
            return Err(PolylineError::InvalidCharacter(raw as char, offset));
        }
        if shift > 60 {
            return Err(PolylineError::Overflow(offset));
        }
        *index += 1;

        let chunk = (raw - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Smooth elevations with a centred moving average.
pub fn smooth(points: &[ElevationPoint], window: usize) -> Vec<ElevationPoint> {
    let elevations: Vec<f64> = points.iter().map(|p| p.elevation_m).collect();
    centered_moving_average(&elevations, window)
        .into_iter()
        .zip(points)
        .map(|(elevation_m, p)| ElevationPoint {
            distance_m: p.distance_m,
            elevation_m,
        })
        .collect()
}

/// Points inside `[start, start + length]`, re-based to climb-relative distance.
pub fn extract_climb_profile(points: &[ElevationPoint], start_m: f64, length_m: f64) -> Vec<ElevationPoint> {
    let end_m = start_m + length_m;
    points
        .iter()
        .filter(|p| (start_m..=end_m).contains(&p.distance_m))
        .map(|p| ElevationPoint {
            distance_m: p.distance_m - start_m,
            elevation_m: p.elevation_m,
        })
        .collect()
}

/// Split a climb profile into fixed-length segments.
///
/// Each segment's grade runs from the last point at or before its start to
/// the first point at or after its end (or the final point).
pub fn build_segments(points: &[ElevationPoint], total_length_m: f64, segment_length_m: f64) -> Vec<ClimbSegment> {
    if points.len() < 2 || segment_length_m <= 0.0 {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut seg_start = 0.0;

    while seg_start < total_length_m {
        let seg_end = (seg_start + segment_length_m).min(total_length_m);

        let start_point = points.iter().rev().find(|p| p.distance_m <= seg_start);
        let end_point = points
            .iter()
            .find(|p| p.distance_m >= seg_end)
            .or_else(|| points.last());

        let grade_percent = match (start_point, end_point) {
            (Some(a), Some(b)) if b.distance_m > a.distance_m => {
                (b.elevation_m - a.elevation_m) / (b.distance_m - a.distance_m) * 100.0
            }
            _ => 0.0,
        };

        let start_elevation = start_point.map(|p| p.elevation_m).unwrap_or(0.0);
        let end_elevation = end_point.map(|p| p.elevation_m).unwrap_or(start_elevation);

        segments.push(ClimbSegment {
            start_distance_m: seg_start,
            end_distance_m: seg_end,
            length_m: seg_end - seg_start,
            grade_percent,
            elevation_m: end_elevation - start_elevation,
        });

        seg_start = seg_end;
    }

    segments
}
