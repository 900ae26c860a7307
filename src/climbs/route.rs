//! Route climb translation and live tracking.
//!
//! Route sources announce id-free climbs (start, length, gain, grade) plus an
//! optional elevation polyline. They are turned into [`ClimbInfo`] values
//! with segments, a category and a generated name, then tracked against the
//! rider's distance.

use crate::climbs::polyline::{self, ElevationPoint, SEGMENT_LENGTH_M, SMOOTHING_WINDOW};
use crate::climbs::types::{category_label, ClimbInfo, ClimbSegment};
use crate::sensors::types::{RouteClimb, RouteDefinition};

/// Climbs of the loaded route, ordered as announced.
#[derive(Debug, Clone, Default)]
pub struct RouteClimbs {
    name: String,
    climbs: Vec<ClimbInfo>,
}

impl RouteClimbs {
    /// Translate a route definition.
    ///
    /// A polyline that fails to decode is logged and the climbs fall back to
    /// a single segment each.
    pub fn load(route: &RouteDefinition) -> Self {
        let profile: Vec<ElevationPoint> = match route.elevation_polyline.as_deref() {
            Some(encoded) => match polyline::decode(encoded) {
                Ok(points) => {
                    tracing::debug!("Decoded {} elevation points", points.len());
                    polyline::smooth(&points, SMOOTHING_WINDOW)
                }
                Err(e) => {
                    tracing::warn!("Elevation profile decode failed: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let climbs: Vec<ClimbInfo> = route
            .climbs
            .iter()
            .enumerate()
            .map(|(index, climb)| build_climb_info(index, climb, &profile))
            .collect();

        tracing::info!("Route loaded: {} ({} climbs)", route.name, climbs.len());

        Self {
            name: route.name.clone(),
            climbs,
        }
    }

    /// Route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All route climbs.
    pub fn climbs(&self) -> &[ClimbInfo] {
        &self.climbs
    }

    /// True when the route has no climbs.
    pub fn is_empty(&self) -> bool {
        self.climbs.is_empty()
    }

    /// Climb to show at `distance_m` along the route.
    ///
    /// On a climb it is active with live progress. Between climbs the next
    /// one is returned as an inactive preview. Past the last climb there is
    /// nothing to show.
    pub fn track(&self, distance_m: f64) -> Option<ClimbInfo> {
        let on_climb = self.climbs.iter().find(|c| {
            distance_m >= c.start_distance_m && distance_m < c.start_distance_m + c.length_m
        });

        if let Some(climb) = on_climb {
            let covered = distance_m - climb.start_distance_m;
            let distance_to_top = climb.length_m - covered;
            return Some(ClimbInfo {
                distance_to_top_m: distance_to_top,
                elevation_to_top_m: climb.elevation_m * (distance_to_top / climb.length_m),
                progress: (covered / climb.length_m).clamp(0.0, 1.0),
                is_active: true,
                ..climb.clone()
            });
        }

        self.climbs
            .iter()
            .find(|c| c.start_distance_m > distance_m)
            .map(|next| ClimbInfo {
                distance_to_top_m: next.length_m,
                elevation_to_top_m: next.elevation_m,
                progress: 0.0,
                is_active: false,
                ..next.clone()
            })
    }
}

/// Category from gain and grade: 1 = HC .. 5 = Cat 4.
pub fn categorize_climb(elevation_m: f64, grade_percent: f64) -> u8 {
    let score = elevation_m * grade_percent;
    if score > 8000.0 || (elevation_m > 1000.0 && grade_percent > 7.0) {
        1
    } else if score > 4000.0 || (elevation_m > 600.0 && grade_percent > 6.0) {
        2
    } else if score > 2000.0 || (elevation_m > 400.0 && grade_percent > 5.0) {
        3
    } else if score > 1000.0 || (elevation_m > 200.0 && grade_percent > 4.0) {
        4
    } else {
        5
    }
}

fn build_climb_info(index: usize, climb: &RouteClimb, profile: &[ElevationPoint]) -> ClimbInfo {
    let mut segments: Vec<ClimbSegment> = if profile.is_empty() {
        Vec::new()
    } else {
        let climb_profile =
            polyline::extract_climb_profile(profile, climb.start_distance_m, climb.length_m);
        polyline::build_segments(&climb_profile, climb.length_m, SEGMENT_LENGTH_M)
    };

    if segments.is_empty() {
        segments.push(ClimbSegment {
            start_distance_m: 0.0,
            end_distance_m: climb.length_m,
            length_m: climb.length_m,
            grade_percent: climb.grade_percent,
            elevation_m: climb.total_elevation_m,
        });
    }

    let max_grade = segments
        .iter()
        .map(|s| s.grade_percent)
        .reduce(f64::max)
        .unwrap_or(climb.grade_percent);

    let category = categorize_climb(climb.total_elevation_m, climb.grade_percent);

    ClimbInfo {
        id: format!("route_{}_{}", index, climb.start_distance_m as i64),
        name: format!("{} {:.1}km", category_label(category), climb.length_m / 1000.0),
        category,
        length_m: climb.length_m,
        elevation_m: climb.total_elevation_m,
        avg_grade: climb.grade_percent,
        max_grade,
        segments,
        distance_to_top_m: climb.length_m,
        elevation_to_top_m: climb.total_elevation_m,
        progress: 0.0,
        is_active: false,
        is_from_route: true,
        start_latitude: 0.0,
        start_longitude: 0.0,
        start_distance_m: climb.start_distance_m,
        start_timestamp_ms: 0,
    }
}
