//! Climb model and detection settings.

use serde::{Deserialize, Serialize};

/// A fixed-length sub-interval of a climb. Distances are climb-relative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimbSegment {
    /// Start distance from climb start (m)
    pub start_distance_m: f64,
    /// End distance from climb start (m)
    pub end_distance_m: f64,
    /// Segment length (m)
    pub length_m: f64,
    /// Average grade (%)
    pub grade_percent: f64,
    /// Elevation change over the segment (m)
    pub elevation_m: f64,
}

/// A climb, either announced by the route or detected live.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimbInfo {
    /// Stable identifier for this climb instance
    pub id: String,
    /// Display name
    pub name: String,
    /// 1 = HC (hardest) .. 5 = Cat 4, 0 = uncategorized
    pub category: u8,
    /// Climb length (m)
    pub length_m: f64,
    /// Elevation gain (m)
    pub elevation_m: f64,
    /// Average grade (%)
    pub avg_grade: f64,
    /// Maximum grade (%)
    pub max_grade: f64,
    /// Segments ordered by start distance
    pub segments: Vec<ClimbSegment>,
    /// Distance remaining to the top (m)
    pub distance_to_top_m: f64,
    /// Elevation remaining to the top (m)
    pub elevation_to_top_m: f64,
    /// Progress along the climb (0-1)
    pub progress: f64,
    /// Rider is currently on this climb
    pub is_active: bool,
    /// True for route climbs, false for detected ones
    pub is_from_route: bool,
    /// Latitude at climb start
    pub start_latitude: f64,
    /// Longitude at climb start
    pub start_longitude: f64,
    /// Route distance where the climb begins (route climbs only)
    pub start_distance_m: f64,
    /// Epoch ms when detection started (detected climbs only)
    pub start_timestamp_ms: i64,
}

impl ClimbInfo {
    /// Category label: "HC", "Cat 1" .. "Cat 4", or empty.
    pub fn category_label(&self) -> &'static str {
        category_label(self.category)
    }
}

/// Label for a climb category number.
pub fn category_label(category: u8) -> &'static str {
    match category {
        1 => "HC",
        2 => "Cat 1",
        3 => "Cat 2",
        4 => "Cat 3",
        5 => "Cat 4",
        _ => "",
    }
}

/// Detection sensitivity preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSensitivity {
    /// Triggers early on gentle climbs
    Sensitive,
    /// Default thresholds
    #[default]
    Balanced,
    /// Only sustained, clearly real climbs
    Conservative,
}

impl DetectionSensitivity {
    /// Minimum smoothed grade to start (%).
    pub fn min_grade(&self) -> f64 {
        match self {
            DetectionSensitivity::Sensitive => 3.0,
            DetectionSensitivity::Balanced => 4.0,
            DetectionSensitivity::Conservative => 5.0,
        }
    }

    /// Minimum elevation gain to confirm (m).
    pub fn min_elevation(&self) -> f64 {
        match self {
            DetectionSensitivity::Sensitive => 10.0,
            DetectionSensitivity::Balanced => 15.0,
            DetectionSensitivity::Conservative => 25.0,
        }
    }

    /// Distance of climbing needed to confirm (m).
    pub fn confirm_distance(&self) -> f64 {
        match self {
            DetectionSensitivity::Sensitive => 100.0,
            DetectionSensitivity::Balanced => 200.0,
            DetectionSensitivity::Conservative => 300.0,
        }
    }

    /// Distance of flat needed to end a climb (m).
    pub fn end_distance(&self) -> f64 {
        match self {
            DetectionSensitivity::Sensitive => 100.0,
            DetectionSensitivity::Balanced => 150.0,
            DetectionSensitivity::Conservative => 200.0,
        }
    }
}

impl std::fmt::Display for DetectionSensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionSensitivity::Sensitive => write!(f, "Sensitive"),
            DetectionSensitivity::Balanced => write!(f, "Balanced"),
            DetectionSensitivity::Conservative => write!(f, "Conservative"),
        }
    }
}

/// Thresholds used by the climb detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Preset the values came from
    pub sensitivity: DetectionSensitivity,
    /// Minimum smoothed grade to start a potential climb (%)
    pub min_grade: f64,
    /// Minimum accumulated gain to confirm (m)
    pub min_elevation: f64,
    /// Climbing distance needed to confirm (m)
    pub confirm_distance: f64,
    /// Flat distance that ends a climb (m)
    pub end_distance: f64,
    /// True when any value deviates from the preset
    pub is_custom: bool,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self::from_preset(DetectionSensitivity::Balanced)
    }
}

impl DetectionSettings {
    /// Settings for a preset.
    pub fn from_preset(sensitivity: DetectionSensitivity) -> Self {
        Self {
            sensitivity,
            min_grade: sensitivity.min_grade(),
            min_elevation: sensitivity.min_elevation(),
            confirm_distance: sensitivity.confirm_distance(),
            end_distance: sensitivity.end_distance(),
            is_custom: false,
        }
    }

    /// Override individual thresholds on top of a preset.
    pub fn custom(
        sensitivity: DetectionSensitivity,
        min_grade: Option<f64>,
        min_elevation: Option<f64>,
        confirm_distance: Option<f64>,
        end_distance: Option<f64>,
    ) -> Self {
        let preset = Self::from_preset(sensitivity);
        let settings = Self {
            sensitivity,
            min_grade: min_grade.unwrap_or(preset.min_grade),
            min_elevation: min_elevation.unwrap_or(preset.min_elevation),
            confirm_distance: confirm_distance.unwrap_or(preset.confirm_distance),
            end_distance: end_distance.unwrap_or(preset.end_distance),
            is_custom: false,
        };
        Self {
            is_custom: settings.min_grade != preset.min_grade
                || settings.min_elevation != preset.min_elevation
                || settings.confirm_distance != preset.confirm_distance
                || settings.end_distance != preset.end_distance,
            ..settings
        }
    }

    /// Grade below which terrain counts as flat while climbing (%).
    pub fn min_grade_continue(&self) -> f64 {
        (self.min_grade - 1.5).max(2.0)
    }
}
