//! Segment lookahead: tactical insights about the terrain ahead on a climb.
//!
//! Analysis is a pure function of the climb and the rider's progress. It is
//! recomputed on demand and never stored.

use crate::climbs::types::{ClimbInfo, ClimbSegment};
use serde::{Deserialize, Serialize};

/// Grade above which a segment counts as steep (%).
const STEEP_GRADE: f64 = 12.0;
/// Grade above which a segment is dangerous (%).
const DANGEROUS_GRADE: f64 = 18.0;
/// Grade jump between adjacent segments worth announcing (pp).
const GRADIENT_JUMP: f64 = 4.0;
/// Final stretch considered for the final kick (m).
const FINAL_KICK_WINDOW_M: f64 = 500.0;
const FINAL_KICK_MIN_M: f64 = 100.0;
/// HIGH insights closer than this can be primary (m).
const PRIMARY_HIGH_RANGE_M: f64 = 300.0;

/// Kind of insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    SteepSection,
    EasySection,
    GradientChange,
    AttackPoint,
    RecoveryZone,
    FinalKick,
    DangerousSection,
}

impl InsightType {
    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            InsightType::SteepSection => "Steep section",
            InsightType::EasySection => "Easy section",
            InsightType::GradientChange => "Gradient change",
            InsightType::AttackPoint => "Attack point",
            InsightType::RecoveryZone => "Recovery zone",
            InsightType::FinalKick => "Final kick",
            InsightType::DangerousSection => "Dangerous section",
        }
    }
}

/// Insight priority, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// One piece of advice about the terrain ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalInsight {
    pub insight_type: InsightType,
    /// Distance from the rider to the section (m)
    pub distance_ahead_m: f64,
    pub description: String,
    pub recommendation: String,
    pub priority: InsightPriority,
}

/// Analyze the climb ahead of `progress` (0-1).
///
/// Insights are sorted by descending priority, closest first within a tier.
pub fn analyze(climb: &ClimbInfo, progress: f64) -> Vec<TacticalInsight> {
    if climb.segments.is_empty() {
        return Vec::new();
    }

    let position = progress * climb.length_m;
    let upcoming: Vec<&ClimbSegment> = climb
        .segments
        .iter()
        .filter(|s| s.start_distance_m > position)
        .collect();

    let mut insights = Vec::new();
    steep_sections(&upcoming, position, &mut insights);
    recovery_zones(&upcoming, position, &mut insights);
    attack_point(&upcoming, position, &mut insights);
    final_kick(climb, position, &mut insights);
    dangerous_section(&upcoming, position, &mut insights);
    gradient_changes(&upcoming, position, &mut insights);
    easy_section(climb, &upcoming, position, &mut insights);

    insights.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.distance_ahead_m.total_cmp(&b.distance_ahead_m))
    });
    insights
}

/// The single most actionable insight: first CRITICAL, else the first close
/// HIGH, else the top of the list.
pub fn primary_insight(climb: &ClimbInfo, progress: f64) -> Option<TacticalInsight> {
    select_primary(analyze(climb, progress))
}

/// Pick the primary insight from an already sorted list.
pub fn select_primary(insights: Vec<TacticalInsight>) -> Option<TacticalInsight> {
    let critical = insights
        .iter()
        .position(|i| i.priority == InsightPriority::Critical);
    let close_high = insights.iter().position(|i| {
        i.priority == InsightPriority::High && i.distance_ahead_m < PRIMARY_HIGH_RANGE_M
    });

    let index = critical.or(close_high).unwrap_or(0);
    insights.into_iter().nth(index)
}

fn steep_sections(upcoming: &[&ClimbSegment], position: f64, out: &mut Vec<TacticalInsight>) {
    for seg in upcoming.iter().filter(|s| s.grade_percent > STEEP_GRADE).take(2) {
        let ahead = seg.start_distance_m - position;
        let recommendation = if ahead < 100.0 {
            "Steep now, shift down and stay seated".to_string()
        } else if ahead < 300.0 {
            format!("Steep in {}m, ease off 10W now", ahead as i64)
        } else {
            format!("Steep section at {}m, plan your effort", ahead as i64)
        };
        out.push(TacticalInsight {
            insight_type: InsightType::SteepSection,
            distance_ahead_m: ahead,
            description: format!("{}% for {}m", seg.grade_percent as i64, seg.length_m as i64),
            recommendation,
            priority: if ahead < 200.0 {
                InsightPriority::High
            } else {
                InsightPriority::Medium
            },
        });
    }
}

fn recovery_zones(upcoming: &[&ClimbSegment], position: f64, out: &mut Vec<TacticalInsight>) {
    for pair in upcoming.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if current.grade_percent > 8.0 && next.grade_percent < 5.0 {
            let ahead = next.start_distance_m - position;
            out.push(TacticalInsight {
                insight_type: InsightType::RecoveryZone,
                distance_ahead_m: ahead,
                description: format!("{}% for {}m", next.grade_percent as i64, next.length_m as i64),
                recommendation: format!("Recovery zone at {}m, rebuild W'", ahead as i64),
                priority: InsightPriority::Medium,
            });
        }
    }
}

fn attack_point(upcoming: &[&ClimbSegment], position: f64, out: &mut Vec<TacticalInsight>) {
    let found = upcoming
        .windows(2)
        .find(|pair| pair[0].grade_percent < 6.0 && pair[1].grade_percent > 10.0);

    if let Some(pair) = found {
        out.push(TacticalInsight {
            insight_type: InsightType::AttackPoint,
            distance_ahead_m: pair[0].start_distance_m - position,
            description: "Easier ground before a steep ramp".to_string(),
            recommendation: "Surge here to open a gap before the wall".to_string(),
            priority: InsightPriority::Low,
        });
    }
}

fn final_kick(climb: &ClimbInfo, position: f64, out: &mut Vec<TacticalInsight>) {
    let remaining = climb.length_m - position;
    if !(FINAL_KICK_MIN_M..=FINAL_KICK_WINDOW_M).contains(&remaining) {
        return;
    }

    let final_grades: Vec<f64> = climb
        .segments
        .iter()
        .filter(|s| s.end_distance_m >= climb.length_m - FINAL_KICK_WINDOW_M)
        .map(|s| s.grade_percent)
        .collect();
    let final_grade = if final_grades.is_empty() {
        climb.avg_grade
    } else {
        final_grades.iter().sum::<f64>() / final_grades.len() as f64
    };

    let recommendation = if final_grade < climb.avg_grade {
        "Finish is easier, go all out"
    } else if final_grade > climb.avg_grade + 2.0 {
        "Finish is steep, save something for the end"
    } else {
        "Consistent finish, hold your effort"
    };

    out.push(TacticalInsight {
        insight_type: InsightType::FinalKick,
        distance_ahead_m: remaining,
        description: format!("Final {}m at {}%", remaining as i64, final_grade as i64),
        recommendation: recommendation.to_string(),
        priority: InsightPriority::High,
    });
}

fn dangerous_section(upcoming: &[&ClimbSegment], position: f64, out: &mut Vec<TacticalInsight>) {
    if let Some(seg) = upcoming.iter().find(|s| s.grade_percent > DANGEROUS_GRADE) {
        out.push(TacticalInsight {
            insight_type: InsightType::DangerousSection,
            distance_ahead_m: seg.start_distance_m - position,
            description: format!("Max {}% gradient", seg.grade_percent as i64),
            recommendation: "Extreme gradient, lowest gear and consider standing".to_string(),
            priority: InsightPriority::Critical,
        });
    }
}

fn gradient_changes(upcoming: &[&ClimbSegment], position: f64, out: &mut Vec<TacticalInsight>) {
    for pair in upcoming.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if next.grade_percent - current.grade_percent <= GRADIENT_JUMP {
            continue;
        }
        let ahead = next.start_distance_m - position;
        if ahead < 500.0 {
            out.push(TacticalInsight {
                insight_type: InsightType::GradientChange,
                distance_ahead_m: ahead,
                description: format!(
                    "{}% to {}%",
                    current.grade_percent as i64, next.grade_percent as i64
                ),
                recommendation: format!("Grade ramps up in {}m, get ready to shift", ahead as i64),
                priority: if ahead < 150.0 {
                    InsightPriority::High
                } else {
                    InsightPriority::Medium
                },
            });
        }
    }
}

fn easy_section(climb: &ClimbInfo, upcoming: &[&ClimbSegment], position: f64, out: &mut Vec<TacticalInsight>) {
    if climb.avg_grade <= 6.0 {
        return;
    }

    let easy = upcoming
        .iter()
        .find(|s| s.grade_percent < 4.0 && s.length_m > 50.0);
    if let Some(seg) = easy {
        let ahead = seg.start_distance_m - position;
        if ahead < 800.0 {
            out.push(TacticalInsight {
                insight_type: InsightType::EasySection,
                distance_ahead_m: ahead,
                description: format!("{}% for {}m", seg.grade_percent as i64, seg.length_m as i64),
                recommendation: format!("Easier section at {}m, recover here", ahead as i64),
                priority: InsightPriority::Low,
            });
        }
    }
}
