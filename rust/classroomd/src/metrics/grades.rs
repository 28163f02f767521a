use crate::dates;
use crate::metrics::MetricsError;
use crate::model::{Assignment, Grade, Id};
use chrono::{Datelike, Months, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;

pub const NEUTRAL_BADGE: &str = "status-badge bg-gray-100 text-gray-800";
pub const DEFAULT_TOTAL_POINTS: f64 = 100.0;

/// Half-up rounding to one decimal: `floor(10x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

/// Unrounded mean score, `None` when there is nothing to average.
pub fn mean_score<'a, I>(grades: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Grade>,
{
    let mut sum = 0.0_f64;
    let mut count = 0_usize;
    for g in grades {
        sum += g.score;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Mean score rounded to one decimal; 0 for no grades. Assignment totals
/// play no part in the weighting.
pub fn average_of<'a, I>(grades: I) -> f64
where
    I: IntoIterator<Item = &'a Grade>,
{
    mean_score(grades).map(round_off_1_decimal).unwrap_or(0.0)
}

pub fn letter_grade(average: f64) -> LetterGrade {
    if average >= 90.0 {
        LetterGrade::A
    } else if average >= 80.0 {
        LetterGrade::B
    } else if average >= 70.0 {
        LetterGrade::C
    } else if average >= 60.0 {
        LetterGrade::D
    } else {
        LetterGrade::F
    }
}

pub fn badge_class(letter: Option<LetterGrade>) -> &'static str {
    match letter {
        Some(LetterGrade::A) => "grade-a",
        Some(LetterGrade::B) => "grade-b",
        Some(LetterGrade::C) => "grade-c",
        Some(LetterGrade::D) => "grade-d",
        Some(LetterGrade::F) => "grade-f",
        None => NEUTRAL_BADGE,
    }
}

pub fn grade_color(average: f64) -> &'static str {
    match letter_grade(average) {
        LetterGrade::A => "text-green-600",
        LetterGrade::B => "text-blue-600",
        LetterGrade::C => "text-yellow-600",
        LetterGrade::D => "text-orange-600",
        LetterGrade::F => "text-red-600",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub submitted: usize,
    pub average: f64,
    pub total: f64,
}

/// `grades` are the rows recorded against one assignment. A missing or
/// non-positive `total_points` reports the default of 100.
pub fn assignment_stats(grades: &[Grade], total_points: Option<f64>) -> AssignmentStats {
    let total = total_points
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(DEFAULT_TOTAL_POINTS);
    AssignmentStats {
        submitted: grades.len(),
        average: average_of(grades),
        total,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint<L> {
    pub x: L,
    pub y: f64,
}

/// Ordinary least-squares fit of `y` against the point's position
/// (0..n-1), evaluated back at every point and clamped into [0, 100]. The
/// caller's `x` label is carried through untouched and never enters the
/// regression.
pub fn trend_line<L: Clone>(points: &[SeriesPoint<L>]) -> Result<Vec<SeriesPoint<L>>, MetricsError> {
    if let Some(index) = points.iter().position(|p| !p.y.is_finite()) {
        return Err(MetricsError::NonFiniteValue { index });
    }
    let n = points.len();
    if n < 2 {
        return Ok(Vec::new());
    }

    let nf = n as f64;
    let mut sum_x = 0.0_f64;
    let mut sum_y = 0.0_f64;
    let mut sum_xy = 0.0_f64;
    let mut sum_xx = 0.0_f64;
    for (i, p) in points.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += p.y;
        sum_xy += x * p.y;
        sum_xx += x * x;
    }

    // n >= 2 with distinct integer x keeps the denominator positive.
    let slope = (nf * sum_xy - sum_x * sum_y) / (nf * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / nf;

    Ok(points
        .iter()
        .enumerate()
        .map(|(i, p)| SeriesPoint {
            x: p.x.clone(),
            y: (slope * i as f64 + intercept).clamp(0.0, 100.0),
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    High,
    Medium,
    Low,
}

impl Consistency {
    fn from_spread(spread: f64) -> Self {
        if spread < 15.0 {
            Consistency::High
        } else if spread < 30.0 {
            Consistency::Medium
        } else {
            Consistency::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub trend: Trend,
    pub consistency: Consistency,
    pub total_assignments: usize,
}

/// Summarises grades in the order given (callers sort by date first).
/// A flat or single-point fit counts as declining.
pub fn performance_summary(grades: &[Grade]) -> Result<Option<PerformanceSummary>, MetricsError> {
    if grades.is_empty() {
        return Ok(None);
    }

    let points: Vec<SeriesPoint<usize>> = grades
        .iter()
        .enumerate()
        .map(|(i, g)| SeriesPoint { x: i, y: g.score })
        .collect();
    let fitted = trend_line(&points)?;
    let trend = match (fitted.first(), fitted.last()) {
        (Some(first), Some(last)) if last.y > first.y => Trend::Improving,
        _ => Trend::Declining,
    };

    let highest = grades.iter().map(|g| g.score).fold(f64::MIN, f64::max);
    let lowest = grades.iter().map(|g| g.score).fold(f64::MAX, f64::min);

    Ok(Some(PerformanceSummary {
        average: average_of(grades),
        highest,
        lowest,
        trend,
        consistency: Consistency::from_spread(highest - lowest),
        total_assignments: grades.len(),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportingPeriod {
    #[default]
    All,
    Last30,
    Last60,
    Last90,
    ThisMonth,
    LastMonth,
}

impl ReportingPeriod {
    pub const ALL: &'static [&'static str] =
        &["all", "last30", "last60", "last90", "thisMonth", "lastMonth"];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "all" => Some(Self::All),
            "last30" => Some(Self::Last30),
            "last60" => Some(Self::Last60),
            "last90" => Some(Self::Last90),
            "thisMonth" => Some(Self::ThisMonth),
            "lastMonth" => Some(Self::LastMonth),
            _ => None,
        }
    }

    fn contains(self, when: NaiveDateTime, now: NaiveDateTime) -> bool {
        let rolling = |months: u32| {
            now.checked_sub_months(Months::new(months))
                .map(|start| when > start && when < now)
                .unwrap_or(false)
        };
        let same_month = |anchor: NaiveDateTime| {
            when.year() == anchor.year() && when.month() == anchor.month()
        };
        match self {
            ReportingPeriod::All => true,
            ReportingPeriod::Last30 => rolling(1),
            ReportingPeriod::Last60 => rolling(2),
            ReportingPeriod::Last90 => rolling(3),
            ReportingPeriod::ThisMonth => same_month(now),
            ReportingPeriod::LastMonth => now
                .checked_sub_months(Months::new(1))
                .map(same_month)
                .unwrap_or(false),
        }
    }
}

/// Grades whose submitted date falls inside `period` relative to `now`.
/// Undated grades only survive `All`.
pub fn filter_by_period(grades: &[Grade], period: ReportingPeriod, now: NaiveDateTime) -> Vec<Grade> {
    if period == ReportingPeriod::All {
        return grades.to_vec();
    }
    grades
        .iter()
        .filter(|g| {
            dates::parse_lenient(g.submitted_date.as_deref())
                .map(|when| period.contains(when, now))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub grade_id: Id,
    pub x: String,
    pub y: f64,
    pub assignment: String,
    pub category: String,
}

/// One scatter point per grade, oldest submission first. Undated grades sort
/// ahead of everything else and keep their relative order.
pub fn chart_points(grades: &[Grade], assignments: &[Assignment]) -> Vec<ChartPoint> {
    let by_id: HashMap<Id, &Assignment> = assignments.iter().map(|a| (a.id, a)).collect();

    let mut ordered: Vec<&Grade> = grades.iter().collect();
    ordered.sort_by_cached_key(|g| dates::parse_lenient(g.submitted_date.as_deref()));

    ordered
        .into_iter()
        .map(|g| {
            let assignment = by_id.get(&g.assignment_id);
            ChartPoint {
                grade_id: g.id,
                x: dates::chart_label(g.submitted_date.as_deref()),
                y: g.score,
                assignment: assignment
                    .map(|a| a.title.clone())
                    .unwrap_or_else(|| "Unknown Assignment".to_string()),
                category: assignment
                    .map(|a| a.category.trim())
                    .filter(|c| !c.is_empty())
                    .unwrap_or("N/A")
                    .to_string(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSeries {
    pub grades: Vec<SeriesPoint<String>>,
    pub trend: Vec<SeriesPoint<String>>,
}

pub fn performance_series(points: &[ChartPoint]) -> Result<PerformanceSeries, MetricsError> {
    let grades: Vec<SeriesPoint<String>> = points
        .iter()
        .map(|p| SeriesPoint {
            x: p.x.clone(),
            y: p.y,
        })
        .collect();
    let trend = trend_line(&grades)?;
    Ok(PerformanceSeries { grades, trend })
}
