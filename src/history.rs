//! Views over a user's past assessments: latest result, the history table
//! with per-row trend, and the line chart series.
//!
//! Everything here is a pure function of the results it is handed. Results
//! are re-sorted by creation time before use, so callers may pass them in
//! any order.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::{StressLevel, MAX_SCORE};

/// Rows shown in the history table and points on the chart.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Top of the chart scale.
const CHART_SCALE: f64 = 10.0;

/// A persisted assessment. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: u64,
    /// `None` for anonymous, local-only results.
    pub owner: Option<String>,
    pub score: u32,
    pub level: StressLevel,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Lower score than the previous assessment.
    Improved,
    /// Higher score than the previous assessment.
    Worsened,
    Unchanged,
}

impl Trend {
    pub fn between(newer: u32, older: u32) -> Trend {
        match newer.cmp(&older) {
            std::cmp::Ordering::Less => Trend::Improved,
            std::cmp::Ordering::Greater => Trend::Worsened,
            std::cmp::Ordering::Equal => Trend::Unchanged,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Improved => "↓",
            Trend::Worsened => "↑",
            Trend::Unchanged => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub id: u64,
    pub date: DateTime<Utc>,
    pub score: u32,
    pub level: StressLevel,
    /// `None` for the oldest row of the window.
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    /// Short date such as "Oct 19".
    pub label: String,
    /// Score on the 0..=10 chart scale.
    pub value: u8,
    pub score: u32,
}

/// Results ordered newest first. Ties on the timestamp fall back to the id,
/// which grows with insertion order.
pub fn newest_first(results: &[TestResult]) -> Vec<&TestResult> {
    let mut sorted: Vec<&TestResult> = results.iter().collect();
    sorted.sort_by_key(|result| Reverse((result.created_at, result.id)));
    sorted
}

pub fn latest(results: &[TestResult]) -> Option<&TestResult> {
    results
        .iter()
        .max_by_key(|result| (result.created_at, result.id))
}

/// Trend of each score against the next, older one. The last entry has none.
pub fn trends(scores_newest_first: &[u32]) -> Vec<Option<Trend>> {
    let mut trends: Vec<Option<Trend>> = scores_newest_first
        .windows(2)
        .map(|pair| Some(Trend::between(pair[0], pair[1])))
        .collect();
    if !scores_newest_first.is_empty() {
        trends.push(None);
    }
    trends
}

/// The `limit` most recent results, newest first, each compared with the
/// row below it.
pub fn history_view(results: &[TestResult], limit: usize) -> Vec<HistoryRow> {
    let window: Vec<&TestResult> = newest_first(results).into_iter().take(limit).collect();
    let scores: Vec<u32> = window.iter().map(|result| result.score).collect();

    window
        .into_iter()
        .zip(trends(&scores))
        .map(|(result, trend)| HistoryRow {
            id: result.id,
            date: result.created_at,
            score: result.score,
            level: result.level,
            trend,
        })
        .collect()
}

/// Maps a 0..=35 score onto the 0..=10 chart scale.
pub fn rescale(score: u32) -> u8 {
    (f64::from(score) / f64::from(MAX_SCORE) * CHART_SCALE).round() as u8
}

/// The `limit` most recent results, oldest first, ready to plot.
pub fn chart_series(results: &[TestResult], limit: usize) -> Vec<ChartPoint> {
    let mut window: Vec<&TestResult> = newest_first(results).into_iter().take(limit).collect();
    window.reverse();

    window
        .into_iter()
        .map(|result| ChartPoint {
            label: result.created_at.format("%b %-d").to_string(),
            value: rescale(result.score),
            score: result.score,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assessment::{classify, recommend};
    use chrono::TimeZone;

    fn result(id: u64, score: u32, day: u32) -> TestResult {
        let level = classify(score);
        TestResult {
            id,
            owner: Some("student".to_string()),
            score,
            level,
            recommendations: recommend(level),
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_trends() {
        assert_eq!(
            trends(&[25, 20, 20, 30]),
            vec![
                Some(Trend::Worsened),
                Some(Trend::Unchanged),
                Some(Trend::Improved),
                None
            ]
        );
        assert_eq!(trends(&[12]), vec![None]);
        assert!(trends(&[]).is_empty());
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(35), 10);
        assert_eq!(rescale(0), 0);
        assert_eq!(rescale(18), 5);
        assert_eq!(rescale(7), 2);
        assert_eq!(rescale(21), 6);
    }

    #[test]
    fn test_latest() {
        let results = vec![result(1, 12, 1), result(3, 30, 9), result(2, 20, 5)];
        assert_eq!(latest(&results).map(|r| r.id), Some(3));
        assert_eq!(latest(&[]), None);
    }

    #[test]
    fn test_latest_tie_uses_id() {
        let results = vec![result(4, 12, 2), result(5, 14, 2)];
        assert_eq!(latest(&results).map(|r| r.id), Some(5));
    }

    #[test]
    fn test_history_view_sorts_and_trends() {
        // supplied oldest first, as an unordered store might
        let results = vec![
            result(1, 30, 1),
            result(2, 20, 2),
            result(3, 20, 3),
            result(4, 25, 4),
        ];
        let rows = history_view(&results, DEFAULT_HISTORY_LIMIT);
        let ids: Vec<u64> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        let trends: Vec<Option<Trend>> = rows.iter().map(|row| row.trend).collect();
        assert_eq!(
            trends,
            vec![
                Some(Trend::Worsened),
                Some(Trend::Unchanged),
                Some(Trend::Improved),
                None
            ]
        );
        assert_eq!(rows[0].level, StressLevel::High);
    }

    #[test]
    fn test_history_view_limit() {
        let results: Vec<TestResult> = (1..=12).map(|i| result(i as u64, 10 + i, i)).collect();
        let rows = history_view(&results, DEFAULT_HISTORY_LIMIT);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows.first().map(|row| row.id), Some(12));
        assert_eq!(rows.last().map(|row| row.id), Some(3));
        // the oldest row inside the window has no trend even though older results exist
        assert_eq!(rows.last().and_then(|row| row.trend), None);
    }

    #[test]
    fn test_chart_series() {
        let results = vec![result(2, 18, 14), result(1, 35, 13), result(3, 7, 15)];
        let points = chart_series(&results, DEFAULT_HISTORY_LIMIT);
        assert_eq!(
            points,
            vec![
                ChartPoint {
                    label: "Mar 13".to_string(),
                    value: 10,
                    score: 35
                },
                ChartPoint {
                    label: "Mar 14".to_string(),
                    value: 5,
                    score: 18
                },
                ChartPoint {
                    label: "Mar 15".to_string(),
                    value: 2,
                    score: 7
                },
            ]
        );
    }

    #[test]
    fn test_chart_series_keeps_most_recent() {
        let results: Vec<TestResult> = (1..=12).map(|i| result(i as u64, 20, i)).collect();
        let points = chart_series(&results, 10);
        assert_eq!(points.len(), 10);
        assert_eq!(points[0].label, "Mar 3");
        assert_eq!(points[9].label, "Mar 12");
    }

    #[test]
    fn test_trend_serde() {
        assert_eq!(
            serde_json::to_string(&Trend::Improved).unwrap(),
            "\"improved\""
        );
    }
}
