use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::answer::AnswerSet;

/// Top of the nominal score scale: seven questions, five points each.
pub const MAX_SCORE: u32 = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StressLevel {
    #[serde(rename = "Low stress")]
    Low,
    #[serde(rename = "Medium stress")]
    Medium,
    #[serde(rename = "High stress")]
    High,
}

impl StressLevel {
    pub const ALL: [StressLevel; 3] = [StressLevel::Low, StressLevel::Medium, StressLevel::High];

    pub fn label(&self) -> &'static str {
        match self {
            StressLevel::Low => "Low stress",
            StressLevel::Medium => "Medium stress",
            StressLevel::High => "High stress",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StressLevel::Low => "You are managing stress well. Keep up the good work!",
            StressLevel::Medium => {
                "You are experiencing moderate stress. Some self-care practices could help."
            }
            StressLevel::High => {
                "You are experiencing high stress levels. Consider implementing stress management strategies."
            }
        }
    }

    /// How the level compares with the average respondent.
    pub fn comparison(&self) -> &'static str {
        match self {
            StressLevel::Low => "Lower than average",
            StressLevel::Medium => "About average",
            StressLevel::High => "Higher than average",
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stress level {:?}", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for StressLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StressLevel::ALL
            .into_iter()
            .find(|level| level.label() == s)
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

const LOW_STRESS: &[&str] = &[
    "Continue your healthy habits",
    "Practice mindfulness regularly",
    "Maintain work-life balance",
];

const MEDIUM_STRESS: &[&str] = &[
    "Take regular breaks",
    "Try relaxation techniques",
    "Talk to friends or family",
    "Exercise regularly",
];

const HIGH_STRESS: &[&str] = &[
    "Seek professional help if needed",
    "Practice deep breathing daily",
    "Take time off if possible",
    "Establish a support system",
    "Prioritize self-care activities",
];

/// Plain sum of the answers. The reversed questions are already labelled so
/// that a higher value means more stress.
pub fn score(answers: &AnswerSet) -> u32 {
    answers.values().iter().map(|&value| u32::from(value)).sum()
}

pub fn classify(score: u32) -> StressLevel {
    match score {
        0..=10 => StressLevel::Low,
        11..=20 => StressLevel::Medium,
        _ => StressLevel::High,
    }
}

pub fn recommend(level: StressLevel) -> Vec<String> {
    let advice = match level {
        StressLevel::Low => LOW_STRESS,
        StressLevel::Medium => MEDIUM_STRESS,
        StressLevel::High => HIGH_STRESS,
    };
    advice.iter().map(|text| text.to_string()).collect()
}

/// Looks recommendations up by level label. An unknown label yields no advice.
pub fn recommend_label(label: &str) -> Vec<String> {
    label
        .parse::<StressLevel>()
        .map(recommend)
        .unwrap_or_default()
}

/// Share of the gauge filled on the result screen, capped at 100.
pub fn percentage(score: u32) -> u32 {
    (score * 4).min(100)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub score: u32,
    pub level: StressLevel,
    pub recommendations: Vec<String>,
}

/// Runs the whole assessment: score, level and advice. Both the HTTP service
/// and the offline questionnaire go through here.
pub fn assess(answers: &AnswerSet) -> Assessment {
    let score = score(answers);
    let level = classify(score);
    Assessment {
        score,
        level,
        recommendations: recommend(level),
    }
}
