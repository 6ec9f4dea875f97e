use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub mod answer;
pub mod assessment;
pub mod bulk;
pub mod config;
pub mod error;
pub mod history;
pub mod server;
pub mod store;
pub mod timer;

pub use answer::{validate, AnswerSet, AnswerStore, MAX_ANSWER, MIN_ANSWER, QUESTION_COUNT};
pub use assessment::{
    assess, classify, percentage, recommend, recommend_label, score, Assessment, StressLevel,
};
pub use bulk::read_bulk;
pub use error::{Error, InvalidInput};
pub use history::{
    chart_series, history_view, latest, newest_first, rescale, trends, ChartPoint, HistoryRow,
    TestResult, Trend, DEFAULT_HISTORY_LIMIT,
};
pub use store::{CsvStore, MemoryStore, ResultStore};
pub use timer::{StudyTimer, TimerState};

pub static QUESTIONS: Lazy<Questionnaire> = Lazy::new(|| {
    serde_json::from_str(include_str!("../resources/questions.json"))
        .expect("resources/questions.json is malformed")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub value: u8,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
    /// Positively phrased question. The choice labels run from "Very Often"
    /// to "Never" so that a higher value still means more stress.
    pub reverse: bool,
    pub choices: Vec<Choice>,
}

/// The fixed seven-question stress assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
    /// Instruction shown before the first question.
    pub theme: String,
    pub questions: Vec<Question>,
}

impl Questionnaire {
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Looks a question up by its 1-based id.
    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
