use serde::Serialize;
use serde_json::Value;

use crate::error::InvalidInput;

/// Number of questions in the assessment.
pub const QUESTION_COUNT: usize = 7;
pub const MIN_ANSWER: u8 = 1;
pub const MAX_ANSWER: u8 = 5;

fn check_answer(value: i64) -> Result<u8, InvalidInput> {
    if (MIN_ANSWER as i64..=MAX_ANSWER as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(InvalidInput::IllegalAnswer)
    }
}

/// A complete, validated set of answers, one per question, in question order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerSet([u8; QUESTION_COUNT]);

impl AnswerSet {
    pub fn values(&self) -> &[u8; QUESTION_COUNT] {
        &self.0
    }
}

impl TryFrom<&[i64]> for AnswerSet {
    type Error = InvalidInput;

    fn try_from(answers: &[i64]) -> Result<Self, Self::Error> {
        if answers.len() != QUESTION_COUNT {
            return Err(InvalidInput::WrongLength {
                expected: QUESTION_COUNT,
                actual: answers.len(),
            });
        }
        let mut values = [0; QUESTION_COUNT];
        for (slot, &answer) in values.iter_mut().zip(answers) {
            *slot = check_answer(answer)?;
        }
        Ok(AnswerSet(values))
    }
}

impl TryFrom<Vec<i64>> for AnswerSet {
    type Error = InvalidInput;

    fn try_from(answers: Vec<i64>) -> Result<Self, Self::Error> {
        AnswerSet::try_from(answers.as_slice())
    }
}

/// Checks an untyped submission payload and turns it into an [`AnswerSet`].
///
/// The payload must be present, must be an array, must hold exactly one
/// integer per question and every integer must lie in `1..=5`.
pub fn validate(payload: Option<&Value>) -> Result<AnswerSet, InvalidInput> {
    let items = match payload {
        None | Some(Value::Null) => return Err(InvalidInput::Missing),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(InvalidInput::NotASequence),
    };
    if items.len() != QUESTION_COUNT {
        return Err(InvalidInput::WrongLength {
            expected: QUESTION_COUNT,
            actual: items.len(),
        });
    }
    let answers = items
        .iter()
        .map(|item| item.as_i64().ok_or(InvalidInput::IllegalAnswer))
        .collect::<Result<Vec<i64>, InvalidInput>>()?;
    AnswerSet::try_from(answers)
}

/// Collects answers one question at a time.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    values: [u8; QUESTION_COUNT],
    offset: usize,
}

impl AnswerStore {
    /// Records the answer to the next unanswered question. Only 1 to 5 is
    /// accepted.
    pub fn push(&mut self, value: u8) -> Result<(), InvalidInput> {
        let value = check_answer(value.into())?;
        if self.offset < QUESTION_COUNT {
            self.values[self.offset] = value;
            self.offset += 1;
            Ok(())
        } else {
            Err(InvalidInput::IllegalQuestion)
        }
    }

    /// Records the answer to question `question_no`, replacing any earlier one.
    pub fn insert(&mut self, question_no: u8, value: u8) -> Result<(), InvalidInput> {
        if question_no < 1 {
            return Err(InvalidInput::IllegalQuestion);
        }
        let value = check_answer(value.into())?;
        let offset: usize = (question_no - 1).into();
        if offset < QUESTION_COUNT {
            self.values[offset] = value;
            Ok(())
        } else {
            Err(InvalidInput::IllegalQuestion)
        }
    }

    pub fn answered(&self) -> usize {
        self.values.iter().filter(|&&value| value != 0).count()
    }

    pub fn to_answer_set(&self) -> Result<AnswerSet, InvalidInput> {
        if self.values.iter().any(|&value| value == 0) {
            return Err(InvalidInput::NotFullfilled);
        }
        Ok(AnswerSet(self.values))
    }
}
