use std::io::Read;

use csv::StringRecord;

use crate::{
    answer::{AnswerSet, QUESTION_COUNT},
    error::{Error, InvalidInput},
};

/// Reads answer rows from CSV.
///
/// The first line is a header. Every following record is a respondent id
/// followed by one column per question:
///
/// ```text
/// id,q1,q2,q3,q4,q5,q6,q7
/// s-001,1,2,3,4,5,1,2
/// ```
///
/// A malformed row yields an error for that row only; reading continues.
pub fn read_bulk<R: Read>(reader: R) -> impl Iterator<Item = Result<(String, AnswerSet), Error>> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_records()
        .map(|record| {
            let record = record.map_err(|e| InvalidInput::MalformedRecord(e.to_string()))?;
            parse_record(&record)
        })
}

fn parse_record(record: &StringRecord) -> Result<(String, AnswerSet), Error> {
    let id = record.get(0).ok_or(InvalidInput::Missing)?.to_string();
    let answers = record
        .iter()
        .skip(1)
        .map(|field| field.parse::<i64>().map_err(|_| InvalidInput::IllegalAnswer))
        .collect::<Result<Vec<i64>, InvalidInput>>()?;
    if answers.len() != QUESTION_COUNT {
        return Err(InvalidInput::WrongLength {
            expected: QUESTION_COUNT,
            actual: answers.len(),
        }
        .into());
    }
    Ok((id, AnswerSet::try_from(answers)?))
}
