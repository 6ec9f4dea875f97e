use thiserror::Error;

/// Reasons a submitted answer set is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("answers are missing")]
    Missing,
    #[error("answers must be a list")]
    NotASequence,
    #[error("expected {expected} answers, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    /// Question id outside 1..=7.
    #[error("no such question")]
    IllegalQuestion,
    #[error("answer must be between 1 and 5")]
    IllegalAnswer,
    #[error("not every question has been answered")]
    NotFullfilled,
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}
