//! Engine error types

use thiserror::Error;

use crate::types::{LetterId, Stage};

/// Errors raised outside the progress state machine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed path data: {0}")]
    MalformedPath(String),

    #[error("invalid stage number: {0}")]
    InvalidStage(u8),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Refusals from progress mutations. State is left untouched when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("letter not found: {0}")]
    UnknownLetter(LetterId),

    #[error("letter {0} is locked")]
    LetterLocked(LetterId),

    #[error("letter {letter_id} cannot move from stage {current} back to {requested}")]
    StageRegression {
        letter_id: LetterId,
        current: Stage,
        requested: Stage,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
