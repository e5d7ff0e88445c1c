use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("unknown team: {0:?}")]
    UnknownTeam(String),

    #[error("home and away team are the same: {0}")]
    SameTeam(String),

    #[error("inconsistent form for {team}: {reason}")]
    InvalidForm { team: String, reason: String },

    // Arithmetic regression somewhere in the model; never expected at runtime.
    #[error("prediction invariant violated: {0}")]
    InvariantViolation(String),
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;
