use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolveError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Cooperative cancellation. An expected termination path, not a
    /// failure — the run exits without producing a RunResult.
    #[error("Run aborted by cancellation signal")]
    Aborted,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
