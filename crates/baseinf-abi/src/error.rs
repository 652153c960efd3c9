use std::path::PathBuf;

use thiserror::Error;

/// Every way a generation run can fail once arguments are valid.
/// None of these are retried; each one ends the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unable to load model from {}", path.display())]
    ModelLoad { path: PathBuf },

    #[error("failed to create inference context: {0}")]
    ContextCreate(String),

    #[error("failed to tokenize the prompt: {0}")]
    Tokenize(String),

    #[error("failed to encode the prompt (code {0})")]
    Encode(i32),

    #[error("failed to decode batch of {n_tokens} token(s) at position {n_past} (code {code})")]
    Decode {
        n_past: usize,
        n_tokens: usize,
        code: i32,
    },

    #[error("failed to sample the next token: {0}")]
    Sample(String),

    #[error("failed to convert token {0} to a text piece")]
    TokenToPiece(i32),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
