use tessera_parser::ParseError;
use thiserror::Error;

/// Failure reading, parsing or rewriting a source file
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task was cancelled or panicked
    #[error("background task failed: {0}")]
    Task(String),
}

impl CommonError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CommonError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type CommonResult<T> = Result<T, CommonError>;
