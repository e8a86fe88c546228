//! Error types for the editor

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Parse error: {0}")]
    Parse(#[from] tessera_parser::ParseError),

    #[error("Invalid edit request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}

/// Problems met while applying one structural action.
///
/// None of these abort the transform; the action degrades or is skipped and
/// the warning is reported alongside the applied requests.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransformWarning {
    /// Target position missing or out of range; the element was appended
    #[error("{action} on {oid}: invalid position ({detail}), appended instead")]
    InvalidPosition {
        oid: String,
        action: String,
        detail: String,
    },

    /// Index of an existing child out of range; the action was skipped
    #[error("{action} on {oid}: no child at index {index}")]
    InvalidIndex {
        oid: String,
        action: String,
        index: i64,
    },

    #[error("insert on {oid}: code fragment did not parse: {message}")]
    InvalidCodeFragment { oid: String, message: String },
}

impl TransformWarning {
    /// Identity of the element the warning was raised on
    pub fn oid(&self) -> &str {
        match self {
            TransformWarning::InvalidPosition { oid, .. }
            | TransformWarning::InvalidIndex { oid, .. }
            | TransformWarning::InvalidCodeFragment { oid, .. } => oid,
        }
    }
}
