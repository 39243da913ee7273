use thiserror::Error;

/// Errors raised by the history engine.
///
/// All of them are usage errors detected before any state is written, so the
/// engine is left exactly as it was when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("capacity {requested} cannot be below zero")]
    Size { requested: i64 },

    #[error("index {index} is outside the valid range [{min}, {max}]")]
    Index { index: usize, min: usize, max: usize },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}

impl HistoryError {
    pub(crate) fn index(index: usize, min: usize, max: usize) -> Self {
        HistoryError::Index { index, min, max }
    }
}
