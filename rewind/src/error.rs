use rewind_core::HistoryError;
use thiserror::Error;

use crate::SessionId;

#[derive(Debug, Error)]
pub enum UndoRedoError {
    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("object is already tracked by session {owner}, cannot be used by session {session}")]
    Conflict { owner: SessionId, session: SessionId },

    #[error(transparent)]
    History(HistoryError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl From<HistoryError> for UndoRedoError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::InvalidParameter { reason } => UndoRedoError::InvalidParameter { reason },
            other => UndoRedoError::History(other),
        }
    }
}

impl UndoRedoError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        UndoRedoError::InvalidParameter {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_invalid_parameter_is_flattened() {
        let err: UndoRedoError = HistoryError::InvalidParameter {
            reason: "too small".into(),
        }
        .into();
        assert!(matches!(err, UndoRedoError::InvalidParameter { reason } if reason == "too small"));
    }

    #[test]
    fn test_index_error_is_wrapped() {
        let err: UndoRedoError = HistoryError::Index { index: 9, min: 0, max: 3 }.into();
        assert!(matches!(
            err,
            UndoRedoError::History(HistoryError::Index { index: 9, .. })
        ));
        assert_eq!(err.to_string(), "index 9 is outside the valid range [0, 3]");
    }
}
