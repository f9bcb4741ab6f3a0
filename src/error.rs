use thiserror::Error;

use crate::models::assignment::AssignmentStatus;

#[derive(Debug, Error)]
pub enum LogisticsError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("capacity conflict: {0}")]
    Conflict(String),

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },

    #[error("submission rejected by api (status {status})")]
    SubmitRejected { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}
