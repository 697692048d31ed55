use std::fmt;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::models::TaskStatus;

/// A single rejected input field, surfaced to the caller next to the form
/// control it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> std::result::Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (index, error) in self.errors.iter().enumerate() {
            let sep = if index == 0 { ": " } else { "; " };
            write!(f, "{sep}{} {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task_id} cannot go from {from} on {event}")]
pub struct InvalidStateTransition {
    pub task_id: Uuid,
    pub from: TaskStatus,
    pub event: &'static str,
}

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error(transparent)]
    InvalidTransition(#[from] InvalidStateTransition),
    #[error("task {0} already has a review")]
    DuplicateReview(Uuid),
    #[error("analysis of task {task_id} failed: {reason}")]
    AnalysisFailed { task_id: Uuid, reason: String },
    #[error("analysis of task {task_id} timed out after {timeout:?}")]
    AnalysisTimedOut { task_id: Uuid, timeout: Duration },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DeskError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        DeskError::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
