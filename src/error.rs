//! Error taxonomy surfaced to callers, and the `{error, details}` envelope
//! returned alongside a 400- or 500-equivalent status.

use crate::species::UnknownSpeciesError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Every problem found while parsing a request. Never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    pub details: Vec<String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(detail: impl Into<String>) -> Self {
        Self {
            details: vec![detail.into()],
        }
    }

    pub fn push(&mut self, detail: impl Into<String>) {
        self.details.push(detail.into());
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid request parameters: {}", self.details.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum ConditionsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    UnknownSpecies(#[from] UnknownSpeciesError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ConditionsError>;

/// JSON body returned on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Vec<String>,
}

impl ConditionsError {
    /// HTTP-equivalent status: 400 for client mistakes, 500 for everything internal.
    pub fn status_code(&self) -> u16 {
        match self {
            ConditionsError::Validation(_) => 400,
            ConditionsError::UnknownSpecies(_) | ConditionsError::Store(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() == 400
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            ConditionsError::Validation(v) => ErrorResponse {
                error: "Invalid request parameters".to_string(),
                details: v.details.clone(),
            },
            ConditionsError::UnknownSpecies(_) | ConditionsError::Store(_) => ErrorResponse {
                error: "Internal server error".to_string(),
                details: vec![],
            },
        }
    }
}
