use thiserror::Error;

use crate::repositories::StoreError;

#[derive(Debug, Error)]
pub enum TestFlowError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// The attempt is not in a stage that allows the requested action.
    #[error("{0}")]
    InvalidStage(&'static str),
    #[error("{0}")]
    Internal(String),
}

impl TestFlowError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<validator::ValidationErrors> for TestFlowError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, items)| {
                items.iter().map(move |item| match &item.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();

        if messages.is_empty() {
            return Self::Validation("Invalid payload".to_string());
        }
        Self::Validation(messages.join("; "))
    }
}

impl From<StoreError> for TestFlowError {
    fn from(err: StoreError) -> Self {
        Self::internal(&err, "Store operation failed")
    }
}
