use pdfdesk_core::{DeskError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Desk(#[from] DeskError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Cancelled")]
    Cancelled,
}

impl From<ValidationError> for ClientError {
    fn from(e: ValidationError) -> Self {
        ClientError::Desk(e.into())
    }
}

impl ClientError {
    /// Collapse into the shared taxonomy so the task tracker can classify
    /// it. Connection-level HTTP failures count as transport errors.
    pub fn into_desk(self) -> DeskError {
        match self {
            ClientError::Desk(e) => e,
            ClientError::Http(e) => match e.status() {
                Some(status) => DeskError::Server {
                    status: status.as_u16(),
                    message: e.to_string(),
                },
                None if e.is_decode() => DeskError::Serialization(e.to_string()),
                None => DeskError::Transport(e.to_string()),
            },
            ClientError::Io(e) => DeskError::Transport(e.to_string()),
            ClientError::TaskFailed(message) => DeskError::TaskFailed(message),
            ClientError::Cancelled => DeskError::TaskFailed("Cancelled".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfdesk_core::ModuleKind;

    #[test]
    fn test_validation_wraps_into_desk() {
        let err: ClientError = ValidationError::NoSelection(ModuleKind::Split).into();
        assert!(matches!(
            err.into_desk(),
            DeskError::Validation(ValidationError::NoSelection(ModuleKind::Split))
        ));
    }

    #[test]
    fn test_io_is_transient() {
        let err = ClientError::Io(std::io::Error::other("reset"));
        assert!(err.into_desk().is_transient());
    }

    #[test]
    fn test_task_stops_keep_their_message() {
        assert_eq!(
            ClientError::TaskFailed("gs crashed".into()).into_desk(),
            DeskError::TaskFailed("gs crashed".into())
        );
        assert_eq!(ClientError::Cancelled.into_desk().to_string(), "Cancelled");
    }
}
