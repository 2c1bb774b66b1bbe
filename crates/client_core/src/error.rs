use shared::{domain::ResourceId, error::FieldErrors};
use thiserror::Error;

/// Failure of a single gateway call. Cloneable so a coalesced load can hand
/// the same outcome to every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("resource not found")]
    NotFound,
    #[error("operation not supported by this gateway")]
    Unsupported,
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            GatewayError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return GatewayError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return GatewayError::Server {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            };
        }
        GatewayError::Network(err.to_string())
    }
}

/// Outcome of a controller operation, attributed to the row or draft that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("{0} is not present in the collection")]
    NotFound(ResourceId),
    #[error("{0} already has a mutation in flight")]
    Conflict(ResourceId),
    #[error("an identical draft is already being submitted")]
    DuplicateSubmission,
    #[error("draft is invalid: {0}")]
    Invalid(FieldErrors),
    #[error("failed to fetch collection: {0}")]
    FetchFailed(GatewayError),
    #[error("failed to refresh {id}: {cause}")]
    RefreshFailed { id: ResourceId, cause: GatewayError },
    #[error("failed to create resource: {0}")]
    CreateFailed(GatewayError),
    #[error("failed to update {id}: {cause}")]
    UpdateFailed { id: ResourceId, cause: GatewayError },
    #[error("failed to delete {id}: {cause}")]
    DeleteFailed { id: ResourceId, cause: GatewayError },
    #[error("controller was detached before the response arrived")]
    Detached,
}

impl ControllerError {
    /// The row this error should be shown against, if it concerns one.
    pub fn resource_id(&self) -> Option<&ResourceId> {
        match self {
            ControllerError::NotFound(id)
            | ControllerError::Conflict(id)
            | ControllerError::RefreshFailed { id, .. }
            | ControllerError::UpdateFailed { id, .. }
            | ControllerError::DeleteFailed { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&GatewayError> {
        match self {
            ControllerError::FetchFailed(cause)
            | ControllerError::CreateFailed(cause)
            | ControllerError::RefreshFailed { cause, .. }
            | ControllerError::UpdateFailed { cause, .. }
            | ControllerError::DeleteFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Field-level messages, whether raised locally or by the server.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ControllerError::Invalid(errors) => Some(errors),
            other => other.cause().and_then(GatewayError::field_errors),
        }
    }
}
