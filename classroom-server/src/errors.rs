use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use classroom_collab::{AuthError, CollabError, DatabaseError, SessionError};
use log::error;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{0}")]
    Duplicate(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    /// No session, the client should go to the login page
    #[error("{0}")]
    Unauthorized(&'static str),
    /// The session's role may not do this, the client should go home
    #[error("{0}")]
    Forbidden(String),
    /// The remote store failed or returned garbage
    #[error("Data store error: {0}")]
    Upstream(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } | Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, self.to_string()).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::InactiveAccount => Self::Forbidden(value.to_string()),
            AuthError::EmailTaken => Self::Duplicate(value.to_string()),
            AuthError::Validation(e) => Self::Validation(e.to_string()),
            AuthError::Db(e) => e.into(),
            AuthError::Session(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<CollabError> for ServerError {
    fn from(value: CollabError) -> Self {
        match value {
            CollabError::NotPermitted { .. } | CollabError::NotEnrolled { .. } => {
                Self::Forbidden(value.to_string())
            }
            CollabError::LessonNotInCourse { .. } => Self::NotFound {
                resource: "lesson",
                identifier: "id",
            },
            CollabError::Validation(e) => Self::Validation(e.to_string()),
            CollabError::Db(e) => e.into(),
            CollabError::Session(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Upstream(e.to_string()),
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(value: SessionError) -> Self {
        Self::Unknown(value.to_string())
    }
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use classroom_collab::{AuthError, CollabError, DatabaseError, ValidationError};

    use super::ServerError;

    fn status(error: impl Into<ServerError>) -> StatusCode {
        error.into().as_status_code()
    }

    #[test]
    fn status_codes() {
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::InactiveAccount), StatusCode::FORBIDDEN);
        assert_eq!(status(AuthError::EmailTaken), StatusCode::CONFLICT);
        assert_eq!(
            status(CollabError::Validation(ValidationError::PasswordMismatch)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(CollabError::NotPermitted { action: "test" }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(DatabaseError::NotFound {
                resource: "course",
                identifier: "id"
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(DatabaseError::Malformed {
                resource: "course",
                reason: "not an object".to_string()
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
