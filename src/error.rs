use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use scim_filter::FilterError;
use scim_types::{ErrorBody, ResourceError, ResourceType};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid request: {0}")]
    InvalidSyntax(String),

    #[error("No target: {0}")]
    NoTarget(String),

    #[error("{0}")]
    Mutability(String),

    #[error("{resource_type} '{id}' not found")]
    NotFound {
        resource_type: ResourceType,
        id: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("Forwarding failed: {0}")]
    Forward(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidFilter(_)
            | Self::InvalidPath(_)
            | Self::InvalidValue(_)
            | Self::InvalidSyntax(_)
            | Self::NoTarget(_)
            | Self::Mutability(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forward(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The SCIM `scimType` keyword, where one applies.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::InvalidFilter(_) => Some("invalidFilter"),
            Self::InvalidPath(_) => Some("invalidPath"),
            Self::InvalidValue(_) => Some("invalidValue"),
            Self::InvalidSyntax(_) => Some("invalidSyntax"),
            Self::NoTarget(_) => Some("noTarget"),
            Self::Mutability(_) => Some("mutability"),
            Self::Conflict(_) => Some("uniqueness"),
            Self::NotFound { .. } | Self::Forward(_) | Self::Internal(_) => None,
        }
    }
}

impl From<FilterError> for ServiceError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::NotAnObject { .. } => ServiceError::InvalidPath(err.to_string()),
            _ => ServiceError::InvalidFilter(err.to_string()),
        }
    }
}

impl From<ResourceError> for ServiceError {
    fn from(err: ResourceError) -> Self {
        ServiceError::InvalidValue(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Forward(_) | Self::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorBody::new(status.as_u16(), self.scim_type(), detail));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
