use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

use crate::catalog_error::CatalogError;

/// JSON envelope returned by every FFI entry point.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum AppResponse {
    DatabaseError(String),
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    BadRequest(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl From<CatalogError> for AppResponse {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidName | CatalogError::MissingImage => {
                AppResponse::ValidationError(err.to_string())
            }
            CatalogError::UnknownShelf(_) | CatalogError::UnknownBook(..) => {
                AppResponse::NotFound(err.to_string())
            }
            CatalogError::CameraUnavailable(_) | CatalogError::InvalidCaptureStep(_) => {
                AppResponse::BadRequest(err.to_string())
            }
            CatalogError::Storage(msg) => AppResponse::DatabaseError(msg),
            CatalogError::Serialization(msg) => AppResponse::SerializationError(msg),
        }
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, AppResponse::Ok(_))
    }
}
