//! Error handling

use axum::response::IntoResponse;
use tracing::info;

/// definitions for the sdgallery application.
#[derive(Debug)]
pub enum GalleryError {
    /// When you didn't do the right thing
    BadRequest,
    /// Missing or invalid session
    Unauthorized,
    /// When DB operations fail
    DatabaseError(sea_orm::DbErr),
    /// When a requested resource is not found
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl From<sea_orm::DbErr> for GalleryError {
    fn from(err: sea_orm::DbErr) -> Self {
        GalleryError::DatabaseError(err)
    }
}

impl From<std::io::Error> for GalleryError {
    fn from(err: std::io::Error) -> Self {
        GalleryError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for GalleryError {
    fn from(err: axum::http::Error) -> Self {
        GalleryError::InternalServerError(err.to_string())
    }
}

impl From<url::ParseError> for GalleryError {
    fn from(err: url::ParseError) -> Self {
        GalleryError::InternalServerError(err.to_string())
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> axum::response::Response {
        match self {
            GalleryError::BadRequest => {
                info!("Bad request received");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Bad Request"));
                *response.status_mut() = axum::http::StatusCode::BAD_REQUEST;
                response
            }
            GalleryError::Unauthorized => {
                info!("Unauthorized request received");
                let mut response = axum::response::Response::new(axum::body::Body::from(
                    "Unauthorized: invalid or missing session.",
                ));
                *response.status_mut() = axum::http::StatusCode::UNAUTHORIZED;
                response
            }
            GalleryError::DatabaseError(err) => {
                tracing::error!("Database error: {}", err);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Database error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
            GalleryError::NotFound(what) => {
                tracing::error!("404 {what}");
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Not Found"));
                *response.status_mut() = axum::http::StatusCode::NOT_FOUND;
                response
            }
            GalleryError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                let mut response =
                    axum::response::Response::new(axum::body::Body::from("Internal server error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
