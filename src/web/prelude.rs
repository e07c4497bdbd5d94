pub(crate) use crate::db::entities::{evaluations, images, prompts};
pub(crate) use crate::error::GalleryError;
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::{Form, Path, Query, State};
pub(crate) use axum::http::StatusCode;
pub(crate) use axum::response::{IntoResponse, Redirect, Response};
pub(crate) use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
pub(crate) use serde::Deserialize;
pub(crate) use tower_sessions::Session;
pub(crate) use tracing::info;
