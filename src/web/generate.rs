//! POST handlers: generation, rating, deletion.

use std::io::ErrorKind;

use base64::Engine;
use base64::engine::general_purpose;

use super::csrf::{csrf_token, validate_csrf};
use super::flash;
use super::prelude::*;
use super::views::{GeneratePage, style_options};
use crate::styler::{StyleTag, augment_prompt, validate_prompt};

#[derive(Deserialize)]
pub(crate) struct GenerateForm {
    prompt: String,
    style: String,
}

#[derive(Deserialize)]
pub(crate) struct RateForm {
    csrf_token: String,
    rating: i32,
    feedback: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct DeleteForm {
    csrf_token: String,
}

/// handles the /generate POST: validate, rate-limit, style, request, persist.
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<GenerateForm>,
) -> Result<Response, GalleryError> {
    let csrf_token = csrf_token(&session).await?;

    let cleaned = match validate_prompt(&form.prompt) {
        Ok(cleaned) => cleaned,
        Err(err) => {
            let mut page = GeneratePage::blank(csrf_token);
            page.prompt = form.prompt;
            page.style_options = style_options(form.style.trim());
            page.has_error = true;
            page.error_message = err.to_string();
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    if !state.rate_limiter.allow() {
        info!("Generation request rejected by rate limiter");
        let mut page = GeneratePage::blank(csrf_token);
        page.prompt = cleaned;
        page.style_options = style_options(form.style.trim());
        page.has_error = true;
        page.error_message =
            "Rate limit exceeded. Please wait a minute before generating another image."
                .to_string();
        return Ok((StatusCode::TOO_MANY_REQUESTS, page).into_response());
    }

    let style = StyleTag::parse(&form.style);
    let style_label = style
        .map(|tag| tag.as_str().to_string())
        .unwrap_or_else(|| form.style.trim().to_ascii_lowercase());
    let augmented = augment_prompt(&cleaned, style);

    let generated = state.generator.generate(&augmented, style).await;

    tokio::fs::create_dir_all(&state.image_dir).await?;
    let file_name = images::unique_file_name();
    tokio::fs::write(state.image_dir.join(&file_name), &generated.bytes).await?;

    let (_prompt, image) = images::record_generation(
        &state.db,
        &cleaned,
        &style_label,
        &augmented,
        &file_name,
        generated.placeholder,
    )
    .await?;

    let mut page = GeneratePage::blank(csrf_token);
    page.style_options = style_options(&style_label);
    page.has_result = true;
    page.result_image_id = image.id;
    page.result_image_b64 = general_purpose::STANDARD.encode(&generated.bytes);
    page.result_prompt = cleaned;
    page.result_placeholder = generated.placeholder;
    Ok(page.into_response())
}

/// handles the /images/{id}/rate POST
pub(crate) async fn rate_image_handler(
    State(state): State<AppState>,
    session: Session,
    Path(image_id): Path<i32>,
    Form(form): Form<RateForm>,
) -> Result<Redirect, GalleryError> {
    validate_csrf(&session, &form.csrf_token).await?;

    evaluations::record_evaluation(&state.db, image_id, form.rating, form.feedback).await?;
    flash::set_flash(&session, flash::FLASH_RATING_SAVED).await?;
    Ok(Redirect::to("/history"))
}

/// handles the /images/{id}/delete POST: removes the rows and the file.
pub(crate) async fn delete_image_handler(
    State(state): State<AppState>,
    session: Session,
    Path(image_id): Path<i32>,
    Form(form): Form<DeleteForm>,
) -> Result<Redirect, GalleryError> {
    validate_csrf(&session, &form.csrf_token).await?;

    let Some(file_name) = images::delete_generation(&state.db, image_id).await? else {
        return Err(GalleryError::NotFound(format!("image {image_id}")));
    };

    let image_path = state.image_dir.join(&file_name);
    if let Err(err) = tokio::fs::remove_file(&image_path).await
        && err.kind() != ErrorKind::NotFound
    {
        return Err(GalleryError::InternalServerError(err.to_string()));
    }

    info!("Deleted image {} ({})", image_id, file_name);
    flash::set_flash(&session, flash::FLASH_IMAGE_DELETED).await?;
    Ok(Redirect::to("/gallery"))
}
