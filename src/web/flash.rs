use tower_sessions::Session;

use crate::error::GalleryError;

const FLASH_FLAG_KEY: &str = "flash_flag";

pub(crate) const FLASH_RATING_SAVED: u16 = 1;
pub(crate) const FLASH_IMAGE_DELETED: u16 = 2;

#[derive(Clone, Debug)]
pub(crate) struct FlashMessage {
    pub(crate) text: &'static str,
    pub(crate) class: &'static str,
}

pub(crate) async fn set_flash(session: &Session, flag: u16) -> Result<(), GalleryError> {
    session
        .insert(FLASH_FLAG_KEY, flag)
        .await
        .map_err(|err| GalleryError::InternalServerError(err.to_string()))?;
    Ok(())
}

pub(crate) async fn take_flash_message(
    session: &Session,
) -> Result<Option<FlashMessage>, GalleryError> {
    let flag = session
        .get::<u16>(FLASH_FLAG_KEY)
        .await
        .map_err(|err| GalleryError::InternalServerError(err.to_string()))?
        .filter(|flag| *flag != 0);
    if flag.is_some() {
        session
            .insert(FLASH_FLAG_KEY, 0u16)
            .await
            .map_err(|err| GalleryError::InternalServerError(err.to_string()))?;
    }
    Ok(flag.and_then(message_for))
}

/// Pops the flash message as the (has_flash, text, class) triple the page
/// templates carry.
pub(crate) async fn flash_fields(
    session: &Session,
) -> Result<(bool, String, String), GalleryError> {
    let flash = take_flash_message(session).await?;
    Ok(match flash {
        Some(message) => (true, message.text.to_string(), message.class.to_string()),
        None => (false, String::new(), String::new()),
    })
}

fn message_for(flag: u16) -> Option<FlashMessage> {
    match flag {
        FLASH_RATING_SAVED => Some(FlashMessage {
            text: "Rating submitted successfully!",
            class: "success",
        }),
        FLASH_IMAGE_DELETED => Some(FlashMessage {
            text: "Image deleted along with its prompt and ratings.",
            class: "success",
        }),
        _ => None,
    }
}
