//! DB storage for generated images
use chrono::Utc;
use sea_orm::{ActiveValue::Set, TransactionTrait, entity::prelude::*};

use crate::error::GalleryError;

/// A stored generation result. `file_name` is relative to the image dir.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "images")]
pub struct Model {
    /// db id
    #[sea_orm(primary_key)]
    pub id: i32,
    /// foreign key to the owning prompt
    pub prompt_id: i32,
    /// file name under the image dir
    pub file_name: String,
    /// true when this is the demo/fallback image
    pub placeholder: bool,
    /// when the image was stored
    pub created_at: DateTime,
}

/// relations for images
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// foreign key relation to prompts
    #[sea_orm(
        belongs_to = "super::prompts::Entity",
        from = "Column::PromptId",
        to = "super::prompts::Column::Id"
    )]
    Prompts,
    /// ratings recorded against this image
    #[sea_orm(has_many = "super::evaluations::Entity")]
    Evaluations,
}

impl Related<super::prompts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Prompts.def()
    }
}

impl Related<super::evaluations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evaluations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Builds a collision-resistant file name for a new image.
pub(crate) fn unique_file_name() -> String {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S%3f");
    let suffix: u32 = rand::random_range(0..0x10000);
    format!("image_{}_{:04x}.png", stamp, suffix)
}

/// Inserts the prompt row and its image row in one transaction.
pub(crate) async fn record_generation(
    db: &DatabaseConnection,
    raw_prompt: &str,
    style: &str,
    augmented_prompt: &str,
    file_name: &str,
    placeholder: bool,
) -> Result<(super::prompts::Model, Model), GalleryError> {
    let db_txn = db.begin().await?;
    let now = Utc::now().naive_utc();

    let prompt = super::prompts::ActiveModel {
        raw_prompt: Set(raw_prompt.to_string()),
        style: Set(style.to_string()),
        augmented_prompt: Set(augmented_prompt.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&db_txn)
    .await?;

    let image = ActiveModel {
        prompt_id: Set(prompt.id),
        file_name: Set(file_name.to_string()),
        placeholder: Set(placeholder),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&db_txn)
    .await?;

    db_txn.commit().await?;
    Ok((prompt, image))
}

/// Deletes an image, its evaluations, and its owning prompt row.
///
/// Returns the image's file name so the caller can unlink the artifact;
/// `Ok(None)` when the id is unknown.
pub(crate) async fn delete_generation(
    db: &DatabaseConnection,
    image_id: i32,
) -> Result<Option<String>, GalleryError> {
    let db_txn = db.begin().await?;

    let Some(image) = Entity::find_by_id(image_id).one(&db_txn).await? else {
        return Ok(None);
    };

    super::evaluations::Entity::delete_many()
        .filter(super::evaluations::Column::ImageId.eq(image.id))
        .exec(&db_txn)
        .await?;
    Entity::delete_by_id(image.id).exec(&db_txn).await?;
    super::prompts::Entity::delete_by_id(image.prompt_id)
        .exec(&db_txn)
        .await?;

    db_txn.commit().await?;
    Ok(Some(image.file_name))
}
