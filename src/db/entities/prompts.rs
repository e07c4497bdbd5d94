//! DB storage for submitted prompts
use sea_orm::entity::prelude::*;

/// A generation request as the user submitted it. Immutable once written;
/// removed only when its image is deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "prompts")]
pub struct Model {
    /// db id
    #[sea_orm(primary_key)]
    pub id: i32,
    /// prompt text as cleaned up at submission
    pub raw_prompt: String,
    /// style tag the user picked
    pub style: String,
    /// prompt after style templating, as sent upstream
    pub augmented_prompt: String,
    /// when the request was made
    pub created_at: DateTime,
}

/// relations for prompts
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// the image generated for this prompt
    #[sea_orm(has_many = "super::images::Entity")]
    Images,
}

impl Related<super::images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
