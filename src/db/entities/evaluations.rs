//! DB storage for image ratings
use chrono::Utc;
use sea_orm::sea_query::{Alias, Expr, Func, JoinType, Order, Query};
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseBackend, StatementBuilder, entity::prelude::*,
};

use crate::constants::{MAX_RATING, MIN_RATING};
use crate::error::GalleryError;

/// A user rating for a generated image. Multiple ratings per image are
/// allowed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evaluations")]
pub struct Model {
    /// db id
    #[sea_orm(primary_key)]
    pub id: i32,
    /// foreign key to the rated image
    pub image_id: i32,
    /// rating on the 1-5 scale
    pub rating: i32,
    /// optional free-text feedback
    pub feedback: Option<String>,
    /// when the rating was recorded
    pub created_at: DateTime,
}

/// relations for evaluations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// foreign key relation to images
    #[sea_orm(
        belongs_to = "super::images::Entity",
        from = "Column::ImageId",
        to = "super::images::Column::Id"
    )]
    Images,
}

impl Related<super::images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Average rating and rating count for one style.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleStats {
    /// style tag from the prompt
    pub style: String,
    /// mean rating across that style's evaluations
    pub average: f64,
    /// number of evaluations
    pub count: i64,
}

/// Average rating and rating count across all evaluations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverallStats {
    /// mean rating
    pub average: f64,
    /// number of evaluations
    pub count: i64,
}

/// Records a rating for an image, clamping it to the 1-5 scale.
pub(crate) async fn record_evaluation(
    db: &DatabaseConnection,
    image_id: i32,
    rating: i32,
    feedback: Option<String>,
) -> Result<Model, GalleryError> {
    let image_exists = super::images::Entity::find_by_id(image_id)
        .one(db)
        .await?
        .is_some();
    if !image_exists {
        return Err(GalleryError::NotFound(format!("image {image_id}")));
    }

    let feedback = feedback.map(|text| text.trim().to_string()).filter(|text| !text.is_empty());

    ActiveModel {
        image_id: Set(image_id),
        rating: Set(rating.clamp(MIN_RATING, MAX_RATING)),
        feedback: Set(feedback),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(GalleryError::from)
}

/// Aggregates the mean rating and count across every evaluation.
pub(crate) async fn overall_stats(
    db: &DatabaseConnection,
) -> Result<Option<OverallStats>, GalleryError> {
    let query = Query::select()
        .from(Entity)
        .expr_as(Func::avg(Expr::col(Column::Rating)), Alias::new("avg_rating"))
        .expr_as(Expr::col(Column::Id).count(), Alias::new("rating_count"))
        .to_owned();

    let stmt = StatementBuilder::build(&query, &DatabaseBackend::Sqlite);
    let Some(row) = db.query_one(stmt).await? else {
        return Ok(None);
    };
    let count: i64 = row.try_get("", "rating_count")?;
    if count == 0 {
        return Ok(None);
    }
    let average: f64 = row.try_get("", "avg_rating")?;
    Ok(Some(OverallStats { average, count }))
}

/// Aggregates mean rating and count per prompt style, best-rated first.
pub(crate) async fn style_breakdown(
    db: &DatabaseConnection,
) -> Result<Vec<StyleStats>, GalleryError> {
    let query = Query::select()
        .from(super::prompts::Entity)
        .column((super::prompts::Entity, super::prompts::Column::Style))
        .expr_as(
            Func::avg(Expr::col((Entity, Column::Rating))),
            Alias::new("avg_rating"),
        )
        .expr_as(
            Expr::col((Entity, Column::Id)).count(),
            Alias::new("rating_count"),
        )
        .join(
            JoinType::InnerJoin,
            super::images::Entity,
            Expr::col((super::prompts::Entity, super::prompts::Column::Id)).equals((
                super::images::Entity,
                super::images::Column::PromptId,
            )),
        )
        .join(
            JoinType::InnerJoin,
            Entity,
            Expr::col((super::images::Entity, super::images::Column::Id))
                .equals((Entity, Column::ImageId)),
        )
        .group_by_col((super::prompts::Entity, super::prompts::Column::Style))
        .order_by(Alias::new("avg_rating"), Order::Desc)
        .to_owned();

    let stmt = StatementBuilder::build(&query, &DatabaseBackend::Sqlite);
    let rows = db.query_all(stmt).await?;
    let mut breakdown = Vec::with_capacity(rows.len());
    for row in rows {
        let style: String = row.try_get("", "style")?;
        let average: f64 = row.try_get("", "avg_rating")?;
        let count: i64 = row.try_get("", "rating_count")?;
        breakdown.push(StyleStats {
            style,
            average,
            count,
        });
    }
    Ok(breakdown)
}
