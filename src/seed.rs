//! Demo data seeding for an empty database.

use std::path::Path;

use rand::seq::IndexedRandom;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use tracing::info;

use crate::db::entities::{evaluations, images, prompts};
use crate::error::GalleryError;
use crate::generator::placeholder_png;
use crate::styler::{StyleTag, augment_prompt};

const SAMPLE_PROMPTS: [(&str, StyleTag); 3] = [
    ("a fantasy castle in the clouds", StyleTag::Realistic),
    ("a futuristic robot chef in a kitchen", StyleTag::Cyberpunk),
    ("a panda riding a bicycle in space", StyleTag::Cartoon),
];

const SAMPLE_FEEDBACK: [&str; 3] = [
    "Great image, matches my expectation",
    "Nice style, but could use more detail",
    "Colors are perfect, composition is good",
];

/// Seeds three sample generations with ratings when the database is empty.
pub async fn seed_demo_data(
    db: &DatabaseConnection,
    image_dir: &Path,
) -> Result<(), GalleryError> {
    let existing = prompts::Entity::find().count(db).await?;
    if existing > 0 {
        return Ok(());
    }

    tokio::fs::create_dir_all(image_dir).await?;
    for (prompt, style) in SAMPLE_PROMPTS {
        let augmented = augment_prompt(prompt, Some(style));
        let file_name = images::unique_file_name();
        tokio::fs::write(image_dir.join(&file_name), placeholder_png()).await?;

        let (_, image) =
            images::record_generation(db, prompt, style.as_str(), &augmented, &file_name, true)
                .await?;

        let rating = rand::random_range(3..=5);
        let feedback = SAMPLE_FEEDBACK
            .choose(&mut rand::rng())
            .map(|text| text.to_string());
        evaluations::record_evaluation(db, image.id, rating, feedback).await?;
    }

    info!("Seeded {} demo generations", SAMPLE_PROMPTS.len());
    Ok(())
}
