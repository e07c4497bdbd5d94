//! Page templates and GET handlers for the four tabs.

use std::collections::HashMap;

use sea_orm::PaginatorTrait;

use super::csrf::csrf_token;
use super::flash;
use super::prelude::*;
use crate::constants::GALLERY_PAGE_SIZE;
use crate::styler::StyleTag;

/// One entry in a style `<select>`.
#[derive(Clone, Debug)]
pub(crate) struct StyleOption {
    pub(crate) value: String,
    pub(crate) label: String,
    pub(crate) selected: bool,
}

/// Builds the generate-form options, marking the selected tag.
pub(crate) fn style_options(selected: &str) -> Vec<StyleOption> {
    StyleTag::ALL
        .iter()
        .map(|tag| StyleOption {
            value: tag.as_str().to_string(),
            label: tag.as_str().to_string(),
            selected: tag.as_str() == selected,
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct GeneratePage {
    pub(crate) style_options: Vec<StyleOption>,
    pub(crate) prompt: String,
    pub(crate) has_error: bool,
    pub(crate) error_message: String,
    pub(crate) has_result: bool,
    pub(crate) result_image_id: i32,
    pub(crate) result_image_b64: String,
    pub(crate) result_prompt: String,
    pub(crate) result_placeholder: bool,
    pub(crate) csrf_token: String,
    pub(crate) has_flash: bool,
    pub(crate) flash_message: String,
    pub(crate) flash_class: String,
}

impl GeneratePage {
    /// An empty form, no result section.
    pub(crate) fn blank(csrf_token: String) -> Self {
        Self {
            style_options: style_options(StyleTag::Realistic.as_str()),
            prompt: String::new(),
            has_error: false,
            error_message: String::new(),
            has_result: false,
            result_image_id: 0,
            result_image_b64: String::new(),
            result_prompt: String::new(),
            result_placeholder: false,
            csrf_token,
            has_flash: false,
            flash_message: String::new(),
            flash_class: String::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GalleryItem {
    pub(crate) image_id: i32,
    pub(crate) prompt_snippet: String,
    pub(crate) style: String,
    pub(crate) placeholder: bool,
    pub(crate) has_rating: bool,
    pub(crate) rating_label: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "gallery.html")]
pub(crate) struct GalleryPage {
    pub(crate) items: Vec<GalleryItem>,
    pub(crate) has_items: bool,
    pub(crate) filter_options: Vec<StyleOption>,
    pub(crate) page: u64,
    pub(crate) total_pages: u64,
    pub(crate) has_prev: bool,
    pub(crate) prev_url: String,
    pub(crate) has_next: bool,
    pub(crate) next_url: String,
    pub(crate) csrf_token: String,
    pub(crate) has_flash: bool,
    pub(crate) flash_message: String,
    pub(crate) flash_class: String,
}

#[derive(Clone, Debug)]
pub(crate) struct HistoryEntry {
    pub(crate) image_id: i32,
    pub(crate) prompt: String,
    pub(crate) augmented_prompt: String,
    pub(crate) style: String,
    pub(crate) created_label: String,
    pub(crate) placeholder: bool,
    pub(crate) has_rating: bool,
    pub(crate) rating_label: String,
    pub(crate) feedback: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "history.html")]
pub(crate) struct HistoryPage {
    pub(crate) entries: Vec<HistoryEntry>,
    pub(crate) has_entries: bool,
    pub(crate) csrf_token: String,
    pub(crate) has_flash: bool,
    pub(crate) flash_message: String,
    pub(crate) flash_class: String,
}

#[derive(Clone, Debug)]
pub(crate) struct StyleRow {
    pub(crate) style: String,
    pub(crate) average_label: String,
    pub(crate) count: i64,
}

#[derive(Clone, Debug)]
pub(crate) struct DetailRow {
    pub(crate) image_id: i32,
    pub(crate) prompt: String,
    pub(crate) style: String,
    pub(crate) rating: i32,
    pub(crate) feedback: String,
    pub(crate) created_label: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "report.html")]
pub(crate) struct ReportPage {
    pub(crate) has_stats: bool,
    pub(crate) average_label: String,
    pub(crate) total_count: i64,
    pub(crate) styles: Vec<StyleRow>,
    pub(crate) details: Vec<DetailRow>,
    pub(crate) has_flash: bool,
    pub(crate) flash_message: String,
    pub(crate) flash_class: String,
}

fn format_rating(average: f64) -> String {
    format!("{:.1}/5", average)
}

fn format_timestamp(value: chrono::NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

fn snippet(prompt: &str) -> String {
    let mut chars = prompt.chars();
    let head: String = chars.by_ref().take(50).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// handles the / GET
pub(crate) async fn index_handler(
    State(_state): State<AppState>,
    session: Session,
) -> Result<GeneratePage, GalleryError> {
    let csrf_token = csrf_token(&session).await?;
    let (has_flash, flash_message, flash_class) = flash::flash_fields(&session).await?;
    let mut page = GeneratePage::blank(csrf_token);
    page.has_flash = has_flash;
    page.flash_message = flash_message;
    page.flash_class = flash_class;
    Ok(page)
}

#[derive(Deserialize)]
pub(crate) struct GalleryQuery {
    style: Option<String>,
    page: Option<u64>,
}

fn gallery_page_url(style: &str, page: u64) -> String {
    if style.is_empty() {
        format!("/gallery?page={page}")
    } else {
        format!("/gallery?style={style}&page={page}")
    }
}

/// handles the /gallery GET
pub(crate) async fn gallery_handler(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<GalleryQuery>,
) -> Result<GalleryPage, GalleryError> {
    let style_filter = query.style.as_deref().and_then(StyleTag::parse);
    let selected_style = style_filter.map(|tag| tag.as_str()).unwrap_or_default();

    let mut select = images::Entity::find()
        .find_also_related(prompts::Entity)
        .order_by_desc(images::Column::CreatedAt);
    if let Some(tag) = style_filter {
        select = select.filter(prompts::Column::Style.eq(tag.as_str()));
    }

    let paginator = select.paginate(&state.db, GALLERY_PAGE_SIZE);
    let total_pages = paginator.num_pages().await?;
    let page = query.page.unwrap_or(1).max(1).min(total_pages.max(1));
    let rows = paginator.fetch_page(page - 1).await?;

    let image_ids: Vec<i32> = rows.iter().map(|(image, _)| image.id).collect();
    let ratings = evaluations::Entity::find()
        .filter(evaluations::Column::ImageId.is_in(image_ids))
        .all(&state.db)
        .await?;
    let mut rating_sums: HashMap<i32, (i64, i64)> = HashMap::new();
    for rating in ratings {
        let entry = rating_sums.entry(rating.image_id).or_insert((0, 0));
        entry.0 += i64::from(rating.rating);
        entry.1 += 1;
    }

    let mut items = Vec::with_capacity(rows.len());
    for (image, prompt) in rows {
        let Some(prompt) = prompt else {
            // dangling image row, should not happen with the delete cascade
            continue;
        };
        let rating = rating_sums
            .get(&image.id)
            .map(|(sum, count)| *sum as f64 / *count as f64);
        items.push(GalleryItem {
            image_id: image.id,
            prompt_snippet: snippet(&prompt.raw_prompt),
            style: prompt.style,
            placeholder: image.placeholder,
            has_rating: rating.is_some(),
            rating_label: rating.map(format_rating).unwrap_or_default(),
        });
    }

    let csrf_token = csrf_token(&session).await?;
    let (has_flash, flash_message, flash_class) = flash::flash_fields(&session).await?;
    Ok(GalleryPage {
        has_items: !items.is_empty(),
        items,
        filter_options: style_options(selected_style),
        page,
        total_pages: total_pages.max(1),
        has_prev: page > 1,
        prev_url: gallery_page_url(selected_style, page.saturating_sub(1).max(1)),
        has_next: page < total_pages,
        next_url: gallery_page_url(selected_style, page + 1),
        csrf_token,
        has_flash,
        flash_message,
        flash_class,
    })
}

/// handles the /history GET
pub(crate) async fn history_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<HistoryPage, GalleryError> {
    let rows = prompts::Entity::find()
        .find_also_related(images::Entity)
        .order_by_desc(prompts::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let image_ids: Vec<i32> = rows
        .iter()
        .filter_map(|(_, image)| image.as_ref().map(|image| image.id))
        .collect();
    let ratings = evaluations::Entity::find()
        .filter(evaluations::Column::ImageId.is_in(image_ids))
        .order_by_desc(evaluations::Column::CreatedAt)
        .all(&state.db)
        .await?;
    // newest first, so the first hit per image is the latest rating
    let mut latest: HashMap<i32, (i32, Option<String>)> = HashMap::new();
    for rating in ratings {
        latest
            .entry(rating.image_id)
            .or_insert((rating.rating, rating.feedback));
    }

    let mut entries = Vec::with_capacity(rows.len());
    for (prompt, image) in rows {
        let Some(image) = image else {
            continue;
        };
        let rating = latest.get(&image.id);
        entries.push(HistoryEntry {
            image_id: image.id,
            prompt: prompt.raw_prompt,
            augmented_prompt: prompt.augmented_prompt,
            style: prompt.style,
            created_label: format_timestamp(prompt.created_at),
            placeholder: image.placeholder,
            has_rating: rating.is_some(),
            rating_label: rating
                .map(|(value, _)| format!("{value}/5"))
                .unwrap_or_default(),
            feedback: rating
                .and_then(|(_, feedback)| feedback.clone())
                .unwrap_or_default(),
        });
    }

    let csrf_token = csrf_token(&session).await?;
    let (has_flash, flash_message, flash_class) = flash::flash_fields(&session).await?;
    Ok(HistoryPage {
        has_entries: !entries.is_empty(),
        entries,
        csrf_token,
        has_flash,
        flash_message,
        flash_class,
    })
}

/// handles the /report GET
pub(crate) async fn report_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<ReportPage, GalleryError> {
    let overall = evaluations::overall_stats(&state.db).await?;
    let breakdown = evaluations::style_breakdown(&state.db).await?;

    let all_evaluations = evaluations::Entity::find()
        .order_by_desc(evaluations::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let image_ids: Vec<i32> = all_evaluations
        .iter()
        .map(|evaluation| evaluation.image_id)
        .collect();
    let image_rows = images::Entity::find()
        .filter(images::Column::Id.is_in(image_ids))
        .all(&state.db)
        .await?;
    let prompt_ids: Vec<i32> = image_rows.iter().map(|image| image.prompt_id).collect();
    let prompt_rows = prompts::Entity::find()
        .filter(prompts::Column::Id.is_in(prompt_ids))
        .all(&state.db)
        .await?;
    let image_prompts: HashMap<i32, i32> = image_rows
        .iter()
        .map(|image| (image.id, image.prompt_id))
        .collect();
    let prompts_by_id: HashMap<i32, &prompts::Model> =
        prompt_rows.iter().map(|prompt| (prompt.id, prompt)).collect();

    let mut details = Vec::with_capacity(all_evaluations.len());
    for evaluation in &all_evaluations {
        let prompt = image_prompts
            .get(&evaluation.image_id)
            .and_then(|prompt_id| prompts_by_id.get(prompt_id));
        let Some(prompt) = prompt else {
            continue;
        };
        details.push(DetailRow {
            image_id: evaluation.image_id,
            prompt: prompt.raw_prompt.clone(),
            style: prompt.style.clone(),
            rating: evaluation.rating,
            feedback: evaluation.feedback.clone().unwrap_or_default(),
            created_label: format_timestamp(evaluation.created_at),
        });
    }

    let styles = breakdown
        .into_iter()
        .map(|stats| StyleRow {
            style: stats.style,
            average_label: format_rating(stats.average),
            count: stats.count,
        })
        .collect();

    let (has_flash, flash_message, flash_class) = flash::flash_fields(&session).await?;
    Ok(ReportPage {
        has_stats: overall.is_some(),
        average_label: overall
            .map(|stats| format_rating(stats.average))
            .unwrap_or_default(),
        total_count: overall.map(|stats| stats.count).unwrap_or(0),
        styles,
        details,
        has_flash,
        flash_message,
        flash_class,
    })
}
