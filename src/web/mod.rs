//! axum application: state, router, server setup.

use std::num::NonZeroU16;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use sea_orm::DatabaseConnection;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::{error, info};

use crate::constants::SESSION_EXPIRY_SECONDS;
use crate::generator::ImageGenerator;
use crate::rate_limit::RateLimiter;

mod csrf;
mod flash;
mod generate;
mod images;
mod prelude;
mod views;

use generate::{delete_image_handler, generate_handler, rate_image_handler};
use images::image_file_handler;
use views::{gallery_handler, history_handler, index_handler, report_handler};

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    pub(crate) db: DatabaseConnection,
    pub(crate) image_dir: PathBuf,
    pub(crate) generator: ImageGenerator,
    pub(crate) rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    fn new(
        db: DatabaseConnection,
        image_dir: PathBuf,
        generator: ImageGenerator,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            db,
            image_dir,
            generator,
            rate_limiter,
        }
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(index_handler))
        .route("/generate", axum::routing::post(generate_handler))
        .route("/gallery", axum::routing::get(gallery_handler))
        .route("/history", axum::routing::get(history_handler))
        .route("/report", axum::routing::get(report_handler))
        .route("/images/{id}", axum::routing::get(image_file_handler))
        .route("/images/{id}/rate", axum::routing::post(rate_image_handler))
        .route(
            "/images/{id}/delete",
            axum::routing::post(delete_image_handler),
        )
        .route("/static/styles.css", axum::routing::get(styles_handler))
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

/// Builds the session layer and serves the app.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    image_dir: PathBuf,
    db: DatabaseConnection,
    generator: ImageGenerator,
    rate_limiter: RateLimiter,
) -> Result<(), anyhow::Error> {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )));
    let state = AppState::new(db, image_dir, generator, Arc::new(rate_limiter));
    let app = create_router().layer(session_layer).with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path as StdPath;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, ETAG, IF_NONE_MATCH, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    use sea_orm_migration::MigratorTrait;
    use tower::ServiceExt;

    use crate::db::entities::{evaluations, images, prompts};
    use crate::error::GalleryError;
    use crate::generator::placeholder_png;

    async fn setup_state(image_dir: &StdPath, max_requests: u32) -> AppState {
        let db = crate::db::connect_test_db().await.expect("connect test db");
        crate::db::migrations::Migrator::up(&db, None)
            .await
            .expect("run migrations");
        let generator = ImageGenerator::new(None).expect("build generator");
        AppState::new(
            db,
            image_dir.to_path_buf(),
            generator,
            Arc::new(RateLimiter::new(max_requests, Duration::from_secs(60))),
        )
    }

    fn app_for(state: AppState) -> Router {
        create_router()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state)
    }

    async fn read_body(response: axum::response::Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn session_cookie(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .expect("session cookie")
            .to_string()
    }

    fn extract_csrf(body: &str) -> String {
        let marker = "name=\"csrf_token\" value=\"";
        let start = body.find(marker).expect("csrf token in body") + marker.len();
        let rest = &body[start..];
        let end = rest.find('"').expect("csrf token end");
        rest[..end].to_string()
    }

    async fn post_generate(app: &Router, prompt: &str, style: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("POST")
            .uri("/generate")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("prompt={prompt}&style={style}")))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn seed_generation(
        db: &DatabaseConnection,
        prompt: &str,
        style: &str,
    ) -> (prompts::Model, images::Model) {
        images::record_generation(
            db,
            prompt,
            style,
            &format!("{prompt}, {style} styled"),
            &images::unique_file_name(),
            true,
        )
        .await
        .expect("record generation")
    }

    #[tokio::test]
    async fn demo_mode_generation_stores_placeholder_pair() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        let response =
            post_generate(&app, "a%20fantasy%20castle%20in%20the%20clouds", "realistic").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("demo mode"));

        let prompt = prompts::Entity::find()
            .one(&db)
            .await
            .expect("fetch prompt")
            .expect("prompt exists");
        assert_eq!(prompt.raw_prompt, "a fantasy castle in the clouds");
        assert_eq!(prompt.style, "realistic");
        assert!(prompt.augmented_prompt.contains("a fantasy castle in the clouds"));

        let image = images::Entity::find()
            .one(&db)
            .await
            .expect("fetch image")
            .expect("image exists");
        assert_eq!(image.prompt_id, prompt.id);
        assert!(image.placeholder);

        let stored = std::fs::read(image_dir.path().join(&image.file_name)).expect("read file");
        assert_eq!(stored, placeholder_png());
    }

    #[tokio::test]
    async fn unrecognized_style_keeps_prompt_unaugmented() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        let response = post_generate(&app, "a%20quiet%20harbour", "watercolour").await;
        assert_eq!(response.status(), StatusCode::OK);

        let prompt = prompts::Entity::find()
            .one(&db)
            .await
            .expect("fetch prompt")
            .expect("prompt exists");
        assert_eq!(prompt.augmented_prompt, "a quiet harbour");
        assert_eq!(prompt.style, "watercolour");
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_rows() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        let response = post_generate(&app, "%20%20", "realistic").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_body(response).await;
        assert!(body.contains("Prompt cannot be empty."));

        let count = prompts::Entity::find().count(&db).await.expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn rate_limit_rejects_after_threshold() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 1).await;
        let db = state.db.clone();
        let app = app_for(state);

        let first = post_generate(&app, "a%20red%20fox", "realistic").await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = post_generate(&app, "a%20blue%20fox", "realistic").await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = read_body(second).await;
        assert!(body.contains("Rate limit exceeded"));

        let count = prompts::Entity::find().count(&db).await.expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn rating_outside_scale_is_clamped() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        let response = post_generate(&app, "a%20panda%20on%20a%20bicycle", "cartoon").await;
        let cookie = session_cookie(&response);
        let csrf = extract_csrf(&read_body(response).await);
        let image = images::Entity::find()
            .one(&db)
            .await
            .expect("fetch image")
            .expect("image exists");

        let request = Request::builder()
            .method("POST")
            .uri(format!("/images/{}/rate", image.id))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, cookie.clone())
            .body(Body::from(format!(
                "csrf_token={csrf}&rating=99&feedback=lovely"
            )))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let request = Request::builder()
            .method("POST")
            .uri(format!("/images/{}/rate", image.id))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, cookie)
            .body(Body::from(format!("csrf_token={csrf}&rating=-3")))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let mut ratings: Vec<i32> = evaluations::Entity::find()
            .filter(evaluations::Column::ImageId.eq(image.id))
            .all(&db)
            .await
            .expect("fetch evaluations")
            .into_iter()
            .map(|evaluation| evaluation.rating)
            .collect();
        ratings.sort_unstable();
        assert_eq!(ratings, vec![1, 5]);
    }

    #[tokio::test]
    async fn rating_with_bad_csrf_is_unauthorized() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        let response = post_generate(&app, "a%20lighthouse", "realistic").await;
        let cookie = session_cookie(&response);
        let image = images::Entity::find()
            .one(&db)
            .await
            .expect("fetch image")
            .expect("image exists");

        let request = Request::builder()
            .method("POST")
            .uri(format!("/images/{}/rate", image.id))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, cookie)
            .body(Body::from("csrf_token=bogus&rating=4"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deleting_an_image_removes_rows_and_file() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        let response = post_generate(&app, "a%20robot%20chef", "cyberpunk").await;
        let cookie = session_cookie(&response);
        let csrf = extract_csrf(&read_body(response).await);
        let image = images::Entity::find()
            .one(&db)
            .await
            .expect("fetch image")
            .expect("image exists");
        evaluations::record_evaluation(&db, image.id, 4, None)
            .await
            .expect("record evaluation");
        let file_path = image_dir.path().join(&image.file_name);
        assert!(file_path.exists());

        let request = Request::builder()
            .method("POST")
            .uri(format!("/images/{}/delete", image.id))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, cookie.clone())
            .body(Body::from(format!("csrf_token={csrf}")))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        assert!(!file_path.exists());
        assert_eq!(images::Entity::find().count(&db).await.expect("count"), 0);
        assert_eq!(prompts::Entity::find().count(&db).await.expect("count"), 0);
        assert_eq!(
            evaluations::Entity::find().count(&db).await.expect("count"),
            0
        );

        let request = Request::builder()
            .method("GET")
            .uri("/gallery")
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = read_body(response).await;
        assert!(body.contains("No images generated yet"));
    }

    #[tokio::test]
    async fn gallery_filters_by_style() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        seed_generation(&db, "neon city alley", "cyberpunk").await;
        seed_generation(&db, "a watercolour meadow", "realistic").await;

        let request = Request::builder()
            .method("GET")
            .uri("/gallery?style=cyberpunk")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_body(response).await;
        assert!(body.contains("neon city alley"));
        assert!(!body.contains("a watercolour meadow"));
    }

    #[tokio::test]
    async fn gallery_paginates_nine_per_page() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        for idx in 0..12 {
            seed_generation(&db, &format!("sample prompt number {idx:02}"), "realistic").await;
        }

        let request = Request::builder()
            .method("GET")
            .uri("/gallery")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = read_body(response).await;
        assert!(body.contains("Page 1 of 2"));
        assert!(body.contains("href=\"/gallery?page=2\""));

        let request = Request::builder()
            .method("GET")
            .uri("/gallery?page=2")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = read_body(response).await;
        assert!(body.contains("Page 2 of 2"));
    }

    #[tokio::test]
    async fn report_aggregates_overall_and_per_style() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        let (_, first) = seed_generation(&db, "a fantasy castle", "realistic").await;
        let (_, second) = seed_generation(&db, "a mountain lake", "realistic").await;
        let (_, third) = seed_generation(&db, "neon market", "cyberpunk").await;
        evaluations::record_evaluation(&db, first.id, 5, Some("great match".to_string()))
            .await
            .expect("rate first");
        evaluations::record_evaluation(&db, second.id, 3, None)
            .await
            .expect("rate second");
        evaluations::record_evaluation(&db, third.id, 4, None)
            .await
            .expect("rate third");

        let overall = evaluations::overall_stats(&db)
            .await
            .expect("overall stats")
            .expect("stats present");
        assert_eq!(overall.count, 3);
        assert!((overall.average - 4.0).abs() < f64::EPSILON);

        let breakdown = evaluations::style_breakdown(&db).await.expect("breakdown");
        assert_eq!(breakdown.len(), 2);
        for stats in &breakdown {
            assert!((stats.average - 4.0).abs() < f64::EPSILON);
        }

        let request = Request::builder()
            .method("GET")
            .uri("/report")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = read_body(response).await;
        assert!(body.contains("4.0/5"));
        assert!(body.contains("cyberpunk"));
        assert!(body.contains("great match"));
    }

    #[tokio::test]
    async fn rating_an_unknown_image_is_not_found() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;

        let result = evaluations::record_evaluation(&state.db, 999, 4, None).await;
        assert!(matches!(result, Err(GalleryError::NotFound(_))));
    }

    #[tokio::test]
    async fn image_files_are_served_with_cache_headers() {
        let image_dir = tempfile::tempdir().expect("tempdir");
        let state = setup_state(image_dir.path(), 5).await;
        let db = state.db.clone();
        let app = app_for(state);

        post_generate(&app, "an%20old%20windmill", "realistic").await;
        let image = images::Entity::find()
            .one(&db)
            .await
            .expect("fetch image")
            .expect("image exists");

        let request = Request::builder()
            .method("GET")
            .uri(format!("/images/{}", image.id))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "image/png"
        );
        let etag = response
            .headers()
            .get(ETAG)
            .expect("etag header")
            .to_str()
            .unwrap()
            .to_string();

        let request = Request::builder()
            .method("GET")
            .uri(format!("/images/{}", image.id))
            .header(IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let request = Request::builder()
            .method("GET")
            .uri("/images/999")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn migrations_apply_cleanly() {
        let db = crate::db::connect_test_db().await.expect("connect test db");
        crate::db::migrations::Migrator::up(&db, None)
            .await
            .expect("run migrations");

        seed_generation(&db, "a pangolin portrait", "realistic").await;
        assert_eq!(prompts::Entity::find().count(&db).await.expect("count"), 1);
    }
}
