use std::time::Duration;

use clap::Parser;
use sdgallery::config::setup_logging;
use sdgallery::generator::ImageGenerator;
use sdgallery::rate_limit::RateLimiter;
use sea_orm_migration::MigratorTrait;
use tracing::{error, warn};

#[tokio::main(flavor = "multi_thread", worker_threads = 32)]
async fn main() {
    let cli = sdgallery::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let database_path = cli
        .database_path
        .clone()
        .unwrap_or_else(|| sdgallery::constants::DATABASE_PATH.to_string());
    let db = match sdgallery::db::connect_db(&database_path).await {
        Ok(db) => db,
        Err(err) => {
            error!("Database connection error: {}", err);
            return;
        }
    };

    if let Err(err) = sdgallery::db::migrations::Migrator::up(&db, None).await {
        error!("Database migration error: {}", err);
        return;
    }

    let image_dir = cli
        .image_dir
        .clone()
        .unwrap_or_else(|| sdgallery::constants::IMAGE_DIR.clone());
    if let Err(err) = tokio::fs::create_dir_all(&image_dir).await {
        error!("Failed to create image dir {}: {}", image_dir.display(), err);
        return;
    }

    let generator = match ImageGenerator::new(cli.api_token.clone()) {
        Ok(generator) => generator,
        Err(err) => {
            error!("Failed to build inference client: {}", err);
            return;
        }
    };
    if generator.demo_mode() {
        warn!("No API token configured, running in demo mode with placeholder images");
    }

    let rate_limiter = RateLimiter::new(
        cli.rate_limit_requests,
        Duration::from_secs(cli.rate_limit_window_secs),
    );

    if cli.seed_demo_data
        && let Err(err) = sdgallery::seed::seed_demo_data(&db, &image_dir).await
    {
        error!("Failed to seed demo data: {:?}", err);
        return;
    }

    if let Err(err) = sdgallery::web::setup_server(
        &cli.listen_address,
        cli.port,
        image_dir,
        db,
        generator,
        rate_limiter,
    )
    .await
    {
        error!("Application error: {}", err);
    }
}
