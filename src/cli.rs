//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "SDGALLERY_DEBUG")]
    /// Enable debug logging. Env: SDGALLERY_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "SDGALLERY_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: SDGALLERY_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "SDGALLERY_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: SDGALLERY_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "SDGALLERY_DATABASE_PATH")]
    /// Path to the database file, eg `/data/sdgallery.sqlite`.
    /// Env: SDGALLERY_DATABASE_PATH
    pub database_path: Option<String>,

    #[clap(long, env = "SDGALLERY_IMAGE_DIR")]
    /// Directory for generated image files, defaults to `./generated_images`.
    /// Env: SDGALLERY_IMAGE_DIR
    pub image_dir: Option<PathBuf>,

    #[clap(long, env = "SDGALLERY_API_TOKEN", hide_env_values = true)]
    /// Bearer token for the hosted inference API. When unset the app runs in
    /// demo mode and serves placeholder images.
    /// Env: SDGALLERY_API_TOKEN
    pub api_token: Option<String>,

    #[clap(long, default_value = "5", env = "SDGALLERY_RATE_LIMIT_REQUESTS")]
    /// Maximum generation requests per rate-limit window.
    /// Env: SDGALLERY_RATE_LIMIT_REQUESTS
    pub rate_limit_requests: u32,

    #[clap(long, default_value = "60", env = "SDGALLERY_RATE_LIMIT_WINDOW_SECS")]
    /// Rate-limit window length in seconds.
    /// Env: SDGALLERY_RATE_LIMIT_WINDOW_SECS
    pub rate_limit_window_secs: u64,

    #[clap(long, env = "SDGALLERY_SEED_DEMO_DATA")]
    /// Seed three sample generations when the database is empty.
    /// Env: SDGALLERY_SEED_DEMO_DATA
    pub seed_demo_data: bool,
}
