//! Video Publisher CLI
//!
//! Multi-platform video publishing assistant

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use video_publisher::core::config_loader::{ConfigLoadOptions, ConfigLoader};
use video_publisher::core::{
    ConfigError, Platform, PlatformPublisher, ServiceConfig, VideoOrder, VideoQuery,
};
use video_publisher::orchestration::{
    AggregateResult, OverallStatus, PublicationOptions, PublicationService, UploadRequest,
    VideoIngestService,
};
use video_publisher::platforms::PublisherRegistry;
use video_publisher::security::{EnvCredentialStore, required_secrets};
use video_publisher::storage::{PgVideoRepository, S3ObjectStore};
use video_publisher::validation::VideoValidator;

/// Multi-platform video publishing assistant
#[derive(Parser)]
#[command(name = "video-publisher")]
#[command(version)]
#[command(about = "Publish stored videos to Instagram, TikTok, X and Facebook", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./video-publisher.yaml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a stored video to one or more platforms
    Publish {
        /// Video ID
        #[arg(value_name = "VIDEO_ID")]
        video_id: i64,

        /// Comma-separated list of platforms (instagram, tiktok, x, facebook)
        #[arg(short, long, value_delimiter = ',', required = true)]
        platforms: Vec<String>,

        /// Maximum concurrent platform attempts (1 = sequential)
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Print the aggregate result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a local video file and record its metadata
    Upload {
        /// Video file to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Video title
        #[arg(short, long)]
        title: String,

        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,

        /// Video description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Duration in seconds
        #[arg(long, default_value_t = 0.0)]
        duration: f64,

        /// Print the stored video as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the publication history of a video
    Status {
        /// Video ID
        #[arg(value_name = "VIDEO_ID")]
        video_id: i64,

        /// Print the history as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported platforms and their requirements
    Platforms,

    /// List stored videos
    Videos {
        /// Only videos whose title contains this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Sort key, newest or last title first (upload_date, title)
        #[arg(long, default_value = "upload_date")]
        order_by: VideoOrder,
    },

    /// Validate configuration and platform credentials
    CheckConfig,

    /// Create the database tables if they do not exist
    InitDb,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let result = run().await;

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(ConfigLoadOptions::from_process_env(cli.config))
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Publish {
            video_id,
            platforms,
            max_concurrency,
            json,
        } => publish_command(config, video_id, platforms, max_concurrency, json).await,
        Commands::Upload {
            file,
            title,
            tags,
            description,
            duration,
            json,
        } => {
            let options = UploadOptions {
                title,
                tags,
                description,
                duration,
                json,
            };
            upload_command(&config, file, options).await
        }
        Commands::Status { video_id, json } => status_command(config, video_id, json).await,
        Commands::Platforms => platforms_command(&config),
        Commands::Videos { search, order_by } => {
            videos_command(config, VideoQuery { search, order_by }).await
        }
        Commands::CheckConfig => check_config_command(&config),
        Commands::InitDb => init_db_command(&config).await,
    }
}

async fn connect_repository(config: &ServiceConfig) -> Result<PgVideoRepository> {
    let url = config
        .database
        .url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or(ConfigError::Missing("DATABASE_URL"))?;

    PgVideoRepository::connect(url)
        .await
        .context("Failed to connect to database")
}

fn build_registry(config: &ServiceConfig, credentials: &EnvCredentialStore) -> Result<PublisherRegistry> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("video-publisher/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    Ok(PublisherRegistry::from_config(config, credentials, http))
}

async fn build_service(config: &ServiceConfig) -> Result<PublicationService> {
    let repository = connect_repository(config).await?;
    let object_store = S3ObjectStore::from_config(&config.storage).await?;
    let registry = build_registry(config, &EnvCredentialStore::from_env())?;

    Ok(PublicationService::new(
        Arc::new(repository),
        Arc::new(object_store),
        registry,
        VideoValidator::new(&config.validation),
        PublicationOptions::from_config(config),
    ))
}

async fn publish_command(
    mut config: ServiceConfig,
    video_id: i64,
    platforms: Vec<String>,
    max_concurrency: Option<usize>,
    json: bool,
) -> Result<i32> {
    if !json {
        println!("\n🎬 video-publisher\n");
    }

    if let Some(max_concurrency) = max_concurrency {
        config.orchestration.max_concurrency = max_concurrency;
    }

    let platforms: Vec<String> = platforms
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let service = build_service(&config).await?;

    match service.publish_video(video_id, &platforms).await {
        Ok(result) => {
            let status = result.overall_status();
            if json {
                println!("{}", publish_json(&result)?);
                return Ok(publish_exit_code(status));
            }

            PublicationService::print_summary(&result);
            match status {
                OverallStatus::Success => println!("✅ Publishing completed successfully!"),
                OverallStatus::Partial => println!("🟡 Publishing completed with errors"),
                OverallStatus::Failed => println!("❌ Publishing failed on every platform"),
            }
            Ok(publish_exit_code(status))
        }
        Err(e) if e.is_client_error() => {
            eprintln!("\n❌ Publishing rejected [{}]: {}", e.code(), e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

/// With `--json` this is the only thing written to stdout
fn publish_json(result: &AggregateResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Partial success still exits 0; only a run with no successes fails
fn publish_exit_code(status: OverallStatus) -> i32 {
    match status {
        OverallStatus::Success | OverallStatus::Partial => 0,
        OverallStatus::Failed => 1,
    }
}

struct UploadOptions {
    title: String,
    tags: String,
    description: String,
    duration: f64,
    json: bool,
}

async fn upload_command(config: &ServiceConfig, file: PathBuf, options: UploadOptions) -> Result<i32> {
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let body = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let repository = connect_repository(config).await?;
    let object_store = S3ObjectStore::from_config(&config.storage).await?;
    let service = VideoIngestService::new(
        Arc::new(repository),
        Arc::new(object_store),
        VideoValidator::new(&config.validation),
    );

    let request = UploadRequest {
        filename,
        body: body.into(),
        title: options.title,
        description: options.description,
        tags: options.tags,
        duration: options.duration,
    };

    match service.upload_video(request).await {
        Ok(uploaded) if options.json => {
            println!("{}", serde_json::to_string_pretty(&uploaded)?);
            Ok(0)
        }
        Ok(uploaded) => {
            println!("✅ Uploaded video {} ({})", uploaded.video_id, uploaded.s3_key);
            Ok(0)
        }
        Err(e) if e.is_client_error() => {
            eprintln!("\n❌ Upload rejected [{}]: {}", e.code(), e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

async fn status_command(config: ServiceConfig, video_id: i64, json: bool) -> Result<i32> {
    let service = build_service(&config).await?;
    let report = service.publication_status(video_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.to_markdown());
    }

    Ok(0)
}

fn platforms_command(config: &ServiceConfig) -> Result<i32> {
    println!("\n📱 Supported Platforms\n");

    let credentials = EnvCredentialStore::from_env();
    let registry = build_registry(config, &credentials)?;

    for platform in registry.available_platforms() {
        let Some(publisher) = registry.resolve(platform.as_str()) else {
            continue;
        };
        let requirements = publisher.platform_requirements();
        let configured = if credentials.missing_for(platform).is_empty() {
            "✅ configured"
        } else {
            "❌ not configured"
        };

        println!("{} ({}) {}", platform, platform.as_str(), configured);
        println!("   Max file size:  {}MB", requirements.max_file_size_mb);
        println!("   Max duration:   {}s", requirements.max_duration_seconds);
        println!("   Formats:        {}", requirements.supported_formats.join(", "));
        println!("   Caption limit:  {} characters\n", requirements.max_caption_length);
    }

    Ok(0)
}

async fn videos_command(config: ServiceConfig, query: VideoQuery) -> Result<i32> {
    let service = build_service(&config).await?;
    let videos = service.list_videos(&query).await?;

    if videos.is_empty() {
        println!("No videos stored");
        return Ok(0);
    }

    println!("| ID | Filename | Size | Duration | Title |");
    println!("|----|----------|------|----------|-------|");
    for video in videos {
        println!(
            "| {} | {} | {:.2}MB | {:.1}s | {} |",
            video.id,
            video.filename,
            video.file_size_mb(),
            video.duration,
            video.title
        );
    }

    Ok(0)
}

fn check_config_command(config: &ServiceConfig) -> Result<i32> {
    println!("\n🔍 Configuration Check\n");

    let result = ConfigLoader::validate(config);
    println!("{}", ConfigLoader::format_validation_result(&result));

    println!("\nPlatform credentials:");
    let credentials = EnvCredentialStore::from_env();
    for platform in Platform::ALL {
        let missing = credentials.missing_for(platform);
        if missing.is_empty() {
            println!("  ✅ {}", platform);
        } else {
            println!(
                "  ❌ {} (missing {} of {}: {})",
                platform,
                missing.len(),
                required_secrets(platform).len(),
                missing.join(", ")
            );
        }
    }
    println!();

    Ok(if result.valid { 0 } else { 1 })
}

async fn init_db_command(config: &ServiceConfig) -> Result<i32> {
    let repository = connect_repository(config).await?;
    repository.ensure_schema().await?;
    println!("✅ Database schema is up to date");
    Ok(0)
}
