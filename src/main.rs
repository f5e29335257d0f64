//! MoodShift - turns a curhatan into a Spotify playlist that fits the mood

mod api;
mod config;
mod core;
mod db;
mod errors;
mod models;
mod plugins;
mod stores;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::core::{MoodAnalyzer, MoodTable, OAuthCoordinator, PlaylistGenerator};
use crate::db::{DbEngine, PlaylistRepository, UserRepository};
use crate::plugins::{GeminiAnalyzer, MusicProvider, SpotifyClient};
use crate::stores::MemoryStore;
use crate::utils::auth::SessionCodec;

/// MoodShift API server
#[derive(Parser, Debug)]
#[command(name = "moodshift")]
#[command(version)]
#[command(about = "Turns a mood journal entry into a Spotify playlist")]
struct Args {
    /// Host address to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::new(format!(
        "{},sqlx=warn,hyper=warn,reqwest=warn",
        log_level
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("MoodShift v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.warn_missing_credentials();

    let state = build_state(&config).await?;
    serve(config, state).await
}

/// Repositories behind one allocation, so both trait objects share state
fn repositories<R>(repo: R) -> (Arc<dyn UserRepository>, Arc<dyn PlaylistRepository>)
where
    R: UserRepository + PlaylistRepository + 'static,
{
    let repo = Arc::new(repo);
    let users: Arc<dyn UserRepository> = repo.clone();
    let playlists: Arc<dyn PlaylistRepository> = repo;
    (users, playlists)
}

async fn build_state(config: &AppConfig) -> Result<web::Data<AppState>> {
    let codec = SessionCodec::new(config.session_secret.as_bytes())
        .context("SESSION_SECRET must be set to a non-empty value")?
        .with_ttl(chrono::Duration::hours(config.session_ttl_hours.max(1)));
    info!("Session tokens valid for {}h", codec.ttl().num_hours());

    let (users, playlists) = if config.database_url == "memory" {
        warn!("Using the in-memory repository; data is lost on exit");
        repositories(MemoryStore::new())
    } else {
        info!("Opening database {}", config.database_url);
        repositories(DbEngine::connect(&config.database_url).await?)
    };

    let table = match &config.mood_table_path {
        Some(path) => {
            info!("Loading mood table from {}", path);
            MoodTable::from_json_file(Path::new(path))?
        }
        None => MoodTable::default(),
    };
    let table = Arc::new(table);

    let provider: Arc<dyn MusicProvider> = Arc::new(SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
        config.spotify_redirect_uri.clone(),
        config.provider_timeout(),
    )?);

    let analyzer = Arc::new(GeminiAnalyzer::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        table.labels(),
        config.provider_timeout(),
    )?);

    let auth = Arc::new(OAuthCoordinator::new(
        provider.clone(),
        users.clone(),
        codec.clone(),
        config,
    )?);

    let emotions = Arc::new(MoodAnalyzer::new(
        analyzer,
        table.clone(),
        config.provider_timeout(),
    ));

    let generator = Arc::new(PlaylistGenerator::new(
        auth.clone(),
        provider,
        playlists,
        table,
        config.playlist_track_limit,
        config.provider_timeout(),
    ));

    Ok(web::Data::new(AppState {
        auth,
        emotions,
        playlists: generator,
        users,
        codec,
    }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "info": format!("MoodShift API v{}", env!("CARGO_PKG_VERSION")),
    }))
}

async fn serve(config: AppConfig, state: web::Data<AppState>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let origins = config.cors_origins();
    info!("Server listening on http://{}", addr);

    HttpServer::new(move || {
        let cors = match &origins {
            None => Cors::default().allow_any_origin(),
            Some(list) => list
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)),
        }
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(health))
            .service(web::scope("/api/v1").configure(api::configure))
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
