use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
};
use dotenvy::dotenv;
use homehive::{
    auth::HmacGate, blob_store::LocalBlobStore, config, db_ops::PgRepository,
    lifecycle::Lifecycle, models::AppState, routes,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homehive=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(config::DB_MAX_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .context("pool to be able to connect")?;
    sqlx::migrate!().run(&db).await.context("running migrations")?;

    let blobs = LocalBlobStore::new(
        &config.blob_root,
        &config.blob_folder,
        &config.public_base_url,
    )?;
    let state = AppState {
        lifecycle: Arc::new(Lifecycle::new(
            Arc::new(PgRepository::new(db)),
            Arc::new(blobs),
        )),
        gate: Arc::new(HmacGate::new(config.session_secret.as_str())),
        purge_on_update: config.purge_on_update,
        mutations_require_admin: config.mutations_require_admin,
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .context("CORS_ORIGIN must be a valid origin")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = routes::get_routes()
        .nest_service("/uploads", ServeDir::new(&config.blob_root))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("listening on {}", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
