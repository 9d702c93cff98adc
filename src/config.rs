//! Runtime configuration comes from the environment (and `.env`, which
//! `main` loads first). A couple of limits stay hard-coded.

use anyhow::{anyhow, Context, Result};
use std::{env, net::SocketAddr, path::PathBuf};

/// Upper bound on new image uploads in one create or update request.
pub const MAX_IMAGES_PER_REQUEST: usize = 10;

/// Postgres default max connections is 100, and we'll take most of 'em.
pub const DB_MAX_CONNECTIONS: u32 = 80;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub bind_addr: SocketAddr,
    pub blob_root: PathBuf,
    pub blob_folder: String,
    pub public_base_url: String,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
    /// Delete images released by an update right away instead of leaving
    /// them in the blob store.
    pub purge_on_update: bool,
    pub mutations_require_admin: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                anyhow!("{key} to be defined in environment")
            })
        };
        let or = |key: &str, default: &str| {
            lookup(key).unwrap_or_else(|| default.to_string())
        };
        let flag = |key: &str| -> Result<bool> {
            match lookup(key) {
                None => Ok(false),
                Some(v) => v
                    .parse::<bool>()
                    .with_context(|| format!("{key} must be true or false")),
            }
        };

        let database_url = format!(
            "postgres://{}:{}@{}:5432/{}",
            required("POSTGRES_USER")?,
            required("POSTGRES_PASSWORD")?,
            or("POSTGRES_HOST", "localhost"),
            required("POSTGRES_DB")?,
        );

        let port: u16 = or("PORT", "5000")
            .parse()
            .context("PORT must be a port number")?;
        let host = or("HOST", "127.0.0.1");
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .context("HOST must be an IP address")?;

        Ok(Self {
            database_url,
            session_secret: required("SESSION_SECRET")?,
            bind_addr,
            blob_root: PathBuf::from(or("BLOB_ROOT", "./uploads")),
            blob_folder: or("BLOB_FOLDER", "properties"),
            public_base_url: or(
                "PUBLIC_BASE_URL",
                &format!("http://localhost:{port}/uploads"),
            ),
            cors_origin: or("CORS_ORIGIN", "http://localhost:3000"),
            max_upload_bytes: or("MAX_UPLOAD_BYTES", "52428800")
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            purge_on_update: flag("PURGE_ON_UPDATE")?,
            mutations_require_admin: flag("MUTATIONS_REQUIRE_ADMIN")?,
        })
    }
}
