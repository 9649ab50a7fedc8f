// src/config.rs

use std::{env, path::PathBuf, time::Duration};

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

/// Minimum number of photos required before leaving the photo step.
pub const MIN_PHOTOS: usize = 3;

/// Most photos one assessment may hold.
pub const MAX_PHOTOS: usize = 10;

/// Per-photo size limit (5 MiB), enforced by the collector and the bucket policy.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted by the photo bucket.
pub const ALLOWED_PHOTO_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 120;

/// Inclusive bounds of a `scale` answer.
pub const SCALE_MIN: i32 = 1;
pub const SCALE_MAX: i32 = 10;

pub const MAX_TEXT_ANSWER_LEN: usize = 2000;

/// Upper bound for one multipart photo request (a handful of 5 MiB images).
pub const PHOTO_UPLOAD_BODY_LIMIT: usize = 8 * MAX_PHOTO_BYTES;

/// How often idle sessions are looked for.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Directory that holds the blob store buckets.
    pub storage_root: PathBuf,
    pub photo_bucket: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Idle time after which an unfinished assessment is dropped.
    pub session_ttl: Duration,
    pub rust_log: String,
}

impl Config {
    /// Resolves the configuration once at startup.
    ///
    /// A missing backend setting is a hard error; there is no fallback chain.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;

        let storage_root = env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("storage"));

        let photo_bucket = env::var("PHOTO_BUCKET").unwrap_or_else(|_| "user-photos".to_string());
        if photo_bucket.trim().is_empty() || photo_bucket.contains(|c: char| c == '/' || c == '\\') {
            return Err(ConfigError::Invalid {
                key: "PHOTO_BUCKET",
                value: photo_bucket,
            });
        }

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            Err(_) => 3000,
        };

        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
        )?;

        let session_ttl = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "SESSION_TTL_SECS",
                        value: raw,
                    });
                }
            },
            Err(_) => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            storage_root,
            photo_bucket,
            port,
            cors_origins,
            session_ttl,
            rust_log,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

/// Splits a comma separated origin list, rejecting anything that is not an http(s) URL.
pub fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| match Url::parse(origin) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Ok(origin.trim_end_matches('/').to_string())
            }
            _ => Err(ConfigError::Invalid {
                key: "CORS_ORIGINS",
                value: origin.to_string(),
            }),
        })
        .collect()
}
