// Copyright 2023 Remi Bernotavicius

use reqwest::Url;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/api/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid backend url {url:?}: {reason}")]
    BackendUrl { url: String, reason: String },
    #[error("failed to get user home directory")]
    NoHomeDirectory,
    #[error("couldn't create data directory {path:?}: {source}")]
    DataDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(backend_url: &str, data_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let backend_url = validate_backend_url(backend_url)?;
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_path()?,
        };
        std::fs::create_dir_all(&data_dir).map_err(|source| ConfigError::DataDirectory {
            path: data_dir.clone(),
            source,
        })?;
        Ok(Self {
            backend_url,
            data_dir,
        })
    }
}

/// This is where the persisted filter and other user-data lives on-disk. On Linux it should be
/// like: `~/.local/share/diet_manager/`
fn default_data_path() -> Result<PathBuf, ConfigError> {
    let dirs = directories::BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(dirs.data_dir().join("diet_manager"))
}

fn validate_backend_url(url: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::BackendUrl {
        url: url.into(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", parsed.scheme())));
    }
    if parsed.host().is_none() {
        return Err(invalid("missing host".into()));
    }
    Ok(url.trim_end_matches('/').into())
}

#[test]
fn backend_url_must_be_http() {
    assert_eq!(
        validate_backend_url("https://rs.example.org/api/v1/").unwrap(),
        "https://rs.example.org/api/v1"
    );
    assert!(validate_backend_url("ftp://rs.example.org").is_err());
    assert!(validate_backend_url("localhost:8080").is_err());
    assert!(validate_backend_url("not a url").is_err());
}

#[test]
fn data_dir_override_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("nested").join("diet");
    let config = Config::new(DEFAULT_BACKEND_URL, Some(data_dir.clone())).unwrap();
    assert_eq!(config.data_dir, data_dir);
    assert!(data_dir.is_dir());
}
