use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vidshare.toml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATABASE_PATH: &str = "vidshare.db";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
pub const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 120;

/// Raw contents of the TOML config file. Every key is optional so a partial
/// file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upload_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
    pub media_host: Option<MediaHostSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaHostSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHostConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Fully resolved settings the server runs with.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub media_host: Option<MediaHostConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            upload_dir: env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            media_host: None,
        }
    }
}

pub fn read_config_file(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let cfg: FileConfig =
        toml::from_str(&content).with_context(|| format!("Parsing {}", path.display()))?;
    Ok(Some(cfg))
}

pub fn load_app_config() -> Result<AppConfig> {
    load_app_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

/// Layers defaults, the config file (if present) and `VIDSHARE_*` environment
/// variables, in that order.
pub fn load_app_config_from(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let file = read_config_file(path)?.unwrap_or_default();
    let mut cfg = resolve(file, path)?;
    apply_env_overrides(&mut cfg, |key| env::var(key).ok())?;
    Ok(cfg)
}

fn resolve(file: FileConfig, path: &Path) -> Result<AppConfig> {
    let defaults = AppConfig::default();
    let media_host = match file.media_host {
        Some(section) => {
            let endpoint = section
                .endpoint
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| anyhow!("media_host.endpoint not set in {}", path.display()))?;
            Some(MediaHostConfig {
                endpoint,
                api_key: section.api_key.filter(|value| !value.is_empty()),
                timeout: Duration::from_secs(
                    section.timeout_secs.unwrap_or(DEFAULT_MEDIA_TIMEOUT_SECS),
                ),
            })
        }
        None => None,
    };

    Ok(AppConfig {
        database_path: file.database_path.unwrap_or(defaults.database_path),
        host: file
            .host
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.host),
        port: file.port.unwrap_or(defaults.port),
        upload_dir: file.upload_dir.unwrap_or(defaults.upload_dir),
        max_upload_bytes: file.max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
        media_host,
    })
}

fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("VIDSHARE_HOST").filter(|value| !value.is_empty()) {
        cfg.host = host;
    }
    if let Some(port) = lookup("VIDSHARE_PORT") {
        cfg.port = port
            .parse()
            .with_context(|| format!("Parsing VIDSHARE_PORT value {port:?}"))?;
    }
    if let Some(db) = lookup("VIDSHARE_DATABASE").filter(|value| !value.is_empty()) {
        cfg.database_path = PathBuf::from(db);
    }
    Ok(())
}
