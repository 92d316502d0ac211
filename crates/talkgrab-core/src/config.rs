use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_CALENDAR_URL: &str = "https://services.sapo.pt/Codebits/calendar";
const DEFAULT_VIDEO_URL_SUFFIX: &str = "/mov/1";
const DEFAULT_BUFFER_BYTES: usize = 8192;

/// Global configuration loaded from `~/.config/talkgrab/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkgrabConfig {
    /// Calendar service URL returning the JSON event list.
    pub calendar_url: String,
    /// Appended to a talk's video page URL to obtain the direct file URL.
    pub video_url_suffix: String,
    /// Chunk size in bytes for the download read loop.
    pub buffer_bytes: usize,
    /// Directory videos and metadata are written to (None = current dir).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl Default for TalkgrabConfig {
    fn default() -> Self {
        Self {
            calendar_url: DEFAULT_CALENDAR_URL.to_string(),
            video_url_suffix: DEFAULT_VIDEO_URL_SUFFIX.to_string(),
            buffer_bytes: DEFAULT_BUFFER_BYTES,
            download_dir: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("talkgrab")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TalkgrabConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TalkgrabConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: TalkgrabConfig = toml::from_str(&data)?;
    Ok(cfg)
}
