use anyhow::{Context, Result};
use serde::Deserialize;

/// Optional settings file. Everything here can also be given on the command
/// line, and CLI flags win.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub blog_identifier: Option<String>,
    pub dst: Option<String>,
    pub log_format: Option<String>,
    pub video_downloader: Option<String>,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {path}"))?;
        toml::from_str(&text).with_context(|| format!("invalid config file {path}"))
    }

    pub fn log_format(&self) -> &str {
        self.log_format.as_deref().unwrap_or("plain")
    }

    /// Name of the external video-downloading executable.
    pub fn video_downloader(&self) -> &str {
        self.video_downloader.as_deref().unwrap_or("yt-dlp")
    }
}

/// Find the config file: explicit flag, then env var, then XDG, then
/// `~/.config`.
pub fn discover_path(cli_path: Option<&str>) -> Option<String> {
    if let Some(path) = cli_path {
        return Some(path.to_string());
    }

    if let Ok(path) = std::env::var("LIFEBOAT_CONFIG") {
        return Some(path);
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = format!("{xdg_config_home}/lifeboat/config.toml");
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = format!("{}/.config/lifeboat/config.toml", home.display());
        if std::path::Path::new(&config_path).exists() {
            return Some(config_path);
        }
    }

    None
}

pub fn load(cli_path: Option<&str>) -> Result<Config> {
    match discover_path(cli_path) {
        Some(path) => Config::from_file(&path),
        None => Ok(Config::default()),
    }
}
