use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for `max_concurrent_downloads`.
///
/// Admitted operations run on Tokio's blocking pool (512 threads by default);
/// a larger gate would let admitted tasks queue invisibly behind the pool.
pub const MAX_CONCURRENT_DOWNLOADS_LIMIT: usize = 512;

/// Configuration rejected by [`MediaqConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_concurrent_downloads must be between 1 and {max}, got {0}", max = MAX_CONCURRENT_DOWNLOADS_LIMIT)]
    Concurrency(usize),
    #[error("allowed_hosts must not be empty")]
    NoAllowedHosts,
    #[error("extractor.program must not be empty")]
    NoExtractorProgram,
    #[error("download dir {}: {source}", .path.display())]
    DownloadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// External extractor invocation (optional `[extractor]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Program to run (a yt-dlp compatible CLI).
    pub program: String,
    /// Format selector passed to `-f`.
    pub format: String,
    /// Video quality selector; anything other than "best" is combined with best audio.
    pub quality: String,
    /// Extract audio only (mp3).
    pub audio_only: bool,
    /// Download whole playlists instead of the single linked item.
    pub playlist: bool,
    /// Output filename template, relative to the download dir.
    pub output_template: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            format: "best".to_string(),
            quality: "best".to_string(),
            audio_only: false,
            playlist: false,
            output_template: "%(title)s.%(ext)s".to_string(),
        }
    }
}

/// Texts sent back to chat users (optional `[messages]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotMessages {
    pub start: String,
    pub processing: String,
    pub queued: String,
    pub success: String,
    pub error: String,
    pub cancelled: String,
    pub invalid_link: String,
}

impl Default for BotMessages {
    fn default() -> Self {
        Self {
            start: "Welcome to the media downloader bot!\n\nSend me a link or a video and I'll download it for you.".to_string(),
            processing: "Processing your request...".to_string(),
            queued: "Download queued".to_string(),
            success: "Download succeeded".to_string(),
            error: "An error occurred while processing your request.".to_string(),
            cancelled: "Download cancelled".to_string(),
            invalid_link: "Please send a valid link.".to_string(),
        }
    }
}

/// Global configuration loaded from `~/.config/mediaq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaqConfig {
    /// Maximum downloads running at once.
    pub max_concurrent_downloads: usize,
    /// Where finished files are placed.
    pub download_dir: PathBuf,
    /// Scratch dir for in-progress extractor files (None = extractor default).
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Size cap for extractor downloads in bytes (0 = no cap).
    pub max_file_size: u64,
    /// Size cap for inline media attached to chat messages, in bytes.
    pub inline_media_max_size: u64,
    /// Minimum interval between forwarded progress updates per task.
    pub progress_interval_ms: u64,
    /// Link hosts accepted for download (subdomains included).
    pub allowed_hosts: Vec<String>,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub messages: BotMessages,
}

impl Default for MediaqConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            download_dir: PathBuf::from("./downloads"),
            temp_dir: None,
            max_file_size: 5_000_000_000,
            inline_media_max_size: 20 * 1024 * 1024,
            progress_interval_ms: 3_000,
            allowed_hosts: vec!["youtube.com".to_string(), "youtu.be".to_string()],
            extractor: ExtractorConfig::default(),
            messages: BotMessages::default(),
        }
    }
}

impl MediaqConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Check limits and make sure the download dir exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_downloads == 0
            || self.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS_LIMIT
        {
            return Err(ConfigError::Concurrency(self.max_concurrent_downloads));
        }
        if self.allowed_hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::NoAllowedHosts);
        }
        if self.extractor.program.trim().is_empty() {
            return Err(ConfigError::NoExtractorProgram);
        }
        fs::create_dir_all(&self.download_dir).map_err(|source| ConfigError::DownloadDir {
            path: self.download_dir.clone(),
            source,
        })?;
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mediaq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<MediaqConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: MediaqConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MediaqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MediaqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = MediaqConfig::default();
        assert_eq!(cfg.max_concurrent_downloads, 3);
        assert_eq!(cfg.max_file_size, 5_000_000_000);
        assert_eq!(cfg.progress_interval(), Duration::from_secs(3));
        assert_eq!(cfg.extractor.program, "yt-dlp");
        assert_eq!(cfg.allowed_hosts, vec!["youtube.com", "youtu.be"]);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = MediaqConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: MediaqConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_concurrent_downloads, cfg.max_concurrent_downloads);
        assert_eq!(parsed.download_dir, cfg.download_dir);
        assert_eq!(parsed.messages.success, cfg.messages.success);
    }

    #[test]
    fn config_toml_sections_optional() {
        let toml = r#"
            max_concurrent_downloads = 2
            download_dir = "/srv/media"
            max_file_size = 0
            inline_media_max_size = 1024
            progress_interval_ms = 500
            allowed_hosts = ["vimeo.com"]
        "#;
        let cfg: MediaqConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent_downloads, 2);
        assert_eq!(cfg.download_dir, PathBuf::from("/srv/media"));
        assert!(cfg.temp_dir.is_none());
        assert_eq!(cfg.extractor.format, "best");
        assert_eq!(cfg.messages.cancelled, "Download cancelled");
    }

    #[test]
    fn config_toml_partial_extractor_section() {
        let toml = r#"
            max_concurrent_downloads = 1
            download_dir = "d"
            max_file_size = 10
            inline_media_max_size = 10
            progress_interval_ms = 10
            allowed_hosts = ["youtu.be"]

            [extractor]
            audio_only = true
            quality = "720p"
        "#;
        let cfg: MediaqConfig = toml::from_str(toml).unwrap();
        assert!(cfg.extractor.audio_only);
        assert_eq!(cfg.extractor.quality, "720p");
        assert_eq!(cfg.extractor.program, "yt-dlp");
        assert!(!cfg.extractor.playlist);
    }

    #[test]
    fn validate_rejects_bad_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = MediaqConfig {
            download_dir: dir.path().join("dl"),
            ..MediaqConfig::default()
        };
        cfg.max_concurrent_downloads = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Concurrency(0))));
        cfg.max_concurrent_downloads = MAX_CONCURRENT_DOWNLOADS_LIMIT + 1;
        assert!(matches!(cfg.validate(), Err(ConfigError::Concurrency(_))));
    }

    #[test]
    fn validate_rejects_empty_hosts_and_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = MediaqConfig {
            download_dir: dir.path().to_path_buf(),
            ..MediaqConfig::default()
        };
        cfg.allowed_hosts = vec!["  ".to_string()];
        assert!(matches!(cfg.validate(), Err(ConfigError::NoAllowedHosts)));
        cfg.allowed_hosts = vec!["youtu.be".to_string()];
        cfg.extractor.program = String::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoExtractorProgram)));
    }

    #[test]
    fn validate_creates_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = MediaqConfig {
            download_dir: dir.path().join("nested").join("downloads"),
            ..MediaqConfig::default()
        };
        cfg.validate().unwrap();
        assert!(cfg.download_dir.is_dir());
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = MediaqConfig {
            max_concurrent_downloads: 5,
            ..MediaqConfig::default()
        };
        fs::write(&path, toml::to_string_pretty(&cfg).unwrap()).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.max_concurrent_downloads, 5);
        assert!(load_from_path(&dir.path().join("missing.toml")).is_err());
    }
}
