//! `mediaq config` – show where the config lives and what is in effect.

use anyhow::Result;
use mediaq_core::config::{self, MediaqConfig};
use mediaq_core::logging;

pub fn run_config(cfg: &MediaqConfig) -> Result<()> {
    println!("config file: {}", config::config_path()?.display());
    if let Ok(log) = logging::log_file_path() {
        println!("log file:    {}", log.display());
    }
    println!();
    println!("max_concurrent_downloads = {}", cfg.max_concurrent_downloads);
    println!("download_dir             = {}", cfg.download_dir.display());
    if let Some(temp) = &cfg.temp_dir {
        println!("temp_dir                 = {}", temp.display());
    }
    println!("max_file_size            = {}", cfg.max_file_size);
    println!("inline_media_max_size    = {}", cfg.inline_media_max_size);
    println!("progress_interval_ms     = {}", cfg.progress_interval_ms);
    println!("allowed_hosts            = {}", cfg.allowed_hosts.join(", "));
    println!("extractor.program        = {}", cfg.extractor.program);
    println!("extractor.quality        = {}", cfg.extractor.quality);
    println!("extractor.audio_only     = {}", cfg.extractor.audio_only);
    println!("extractor.playlist       = {}", cfg.extractor.playlist);
    Ok(())
}
