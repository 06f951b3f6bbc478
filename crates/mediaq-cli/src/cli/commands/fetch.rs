//! `mediaq fetch <url>...` – download links directly, without the bot front end.

use anyhow::{bail, Result};
use mediaq_core::config::MediaqConfig;
use mediaq_core::extractor::ExtractorCommand;
use mediaq_core::scheduler::{ProgressEvent, Scheduler, TaskKind};
use mediaq_core::url_model::validate_link;
use tokio::sync::mpsc;

use crate::cli::progress;

/// Requester/chat ids used for tasks submitted from the command line.
const LOCAL_ID: i64 = 0;

pub async fn run_fetch(cfg: MediaqConfig, urls: &[String]) -> Result<()> {
    cfg.validate()?;
    let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>(64);
    let scheduler = Scheduler::from_config(&cfg, Some(progress_tx));
    let progress_handle = progress::spawn_printer(progress_rx);

    let mut pending = Vec::new();
    let mut failed = 0usize;
    for raw in urls {
        let url = match validate_link(raw, &cfg.allowed_hosts) {
            Ok(url) => url,
            Err(e) => {
                eprintln!("skipping {raw}: {e}");
                failed += 1;
                continue;
            }
        };
        let op = ExtractorCommand::from_config(&cfg, url.as_str()).into_operation();
        let (id, signal) = scheduler.submit(op, TaskKind::Link, url.to_string(), LOCAL_ID, LOCAL_ID);
        println!("queued #{id} {url}");
        pending.push(signal);
    }

    for signal in pending {
        let id = signal.task_id();
        match signal.await {
            Ok(output) => {
                println!("done   #{id}");
                for file in output.files {
                    println!("       {}", file.display());
                }
            }
            Err(e) => {
                println!("failed #{id}: {e}");
                failed += 1;
            }
        }
    }

    scheduler.shutdown().await;
    progress_handle.abort();
    if failed > 0 {
        bail!("{failed} of {} download(s) failed", urls.len());
    }
    Ok(())
}
