//! Terminal rendering of forwarded progress events.

use mediaq_core::scheduler::{ProgressEvent, ProgressStats};
use tokio::sync::mpsc;

const MIB: f64 = 1_048_576.0;

/// Prints every event received until the channel closes.
pub fn spawn_printer(mut rx: mpsc::Receiver<ProgressEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("  #{} {}", event.task_id, format_stats(&event.stats));
        }
    })
}

pub fn format_stats(stats: &ProgressStats) -> String {
    let done = stats.bytes_done as f64 / MIB;
    let rate = stats.bytes_per_sec() / MIB;
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    match (stats.total_bytes, stats.fraction()) {
        (Some(total), Some(fraction)) => format!(
            "{:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}",
            done,
            total as f64 / MIB,
            fraction * 100.0,
            rate,
            eta
        ),
        _ => format!("{:.1} MiB  {:.2} MiB/s", done, rate),
    }
}
