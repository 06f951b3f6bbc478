//! `mediaq status` – show queue status of a running instance.

use anyhow::{Context, Result};
use mediaq_core::control::{self, ControlRequest};
use mediaq_core::scheduler::QueueStatus;

use crate::cli::control_socket;

pub async fn run_status() -> Result<()> {
    let path = control::default_control_socket_path()?;
    let reply = control_socket::request(&path, ControlRequest::Status).await?;
    let status: QueueStatus =
        serde_json::from_str(&reply).with_context(|| format!("bad status reply: {reply}"))?;
    println!("{:<8} {:<8} {:<8} {}", "ACTIVE", "MAX", "WAITING", "TOTAL");
    println!(
        "{:<8} {:<8} {:<8} {}",
        status.active, status.max, status.waiting, status.total
    );
    Ok(())
}
