//! Control socket: server (during `mediaq run`) and client (`mediaq cancel`, `mediaq status`).
//! Protocol: see `mediaq_core::control`.

use anyhow::{Context, Result};
use mediaq_core::control::{self, ControlRequest};
use mediaq_core::scheduler::Scheduler;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Spawns a task that listens on `path` and answers each request line with
/// one reply line. The socket file is replaced if it already exists.
pub fn spawn_control_listener(
    scheduler: Scheduler,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create control socket dir: {}", dir.display()))?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("bind control socket: {}", path.display()))?;

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let scheduler = scheduler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(&scheduler, stream).await {
                            tracing::debug!("control connection: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve_connection(scheduler: &Scheduler, stream: UnixStream) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = control::handle_line(scheduler, &line);
        tracing::debug!(request = %line.trim(), reply = %reply, "control request");
        write.write_all(reply.as_bytes()).await?;
        write.write_all(b"\n").await?;
    }
    Ok(())
}

/// Sends one request and returns the reply line.
pub async fn request(socket_path: &Path, req: ControlRequest) -> Result<String> {
    let stream = UnixStream::connect(socket_path).await.with_context(|| {
        format!(
            "connect to {} (is `mediaq run` active?)",
            socket_path.display()
        )
    })?;
    let (read, mut write) = stream.into_split();
    write
        .write_all(format!("{}\n", req.to_line()).as_bytes())
        .await?;
    let mut lines = BufReader::new(read).lines();
    let reply = lines
        .next_line()
        .await?
        .context("control socket closed without reply")?;
    Ok(reply)
}
