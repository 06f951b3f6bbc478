//! `mediaq cancel <id>` – ask a running instance to cancel a download.

use anyhow::{bail, Result};
use mediaq_core::control::{self, ControlRequest};
use mediaq_core::scheduler::TaskId;

use crate::cli::control_socket;

pub async fn run_cancel(id: TaskId) -> Result<()> {
    let path = control::default_control_socket_path()?;
    let reply = control_socket::request(&path, ControlRequest::Cancel(id)).await?;
    match reply.as_str() {
        "ok" => println!("Cancelling task {id}"),
        "not-found" => bail!("task {id} is not running"),
        other => bail!("unexpected reply: {other}"),
    }
    Ok(())
}
