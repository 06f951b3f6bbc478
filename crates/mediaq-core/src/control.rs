//! Control protocol for a running `mediaq run` instance.
//!
//! One request per line, one reply line each:
//! - `cancel <id>` → `ok` or `not-found`
//! - `status` → queue status as JSON (`{"active":..,"max":..,"waiting":..,"total":..}`)
//!
//! Anything else gets `error <reason>`.

use std::path::PathBuf;

use crate::scheduler::{Scheduler, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Cancel(TaskId),
    Status,
}

impl ControlRequest {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("status"), None, _) => Ok(ControlRequest::Status),
            (Some("cancel"), Some(id), None) => id
                .parse()
                .map(ControlRequest::Cancel)
                .map_err(|_| format!("invalid task id: {id}")),
            (Some("cancel"), _, _) => Err("usage: cancel <id>".to_string()),
            (Some(other), _, _) => Err(format!("unknown request: {other}")),
            (None, _, _) => Err("empty request".to_string()),
        }
    }

    /// Wire form, without trailing newline.
    pub fn to_line(self) -> String {
        match self {
            ControlRequest::Cancel(id) => format!("cancel {id}"),
            ControlRequest::Status => "status".to_string(),
        }
    }
}

/// Apply one request line to `scheduler` and build the reply line.
pub fn handle_line(scheduler: &Scheduler, line: &str) -> String {
    match ControlRequest::parse(line) {
        Ok(ControlRequest::Cancel(id)) => {
            if scheduler.cancel_task(id) {
                "ok".to_string()
            } else {
                "not-found".to_string()
            }
        }
        Ok(ControlRequest::Status) => match serde_json::to_string(&scheduler.status()) {
            Ok(json) => json,
            Err(e) => format!("error {e}"),
        },
        Err(reason) => format!("error {reason}"),
    }
}

/// Default path for the control socket (XDG state dir).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("mediaq")?.get_state_home();
    Ok(dir.join("control.sock"))
}
