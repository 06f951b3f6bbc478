use crate::scheduler::TaskId;

/// A parsed chat text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Status,
    /// `/cancel <id>`; `None` when the id is missing or not a number.
    Cancel(Option<TaskId>),
    /// Anything that is not a command; validated as a link by the dispatcher.
    Link(String),
    /// A `/command` the bot does not know.
    Unknown(String),
}

impl Command {
    /// Commands may carry a `@botname` suffix (`/status@mediaq_bot`).
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let Some(rest) = text.strip_prefix('/') else {
            return Command::Link(text.to_string());
        };
        let mut parts = rest.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let name = head.split('@').next().unwrap_or_default().to_ascii_lowercase();
        match name.as_str() {
            "start" | "help" => Command::Start,
            "status" => Command::Status,
            "cancel" => Command::Cancel(parts.next().and_then(|id| id.parse().ok())),
            _ => Command::Unknown(name),
        }
    }
}
