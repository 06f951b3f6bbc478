//! Stdin/stdout stand-in for a chat client.
//!
//! Input lines: `[<user> <chat>] <text>` or `[<user> <chat>] media <path> [unique_id]`;
//! the bracketed prefix is optional (user and chat default to 0).

use anyhow::{bail, Result};
use async_trait::async_trait;
use mediaq_core::bot::{Body, Incoming, Notifier};
use mediaq_core::inline_media::InlineMedia;
use mediaq_core::scheduler::{ChatId, UserId};
use std::path::Path;

/// Prints outgoing messages as `[chat <id>] <text>`.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, chat: ChatId, text: &str) -> Result<()> {
        println!("[chat {chat}] {text}");
        Ok(())
    }
}

/// Parse one input line; `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<Incoming>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (requester, chat, rest) = split_sender(line)?;

    let body = match rest.strip_prefix("media ") {
        Some(args) => {
            let mut parts = args.split_whitespace();
            let Some(path) = parts.next() else {
                bail!("usage: media <path> [unique_id]");
            };
            let unique_id = parts.next();
            Body::Media(InlineMedia::from_path(Path::new(path), unique_id)?)
        }
        None => Body::Text(rest.to_string()),
    };
    Ok(Some(Incoming {
        requester,
        chat,
        body,
    }))
}

fn split_sender(line: &str) -> Result<(UserId, ChatId, &str)> {
    let Some(inner) = line.strip_prefix('[') else {
        return Ok((0, 0, line));
    };
    let Some((ids, rest)) = inner.split_once(']') else {
        bail!("unterminated sender prefix: {line}");
    };
    let mut parts = ids.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(chat), None) => Ok((user.parse()?, chat.parse()?, rest.trim())),
        _ => bail!("sender prefix must be `[<user> <chat>]`: {line}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_uses_default_sender() {
        let msg = parse_line("https://youtu.be/x").unwrap().unwrap();
        assert_eq!((msg.requester, msg.chat), (0, 0));
        assert!(matches!(msg.body, Body::Text(ref t) if t == "https://youtu.be/x"));
    }

    #[test]
    fn sender_prefix() {
        let msg = parse_line("[42 -100] /status").unwrap().unwrap();
        assert_eq!((msg.requester, msg.chat), (42, -100));
        assert!(matches!(msg.body, Body::Text(ref t) if t == "/status"));
    }

    #[test]
    fn media_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.webm");
        std::fs::write(&path, b"abc").unwrap();
        let msg = parse_line(&format!("[1 2] media {} AgAD", path.display()))
            .unwrap()
            .unwrap();
        match msg.body {
            Body::Media(m) => {
                assert_eq!(m.unique_id, "AgAD");
                assert_eq!(m.extension, "webm");
                assert_eq!(m.file_size, 3);
            }
            other => panic!("expected media, got {other:?}"),
        }
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("[1 2 hello").is_err());
        assert!(parse_line("[x 2] hello").is_err());
        assert!(parse_line("media").is_ok());
        assert!(parse_line("media /definitely/not/here.mp4").is_err());
    }
}
