//! Chat front end: turns incoming messages into scheduler submissions and
//! reports outcomes through a [`Notifier`].
//!
//! The chat protocol client itself is not part of this crate; it delivers
//! [`Incoming`] messages and implements [`Notifier`].

mod command;
mod dispatcher;

use anyhow::Result;
use async_trait::async_trait;

pub use command::Command;
pub use dispatcher::Dispatcher;

use crate::inline_media::InlineMedia;
use crate::scheduler::{ChatId, UserId};

/// Outbound message sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat: ChatId, text: &str) -> Result<()>;
}

/// A message received from a chat user.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub requester: UserId,
    pub chat: ChatId,
    pub body: Body,
}

#[derive(Debug, Clone)]
pub enum Body {
    Text(String),
    Media(InlineMedia),
}
