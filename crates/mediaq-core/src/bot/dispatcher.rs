//! Routes chat messages to the scheduler and reports outcomes back.

use anyhow::Result;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::config::MediaqConfig;
use crate::error::TaskError;
use crate::extractor::ExtractorCommand;
use crate::scheduler::{
    ChatId, CompletionSignal, DownloadOutput, Scheduler, TaskContext, TaskId, TaskKind,
    TaskOutcome, UserId,
};
use crate::url_model::validate_link;

use super::{Body, Command, Incoming, Notifier};

pub struct Dispatcher {
    scheduler: Scheduler,
    cfg: Arc<MediaqConfig>,
    notifier: Arc<dyn Notifier>,
    watchers: TaskTracker,
}

impl Dispatcher {
    pub fn new(scheduler: Scheduler, cfg: Arc<MediaqConfig>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            scheduler,
            cfg,
            notifier,
            watchers: TaskTracker::new(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Handle one incoming message. Returns the id of the task it queued, if any.
    ///
    /// Errors only when the reply itself cannot be delivered; download
    /// outcomes are reported asynchronously by a watcher task.
    pub async fn handle(&self, incoming: Incoming) -> Result<Option<TaskId>> {
        let chat = incoming.chat;
        match incoming.body {
            Body::Media(media) => {
                let identifier = media.unique_id.clone();
                let op = media.into_operation(
                    self.cfg.download_dir.clone(),
                    self.cfg.inline_media_max_size,
                );
                self.enqueue(op, TaskKind::InlineMedia, identifier, incoming.requester, chat)
                    .await
                    .map(Some)
            }
            Body::Text(text) => match Command::parse(&text) {
                Command::Start => {
                    self.reply(chat, &self.cfg.messages.start).await?;
                    Ok(None)
                }
                Command::Status => {
                    self.reply(chat, &self.status_text()).await?;
                    Ok(None)
                }
                Command::Cancel(Some(id)) => {
                    let text = if self.scheduler.cancel_task(id) {
                        format!("Cancelling task {id}")
                    } else {
                        format!("Task {id} is not running")
                    };
                    self.reply(chat, &text).await?;
                    Ok(None)
                }
                Command::Cancel(None) => {
                    self.reply(chat, "Usage: /cancel <task id>").await?;
                    Ok(None)
                }
                Command::Unknown(name) => {
                    tracing::debug!(command = %name, "unknown command");
                    self.reply(chat, &self.cfg.messages.start).await?;
                    Ok(None)
                }
                Command::Link(link) => match validate_link(&link, &self.cfg.allowed_hosts) {
                    Ok(url) => {
                        let op = ExtractorCommand::from_config(&self.cfg, url.as_str())
                            .into_operation();
                        self.enqueue(op, TaskKind::Link, url.to_string(), incoming.requester, chat)
                            .await
                            .map(Some)
                    }
                    Err(e) => {
                        tracing::debug!(requester = incoming.requester, "rejected link: {}", e);
                        self.reply(chat, &self.cfg.messages.invalid_link).await?;
                        Ok(None)
                    }
                },
            },
        }
    }

    async fn enqueue<F>(
        &self,
        op: F,
        kind: TaskKind,
        identifier: String,
        requester: UserId,
        chat: ChatId,
    ) -> Result<TaskId>
    where
        F: FnOnce(&mut TaskContext) -> Result<DownloadOutput> + Send + 'static,
    {
        let (id, signal) = self.scheduler.submit(op, kind, identifier, requester, chat);
        let status = self.scheduler.status();
        let lead = if status.total <= status.max {
            &self.cfg.messages.processing
        } else {
            &self.cfg.messages.queued
        };
        let text = format!("{lead} (task {id}, {status})");
        // Queued notice goes out before the watcher can report completion.
        let sent = self.reply(chat, &text).await;
        self.spawn_watcher(chat, signal);
        sent?;
        Ok(id)
    }

    /// Wait until every queued download has finished and its outcome was
    /// delivered.
    pub async fn drain(&self) {
        self.scheduler.wait_idle().await;
        self.watchers.close();
        self.watchers.wait().await;
        self.watchers.reopen();
    }

    /// Queue summary plus one line per running task.
    pub fn status_text(&self) -> String {
        let mut out = format!("Queue: {}", self.scheduler.status());
        for task in self.scheduler.active_tasks() {
            let progress = task
                .last_progress()
                .and_then(|p| p.fraction())
                .map(|f| format!("{:.0}%", f * 100.0))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "\n#{} {} {} {}",
                task.id(),
                task.kind(),
                progress,
                task.identifier()
            ));
        }
        out
    }

    fn spawn_watcher(&self, chat: ChatId, signal: CompletionSignal) {
        let notifier = Arc::clone(&self.notifier);
        let cfg = Arc::clone(&self.cfg);
        self.watchers.spawn(async move {
            let id = signal.task_id();
            let outcome = signal.await;
            let text = outcome_text(&cfg, &outcome);
            if let Err(e) = &outcome {
                tracing::debug!(task_id = id, "notifying requester: {}", e);
            }
            if let Err(e) = notifier.send(chat, &text).await {
                tracing::warn!(task_id = id, chat, "completion notice not delivered: {:#}", e);
            }
        });
    }

    async fn reply(&self, chat: ChatId, text: &str) -> Result<()> {
        self.notifier.send(chat, text).await
    }
}

fn outcome_text(cfg: &MediaqConfig, outcome: &TaskOutcome) -> String {
    match outcome {
        Ok(output) if output.files.is_empty() => cfg.messages.success.clone(),
        Ok(output) => {
            let names: Vec<String> = output
                .files
                .iter()
                .map(|p| {
                    p.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| p.display().to_string())
                })
                .collect();
            format!("{}: {}", cfg.messages.success, names.join(", "))
        }
        Err(TaskError::Cancelled) => cfg.messages.cancelled.clone(),
        Err(_) => cfg.messages.error.clone(),
    }
}
