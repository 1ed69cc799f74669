//! Welcome email outbox.
//!
//! Subscriptions only enqueue; a background worker owns delivery, retries and the outcome
//! counters. Nothing here can fail or delay the request that produced the message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::NotificationSettings;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::EmailClient;

pub const WELCOME_SUBJECT: &str = "Welcome to our newsletter!";

#[derive(Debug, Clone)]
pub struct WelcomeEmail {
    pub recipient: SubscriberEmail,
}

impl WelcomeEmail {
    pub fn html_body(&self, base_url: &str) -> String {
        format!(
            r#"
            <div>
                <h1>Welcome to our newsletter!</h1>
                <p>Thank you for subscribing. You will receive new articles, guides and
                resources for your mental well-being.</p>
                <p>Start exploring our <a href="{base_url}/resources">free resources</a> today.</p>
            </div>
            "#,
        )
    }

    pub fn text_body(&self, base_url: &str) -> String {
        format!(
            "Welcome to our newsletter!\n\
             Thank you for subscribing. You will receive new articles, guides and resources \
             for your mental well-being.\n\
             Start exploring our free resources: {base_url}/resources"
        )
    }
}

/// Delivery counters, readable while the worker runs.
#[derive(Debug, Default)]
pub struct OutboxStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl OutboxStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Sending half of the outbox, cloned into every service that produces notifications.
#[derive(Clone)]
pub struct NotificationOutbox {
    sender: mpsc::Sender<WelcomeEmail>,
    stats: Arc<OutboxStats>,
}

pub struct OutboxWorker {
    receiver: mpsc::Receiver<WelcomeEmail>,
    email_client: EmailClient,
    base_url: String,
    max_retries: u32,
    retry_backoff: time::Duration,
    stats: Arc<OutboxStats>,
}

impl NotificationOutbox {
    pub fn new(
        settings: &NotificationSettings,
        email_client: EmailClient,
        base_url: String,
    ) -> (NotificationOutbox, OutboxWorker) {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        let stats = Arc::new(OutboxStats::default());

        let outbox = NotificationOutbox {
            sender,
            stats: stats.clone(),
        };
        let worker = OutboxWorker {
            receiver,
            email_client,
            base_url,
            max_retries: settings.max_retries,
            retry_backoff: settings.get_retry_backoff(),
            stats,
        };

        (outbox, worker)
    }

    /// Never blocks. A full or closed queue drops the message and records it.
    #[tracing::instrument(
        name = "Enqueue a welcome email",
        skip(self, email),
        fields(recipient = %email.recipient)
    )]
    pub fn enqueue(&self, email: WelcomeEmail) {
        if let Err(err) = self.sender.try_send(email) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Welcome email was not queued: {}", err);
        }
    }

    pub fn stats(&self) -> Arc<OutboxStats> {
        self.stats.clone()
    }

    /// Emails still waiting in the queue.
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Records every queued email as dropped. Called right before the worker is stopped.
    pub fn discard_pending(&self) -> usize {
        let pending = self.pending();
        if pending > 0 {
            self.stats
                .dropped
                .fetch_add(pending as u64, Ordering::Relaxed);
            tracing::warn!(pending, "Welcome emails left undelivered at shutdown");
        }

        pending
    }
}

impl OutboxWorker {
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drains the queue until every sender is gone.
    pub async fn run(mut self) {
        while let Some(email) = self.receiver.recv().await {
            match self.deliver(&email).await {
                Ok(()) => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        "Giving up on welcome email to {}: {:?}",
                        email.recipient,
                        err
                    );
                }
            }
        }
    }

    #[tracing::instrument(
        name = "Deliver a welcome email",
        skip(self, email),
        fields(recipient = %email.recipient)
    )]
    async fn deliver(&self, email: &WelcomeEmail) -> Result<(), reqwest::Error> {
        let html_body = email.html_body(&self.base_url);
        let text_body = email.text_body(&self.base_url);
        let mut attempt = 0;

        loop {
            let result = self
                .email_client
                .send_email(&email.recipient, WELCOME_SUBJECT, &html_body, &text_body)
                .await;

            match result {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, "Welcome email delivery failed, retrying: {}", err);
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
