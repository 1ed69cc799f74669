use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::content_store::{
    ConfigurationError, ContentObject, ContentStore, FindOptions, NewContentObject, StoreError,
};
use crate::domain::{
    NewSubscriber, Subscriber, SubscriberMetadata, SubscriberStatus, SubscriberStatusUpdate,
};
use crate::notifications::{NotificationOutbox, WelcomeEmail};

const EMAIL_FIELD: &str = "metadata.email";
const SLUG_SUFFIX_LENGTH: usize = 9;
const RECENT_SIGNUP_DAYS: i64 = 7;

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error("Email address is already subscribed")]
    DuplicateSubscriber,
    #[error("Newsletter storage is not configured")]
    Configuration(#[source] ConfigurationError),
    #[error("Content store request failed")]
    Store(#[from] StoreError),
}

impl std::fmt::Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberStats {
    pub total: usize,
    pub active: usize,
    pub unsubscribed: usize,
    pub recent_signups: usize,
}

impl SubscriberStats {
    pub fn from_subscribers(subscribers: &[Subscriber], now: DateTime<Utc>) -> SubscriberStats {
        let window = chrono::Duration::days(RECENT_SIGNUP_DAYS);

        SubscriberStats {
            total: subscribers.len(),
            active: subscribers.iter().filter(|s| s.is_active()).count(),
            unsubscribed: subscribers.iter().filter(|s| s.is_unsubscribed()).count(),
            recent_signups: subscribers
                .iter()
                .filter(|s| s.signed_up_within(now, window))
                .count(),
        }
    }
}

/// Newsletter subscription workflow on top of the content store.
///
/// The duplicate check and the insert are two separate store calls. The store offers no
/// unique constraint, so two concurrent signups for the same address can both pass the
/// check; the uniqueness of subscribers per email is best-effort.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Result<ContentStore, ConfigurationError>,
    outbox: NotificationOutbox,
}

impl SubscriptionService {
    pub fn new(
        store: Result<ContentStore, ConfigurationError>,
        outbox: NotificationOutbox,
    ) -> Self {
        Self { store, outbox }
    }

    fn store(&self) -> Result<&ContentStore, SubscriptionError> {
        self.store
            .as_ref()
            .map_err(|err| SubscriptionError::Configuration(err.clone()))
    }

    #[tracing::instrument(
        name = "Subscribe to the newsletter",
        skip(self, new_subscriber),
        fields(
            subscriber_email = %new_subscriber.email,
            source = %new_subscriber.source.as_ref()
        )
    )]
    pub async fn subscribe(
        &self,
        new_subscriber: NewSubscriber,
    ) -> Result<Subscriber, SubscriptionError> {
        let store = self.store()?;
        let email = new_subscriber.email;

        // Untyped so a legacy record with odd metadata still counts as a duplicate.
        let existing: Option<ContentObject<serde_json::Value>> = store
            .find_one_by_field(EMAIL_FIELD, email.as_ref())
            .await?;
        if existing.is_some() {
            return Err(SubscriptionError::DuplicateSubscriber);
        }

        let record = NewContentObject {
            title: email.as_ref().to_string(),
            slug: generate_slug(),
            metadata: SubscriberMetadata {
                email: email.clone(),
                signup_date: Utc::now(),
                source: new_subscriber.source,
                status: SubscriberStatus::Active,
            },
        };
        let created: ContentObject<SubscriberMetadata> = store.insert_record(&record).await?;

        self.outbox.enqueue(WelcomeEmail { recipient: email });

        Ok(created.into())
    }

    /// Every readable subscriber, newest first. A missing collection is an empty list.
    /// Records whose metadata does not decode are logged and left out.
    #[tracing::instrument(name = "List newsletter subscribers", skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Subscriber>, SubscriptionError> {
        let objects: Vec<ContentObject<serde_json::Value>> = self
            .store()?
            .find_by_type(
                serde_json::Map::new(),
                FindOptions {
                    limit: None,
                    sort: Some("-created_at".to_string()),
                },
            )
            .await?;

        Ok(objects.into_iter().filter_map(decode_subscriber).collect())
    }

    #[tracing::instrument(name = "Compute newsletter statistics", skip(self))]
    pub async fn get_stats(&self) -> Result<SubscriberStats, SubscriptionError> {
        let subscribers = self.get_all().await?;

        Ok(SubscriberStats::from_subscribers(&subscribers, Utc::now()))
    }

    #[tracing::instrument(name = "Update a subscriber status", skip(self))]
    pub async fn update_status(
        &self,
        id: &str,
        status: SubscriberStatus,
    ) -> Result<Subscriber, SubscriptionError> {
        let updated: ContentObject<SubscriberMetadata> = self
            .store()?
            .update_record(id, &SubscriberStatusUpdate { status })
            .await?;

        Ok(updated.into())
    }

    #[tracing::instrument(name = "Delete a subscriber", skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), SubscriptionError> {
        self.store()?.delete_record(id).await?;

        Ok(())
    }
}

impl From<ContentObject<SubscriberMetadata>> for Subscriber {
    fn from(object: ContentObject<SubscriberMetadata>) -> Self {
        Subscriber {
            id: object.id,
            title: object.title,
            slug: object.slug,
            created_at: object.created_at.as_deref().and_then(parse_timestamp),
            modified_at: object.modified_at.as_deref().and_then(parse_timestamp),
            metadata: object.metadata,
        }
    }
}

fn decode_subscriber(object: ContentObject<serde_json::Value>) -> Option<Subscriber> {
    let ContentObject {
        id,
        title,
        slug,
        object_type,
        created_at,
        modified_at,
        metadata,
    } = object;

    match serde_json::from_value::<SubscriberMetadata>(metadata) {
        Ok(metadata) => Some(Subscriber::from(ContentObject {
            id,
            title,
            slug,
            object_type,
            created_at,
            modified_at,
            metadata,
        })),
        Err(err) => {
            tracing::warn!(object_id = %id, "Skipping unreadable subscriber record: {}", err);
            None
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

/// Time-ordered and random, never derived from the email.
fn generate_slug() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(SLUG_SUFFIX_LENGTH)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();

    format!("subscriber-{}-{}", Utc::now().timestamp_millis(), suffix)
}
