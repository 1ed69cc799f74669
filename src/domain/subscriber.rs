use chrono::{DateTime, Utc};

use crate::domain::signup_source::SignupSource;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_status::SubscriberStatus;

/// Domain fields of a subscriber, kept in the content object's `metadata` map.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubscriberMetadata {
    pub email: SubscriberEmail,
    pub signup_date: DateTime<Utc>,
    pub source: SignupSource,
    pub status: SubscriberStatus,
}

/// Partial metadata sent on status changes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriberStatusUpdate {
    pub status: SubscriberStatus,
}

/// A subscriber as stored in and returned from the content store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Subscriber {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    pub metadata: SubscriberMetadata,
}

impl Subscriber {
    pub fn is_active(&self) -> bool {
        self.metadata.status.is_active()
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.metadata.status.is_unsubscribed()
    }

    /// Whether the signup happened within `window` before `now`, boundary included.
    pub fn signed_up_within(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.metadata.signup_date >= now - window
    }
}
