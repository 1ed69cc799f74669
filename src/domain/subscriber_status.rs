use crate::domain::validation::InvalidInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SubscriberStatus {
    Active,
    Unsubscribed,
    Pending,
}

impl SubscriberStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriberStatus::Active)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SubscriberStatus::Pending)
    }

    pub fn is_unsubscribed(&self) -> bool {
        matches!(self, SubscriberStatus::Unsubscribed)
    }

    pub fn parse(status: &str) -> Result<SubscriberStatus, InvalidInput> {
        match status {
            "active" => Ok(SubscriberStatus::Active),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            "pending" => Ok(SubscriberStatus::Pending),
            _ => Err(InvalidInput::new(format!(
                "{} is not a valid subscriber status",
                status
            ))),
        }
    }
}

impl AsRef<str> for SubscriberStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriberStatus::Active => "active",
            SubscriberStatus::Unsubscribed => "unsubscribed",
            SubscriberStatus::Pending => "pending",
        }
    }
}

impl TryFrom<String> for SubscriberStatus {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SubscriberStatus::parse(&value)
    }
}

impl From<SubscriberStatus> for String {
    fn from(status: SubscriberStatus) -> Self {
        status.as_ref().to_string()
    }
}
