use validator::validate_email as is_rfc_email;

use crate::domain::new_subscriber::NewSubscriber;
use crate::domain::signup_source::SignupSource;
use crate::domain::subscriber_email::SubscriberEmail;

pub const MAX_EMAIL_LENGTH: usize = 254;

/// Client-correctable input problem. The message is safe to return to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidInput(pub String);

impl InvalidInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub fn validate_email(input: Option<&str>) -> Result<(), InvalidInput> {
    let email = match input {
        Some(email) => email.trim(),
        None => return Err(InvalidInput::new("Email is required")),
    };

    if email.is_empty() {
        return Err(InvalidInput::new("Email cannot be empty"));
    }

    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(InvalidInput::new("Email address is too long"));
    }

    if !matches_basic_pattern(email) || !is_rfc_email(email) {
        return Err(InvalidInput::new("Please enter a valid email address"));
    }

    Ok(())
}

pub fn validate_source(input: &str) -> Result<SignupSource, InvalidInput> {
    SignupSource::parse(input)
}

/// Trims and lowercases. Missing input becomes an empty string.
pub fn sanitize_email(input: Option<&str>) -> String {
    input
        .map(|email| email.trim().to_lowercase())
        .unwrap_or_default()
}

/// Email is mandatory, source is only checked when one was actually sent.
pub fn validate_newsletter_signup(
    email: Option<&str>,
    source: Option<&str>,
) -> Result<NewSubscriber, InvalidInput> {
    validate_email(email)?;

    let source = match source {
        Some(source) if !source.is_empty() => validate_source(source)?,
        _ => SignupSource::default(),
    };

    Ok(NewSubscriber {
        email: SubscriberEmail::from_validated(sanitize_email(email)),
        source,
    })
}

// local@domain.tld with no whitespace and a single '@'.
fn matches_basic_pattern(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };

    if local.is_empty() {
        return false;
    }

    domain
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .any(|(index, _)| index > 0 && index < domain.len() - 1)
}
