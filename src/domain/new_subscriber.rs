use serde::Deserialize;

use crate::domain::signup_source::SignupSource;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::validation::{validate_newsletter_signup, InvalidInput};

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub source: SignupSource,
}

#[derive(Deserialize, Debug)]
pub struct NewSubscriberBody {
    pub email: Option<String>,
    pub source: Option<String>,
}

impl TryFrom<NewSubscriberBody> for NewSubscriber {
    type Error = InvalidInput;

    fn try_from(body: NewSubscriberBody) -> Result<Self, Self::Error> {
        validate_newsletter_signup(body.email.as_deref(), body.source.as_deref())
    }
}
