pub mod new_subscriber;
pub mod signup_source;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_status;
pub mod validation;

pub use new_subscriber::{NewSubscriber, NewSubscriberBody};
pub use signup_source::SignupSource;
pub use subscriber::{Subscriber, SubscriberMetadata, SubscriberStatusUpdate};
pub use subscriber_email::SubscriberEmail;
pub use subscriber_status::SubscriberStatus;
pub use validation::InvalidInput;
