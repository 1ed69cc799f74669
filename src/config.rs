use config::{Config, ConfigError, File};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::validation::InvalidInput;

pub const DEFAULT_OBJECT_TYPE: &str = "subscribers";

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub content_store: ContentStoreSettings,
    pub email_client: EmailClientSettings,
    pub notifications: NotificationSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub base_url: String,
}

/// Connection parameters of the headless CMS bucket. The credentials stay optional here so a
/// missing one surfaces as a typed configuration error when the store handle is built.
#[derive(serde::Deserialize, Clone)]
pub struct ContentStoreSettings {
    pub base_url: String,
    #[serde(default)]
    pub bucket_slug: Option<String>,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    #[serde(default)]
    pub read_key: Option<Secret<String>>,
    #[serde(default)]
    pub write_key: Option<Secret<String>>,
    #[serde(default = "default_object_type")]
    pub object_type: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub api_key: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct NotificationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub queue_capacity: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub retry_backoff_milliseconds: u64,
}

fn default_object_type() -> String {
    DEFAULT_OBJECT_TYPE.to_string()
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_app_base_url(&self) -> String {
        self.application.get_base_url()
    }

    pub fn get_email_client_sender(&self) -> Result<SubscriberEmail, InvalidInput> {
        self.email_client.get_sender_email()
    }

    pub fn set_email_client_base_url(&mut self, new_base_url: String) {
        self.email_client.base_url = new_base_url
    }

    pub fn set_content_store_base_url(&mut self, new_base_url: String) {
        self.content_store.base_url = new_base_url
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }

    pub fn get_base_url(&self) -> String {
        self.base_url.clone()
    }
}

impl ContentStoreSettings {
    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl EmailClientSettings {
    pub fn get_sender_email(&self) -> Result<SubscriberEmail, InvalidInput> {
        SubscriberEmail::parse(self.sender_email.clone())
    }

    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }
}

impl NotificationSettings {
    pub fn get_retry_backoff(&self) -> time::Duration {
        time::Duration::from_millis(self.retry_backoff_milliseconds)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir()
        .map_err(|err| ConfigError::Message(format!("Failed to determine current dir: {}", err)))?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(environment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_CONTENT_STORE__WRITE_KEY would set Settings.content_store.write_key
        .add_source(
            config::Environment::with_prefix("app")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    tracing::info!("Application environment = {:?}", environment);

    settings.try_deserialize()
}
