use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

#[derive(Clone)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
struct SendEmailBody<'a> {
    personalizations: Vec<SendgridPersonalization<'a>>,
    from: SendgridEmail<'a>,
    subject: &'a str,
    content: Vec<SendgridContent<'a>>,
}

#[derive(serde::Serialize)]
struct SendgridEmail<'a> {
    email: &'a str,
}

#[derive(serde::Serialize)]
struct SendgridPersonalization<'a> {
    to: Vec<SendgridEmail<'a>>,
}

#[derive(serde::Serialize)]
struct SendgridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> EmailClient {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .expect("Failed to build the email HTTP client");

        EmailClient {
            http_client,
            base_url,
            sender,
            api_key,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/mail/send", self.base_url);
        let body = SendEmailBody {
            from: SendgridEmail {
                email: self.sender.as_ref(),
            },
            personalizations: vec![SendgridPersonalization {
                to: vec![SendgridEmail {
                    email: recipient.as_ref(),
                }],
            }],
            subject,
            // plain text has to come before html
            content: vec![
                SendgridContent {
                    content_type: "text/plain",
                    value: text_content,
                },
                SendgridContent {
                    content_type: "text/html",
                    value: html_content,
                },
            ],
        };

        self.http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
