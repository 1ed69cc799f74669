use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::domain::{NewSubscriber, NewSubscriberBody, Subscriber, SubscriberStatus};
use crate::routes::error::ApiError;
use crate::subscription_service::SubscriptionService;

pub const SUBSCRIBED_MESSAGE: &str = "Successfully subscribed to the newsletter!";

#[derive(serde::Serialize)]
struct SubscribersResponse {
    subscribers: Vec<Subscriber>,
}

#[derive(serde::Serialize)]
struct SubscribedResponse {
    success: bool,
    message: &'static str,
    subscriber: Subscriber,
}

#[derive(serde::Serialize)]
struct UpdatedResponse {
    success: bool,
    subscriber: Subscriber,
}

#[derive(serde::Serialize)]
struct DeletedResponse {
    success: bool,
}

#[derive(Deserialize, Debug)]
pub struct StatusUpdateBody {
    pub status: Option<String>,
}

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, service),
    fields(
        subscriber_email = ?body.email,
        source = ?body.source
    )
)]
pub async fn handle_create_subscriber(
    body: web::Json<NewSubscriberBody>,
    service: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    let new_subscriber: NewSubscriber = body.into_inner().try_into()?;
    let subscriber = service.subscribe(new_subscriber).await?;

    Ok(HttpResponse::Created().json(SubscribedResponse {
        success: true,
        message: SUBSCRIBED_MESSAGE,
        subscriber,
    }))
}

#[tracing::instrument(name = "Listing subscribers handler", skip(service))]
pub async fn handle_list_subscribers(
    service: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    let subscribers = service.get_all().await?;

    Ok(HttpResponse::Ok().json(SubscribersResponse { subscribers }))
}

#[tracing::instrument(name = "Subscriber statistics handler", skip(service))]
pub async fn handle_subscriber_stats(
    service: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    let stats = service.get_stats().await?;

    Ok(HttpResponse::Ok().json(stats))
}

#[tracing::instrument(
    name = "Updating a subscriber status handler",
    skip(id, body, service),
    fields(subscriber_id = %id, status = ?body.status)
)]
pub async fn handle_update_subscriber(
    id: web::Path<String>,
    body: web::Json<StatusUpdateBody>,
    service: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    let status = match body.status.as_deref() {
        Some(status) => SubscriberStatus::parse(status)?,
        None => return Err(crate::domain::InvalidInput::new("Status is required").into()),
    };
    let subscriber = service.update_status(&id, status).await?;

    Ok(HttpResponse::Ok().json(UpdatedResponse {
        success: true,
        subscriber,
    }))
}

#[tracing::instrument(
    name = "Deleting a subscriber handler",
    skip(id, service),
    fields(subscriber_id = %id)
)]
pub async fn handle_delete_subscriber(
    id: web::Path<String>,
    service: web::Data<SubscriptionService>,
) -> Result<HttpResponse, ApiError> {
    service.delete(&id).await?;

    Ok(HttpResponse::Ok().json(DeletedResponse { success: true }))
}
