use actix_web::dev::Server;
use actix_web::error::JsonPayloadError;
use actix_web::{web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_actix_web::TracingLogger;

use crate::config::Settings;
use crate::content_store::ContentStore;
use crate::domain::InvalidInput;
use crate::email_client::EmailClient;
use crate::notifications::{NotificationOutbox, OutboxStats};
use crate::routes::{
    handle_create_subscriber, handle_delete_subscriber, handle_list_subscribers,
    handle_subscriber_stats, handle_update_subscriber, health_check, ApiError,
};
use crate::subscription_service::SubscriptionService;

pub struct Application {
    port: u16,
    server: Server,
    outbox: NotificationOutbox,
    outbox_worker: JoinHandle<()>,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let sender_email = config
            .get_email_client_sender()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            sender_email,
            config.email_client.api_key.clone(),
            Some(config.email_client.get_timeout()),
        );
        let (outbox, worker) =
            NotificationOutbox::new(&config.notifications, email_client, config.get_app_base_url());

        // A misconfigured store keeps the site up; subscription endpoints answer 500.
        let store = ContentStore::from_settings(&config.content_store);
        if let Err(err) = &store {
            tracing::error!("Content store is not usable: {}", err);
        }
        let service = SubscriptionService::new(store, outbox.clone());

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, service)?;
        let outbox_worker = worker.spawn();

        tracing::info!("Server listening on {}", config.get_address());

        Ok(Self {
            port,
            server,
            outbox,
            outbox_worker,
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn outbox_stats(&self) -> Arc<OutboxStats> {
        self.outbox.stats()
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        let result = self.server.await;
        // Counted before the abort, which drops the receiver and empties the queue.
        self.outbox.discard_pending();
        self.outbox_worker.abort();
        result
    }
}

pub fn run(listener: TcpListener, service: SubscriptionService) -> Result<Server, std::io::Error> {
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/subscribers")
                    .route("", web::get().to(handle_list_subscribers))
                    .route("", web::post().to(handle_create_subscriber))
                    .route("/stats", web::get().to(handle_subscriber_stats))
                    .route("/{id}", web::patch().to(handle_update_subscriber))
                    .route("/{id}", web::delete().to(handle_delete_subscriber)),
            )
            .app_data(service.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

fn json_error_handler(err: JsonPayloadError, _request: &HttpRequest) -> actix_web::Error {
    tracing::warn!("Rejected request body: {}", err);

    ApiError::InvalidInput(InvalidInput::new("Invalid request body")).into()
}
