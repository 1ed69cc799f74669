pub mod config;
pub mod content_store;
pub mod demo;
pub mod domain;
pub mod email_client;
pub mod notifications;
pub mod routes;
pub mod startup;
pub mod subscription_service;
pub mod telemetry;
