use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Bunyan-formatted JSON logs. `RUST_LOG` overrides `env_filter`.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Must only be called once per process.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    // Redirects `log` records (actix, reqwest) into tracing
    if let Err(err) = LogTracer::init() {
        eprintln!("Failed to set logger: {}", err);
    }
    if let Err(err) = set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", err);
    }
}
