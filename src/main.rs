use mindful_newsletter::config::get_configuration;
use mindful_newsletter::startup::Application;
use mindful_newsletter::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(
        String::from("mindful_newsletter"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber);

    let config = get_configuration()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    let application = Application::build(config).await?;

    application.run_until_stop().await
}
