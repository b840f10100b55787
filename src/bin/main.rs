use linkshort_lib::configuration::get_configuration;
use linkshort_lib::startup::Application;
use linkshort_lib::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("linkshort".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration files.");
    tracing::info!(%configuration, "starting up");

    let application = Application::build(configuration).await?;
    application.run_until_stopped().await?;

    Ok(())
}
