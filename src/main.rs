mod telemetry;

use telemetry::{get_subscriber, init_subscriber};
use tracing::info;
use varsel_core::Application;
use varsel_infra::setup_context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    openssl_probe::init_ssl_cert_env_vars();

    let subscriber = get_subscriber("varsel".into(), "info".into());
    init_subscriber(subscriber);

    let context = setup_context().await;

    let app = Application::new(context);
    app.start();

    info!("Reminder pipeline is running");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
