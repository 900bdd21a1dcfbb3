mod config;
mod repos;
mod services;
mod system;

pub use config::{Config, EmailProviderConfig};
pub use repos::{IBookingRepo, IDeviceTokenRepo, IReminderJobRepo, Repos};
pub use services::*;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::ISys;
use system::RealSys;

#[derive(Clone)]
pub struct VarselContext {
    pub repos: Repos,
    /// The delivery channels a due reminder fans out to
    pub notifier: Notifier,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl VarselContext {
    async fn create(params: ContextParams) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        let repos = Repos::create_postgres(pool);
        let config = Config::new();
        let notifier = create_notifier(&config, &repos);
        Self {
            repos,
            notifier,
            config,
            sys: Arc::new(RealSys {}),
        }
    }

    /// Context backed by inmemory repositories and no delivery
    /// channels. Tests attach their own channels to `notifier`.
    pub fn create_inmemory() -> Self {
        let repos = Repos::create_inmemory();
        let config = Config::new();
        let notifier = Notifier::new(Vec::new());
        Self {
            repos,
            notifier,
            config,
            sys: Arc::new(RealSys {}),
        }
    }
}

fn create_notifier(config: &Config, repos: &Repos) -> Notifier {
    Notifier::new(vec![
        Arc::new(PushChannel::new(
            config.fcm_server_key.clone(),
            repos.device_tokens.clone(),
        )),
        Arc::new(EmailChannel::new(config.email_provider.clone())),
    ])
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> VarselContext {
    VarselContext::create(ContextParams {
        postgres_connection_string: get_psql_connection_string(),
    })
    .await
}

fn get_psql_connection_string() -> String {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .unwrap_or_else(|_| panic!("{} env var to be present.", PSQL_CONNECTION_STRING))
}

pub async fn run_migration() -> Result<(), MigrateError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&get_psql_connection_string())
        .await
        .expect("TO CONNECT TO POSTGRES");

    sqlx::migrate!().run(&pool).await
}
