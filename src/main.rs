//! RustPress Users server
//!
//! - `serve` (default): run the account API over PostgreSQL
//! - `create-superuser`: create an active staff account

use clap::{Arg, ArgMatches, Command};
use chrono::NaiveDate;
use rustpress_users::{
    create_routes,
    store::{postgres::run_migrations, PgRevocationStore, PgUserStore},
    AuthConfig, Gender, ServerConfig, SessionService,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{error::Error, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn Error + Send + Sync>;

fn command() -> Command {
    Command::new("rustpress-users")
        .about("RustPress user accounts service")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(Command::new("serve").about("Run the account HTTP API"))
        .subcommand(
            Command::new("create-superuser")
                .about("Create an active staff account")
                .arg(
                    Arg::new("email")
                        .long("email")
                        .env("SUPERUSER_EMAIL")
                        .required(true),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .env("SUPERUSER_NAME")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .env("SUPERUSER_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new("gender")
                        .long("gender")
                        .env("SUPERUSER_GENDER")
                        .default_value("M")
                        .value_parser(|s: &str| s.parse::<Gender>()),
                )
                .arg(
                    Arg::new("birth-date")
                        .long("birth-date")
                        .help("YYYY-MM-DD")
                        .env("SUPERUSER_BIRTH_DATE")
                        .required(true)
                        .value_parser(|s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d")),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rustpress_users=info,tower_http=info")),
        )
        .init();

    let matches = command().get_matches();
    let server = ServerConfig::from_env()?;
    let auth = AuthConfig::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&server.database_url)
        .await?;
    run_migrations(&db).await?;

    let service = Arc::new(build_service(auth, db)?);

    match matches.subcommand() {
        Some(("create-superuser", args)) => create_superuser(&service, args).await,
        _ => serve(service, server).await,
    }
}

fn build_service(auth: AuthConfig, db: PgPool) -> Result<SessionService, BoxError> {
    let users = Arc::new(PgUserStore::new(db.clone()));
    let revocations = Arc::new(PgRevocationStore::new(db));
    Ok(SessionService::new(auth, users, revocations)?)
}

async fn serve(service: Arc<SessionService>, server: ServerConfig) -> Result<(), BoxError> {
    spawn_blacklist_pruner(service.clone(), server.prune_interval_secs);

    let app = create_routes(service).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&server.listen_addr).await?;
    tracing::info!(
        addr = %server.listen_addr,
        version = env!("CARGO_PKG_VERSION"),
        "RustPress users service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("RustPress users service stopped");
    Ok(())
}

async fn create_superuser(service: &SessionService, args: &ArgMatches) -> Result<(), BoxError> {
    let required = |name: &str| -> Result<String, BoxError> {
        args.get_one::<String>(name)
            .cloned()
            .ok_or_else(|| format!("missing --{name}").into())
    };

    let gender = args
        .get_one::<Gender>("gender")
        .copied()
        .ok_or("missing --gender")?;
    let birth_date = args
        .get_one::<NaiveDate>("birth-date")
        .copied()
        .ok_or("missing --birth-date")?;

    let user = service
        .create_superuser(
            &required("email")?,
            &required("name")?,
            &required("password")?,
            gender,
            birth_date,
        )
        .await?;

    tracing::info!(user_id = user.id, email = %user.email, "Superuser ready");
    Ok(())
}

/// Periodically drop blacklist entries whose tokens expired on their own
fn spawn_blacklist_pruner(service: Arc<SessionService>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(e) = service.ledger().prune_expired(chrono::Utc::now()).await {
                tracing::warn!("Blacklist pruning failed: {}", e);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
