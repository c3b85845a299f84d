use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use subdesk::config::Config;
use subdesk::db::{MemoryRestaurants, PgRestaurants, RestaurantRepository};
use subdesk::email;
use subdesk::notify::ExpiryNotificationJob;

#[derive(Parser)]
#[command(name = "subdesk", about = "Restaurant subscription management service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Email every restaurant whose subscription expires within 14 days, then exit.
    NotifyExpiring,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load config
    let config = Config::from_env()?;

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let restaurants = connect_repository(&config).await?;
    let mailer = email::build_mailer(config.mail.as_ref(), &config.mail_from, config.mail_timeout)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, restaurants, mailer).await,
        Command::NotifyExpiring => {
            let mailer = mailer.ok_or("No mail transport configured")?;
            let job = ExpiryNotificationJob::new(restaurants, mailer)
                .with_timeouts(config.repository_timeout, config.mail_timeout)
                .with_concurrency(config.notify_concurrency);

            let report = job.run(Utc::now()).await?;
            tracing::info!(
                "Processed {} restaurants: {} sent, {} failed",
                report.processed,
                report.sent(),
                report.failed()
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn connect_repository(
    config: &Config,
) -> Result<Arc<dyn RestaurantRepository>, Box<dyn std::error::Error>> {
    let Some(ref database_url) = config.database_url else {
        tracing::warn!("DATABASE_URL not set, using in-memory storage; data will not persist");
        return Ok(Arc::new(MemoryRestaurants::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.repository_timeout)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied");

    Ok(Arc::new(PgRestaurants::new(pool)))
}

async fn serve(
    config: Config,
    restaurants: Arc<dyn RestaurantRepository>,
    mailer: Option<Arc<dyn email::Mailer>>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting subdesk");
    if mailer.is_none() {
        tracing::warn!("No mail transport configured; expiry notifications are disabled");
    }

    let addr = SocketAddr::new(config.host, config.port);
    let (app, state) = subdesk::build_app(config, restaurants, mailer);

    // Housekeeping for the subscription check limiter
    let limiter_state = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(300));
        loop {
            tick.tick().await;
            limiter_state.check_limiter.cleanup(Duration::from_secs(120));
        }
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
