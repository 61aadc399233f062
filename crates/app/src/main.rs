use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "botfair={level},broadcaster={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let database = settings.database;
    let telegram = settings.telegram;
    let broadcast = settings.broadcast;
    tasks.spawn(async move {
        tracing::info!("Found broadcast settings...");
        let db = match parse_database(&database).await {
            Ok(db) => db,
            Err(err) => {
                tracing::error!("failed to initialize database: {err}");
                return;
            }
        };

        let engine = match engine::Engine::builder().database(db).build().await {
            Ok(engine) => engine,
            Err(err) => {
                tracing::error!("failed to build engine from database: {err}");
                return;
            }
        };

        let bot = teloxide::Bot::new(&telegram.token);
        let courier = broadcaster::TelegramCourier::new(bot);
        match broadcaster::Broadcaster::builder()
            .engine(engine)
            .courier(courier)
            .period(Duration::from_secs(broadcast.interval_secs))
            .send_gap(Duration::from_millis(broadcast.send_gap_ms))
            .build()
        {
            Ok(broadcaster) => broadcaster.run().await,
            Err(err) => tracing::error!("failed to initialize broadcaster: {err}"),
        }
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
