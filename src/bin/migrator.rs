use dotenvy::dotenv;
use tracing::info;
use utility_reports::{
    infrastructure::{config::Config, db},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init();

    let config = Config::from_env()?;
    if !config.uses_postgres() {
        anyhow::bail!(
            "store provider `{}` has no schema to migrate; set REPORTS__STORE__PROVIDER=postgres",
            config.store.provider
        );
    }
    let pool = db::connect(&config.database).await?;
    db::run_migrations(&pool).await?;

    info!("database migrations completed");

    Ok(())
}
