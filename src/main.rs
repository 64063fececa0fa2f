use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use mealweek_api::config::Config;
use mealweek_api::db::{create_pool, PgMealPlanStore, PgRecipeStore};
use mealweek_api::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState {
        recipes: Arc::new(PgRecipeStore::new(pool.clone())),
        meal_plans: Arc::new(PgMealPlanStore::new(pool)),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
