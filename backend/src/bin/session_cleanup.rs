use budgetbook_backend::{
    config::Config, db::connection::create_pool, repositories::session as session_repo,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;

    let deleted_sessions = session_repo::cleanup_expired_sessions(&pool).await?;
    if deleted_sessions > 0 {
        tracing::info!("Deleted {} expired sessions", deleted_sessions);
    }

    sqlx::query("VACUUM (ANALYZE) sessions").execute(&pool).await?;

    Ok(())
}
