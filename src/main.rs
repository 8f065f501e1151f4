use std::sync::Arc;
use std::time::Duration;

use kahani_hero::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, HeroCache, MemoryStore, RedisStore, SlotStore},
    services::providers::tmdb::TmdbCatalog,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kahani_hero=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn SlotStore> = match &config.redis_url {
        Some(redis_url) => Arc::new(RedisStore::new(create_redis_client(redis_url)?)),
        None => Arc::new(MemoryStore::new()),
    };
    tracing::info!(store = store.name(), key = %config.hero_cache_key, "Hero cache ready");

    let cache = HeroCache::new(store, config.hero_cache_key.clone());
    let catalog = TmdbCatalog::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.hero_media_type,
    )?;

    let state = AppState::new(
        cache,
        Arc::new(catalog),
        config.hero_media_type,
        config.tmdb_image_url.clone(),
    )
    .with_session_idle_timeout(Duration::from_secs(config.session_idle_secs));
    state.spawn_session_sweeper(Duration::from_secs(config.session_sweep_secs.max(1)));

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
