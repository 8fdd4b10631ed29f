use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quotekaro_api::{
    app::build_app,
    config::AppConfig,
    db::{create_pool, orm_from_pool},
    integrations::{
        razorpay::{PaymentGateway, RazorpayClient},
        storage::{MemoryStore, ObjectStore, S3Store},
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,quotekaro_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let storage: Arc<dyn ObjectStore> = match &config.storage.bucket {
        Some(bucket) => {
            tracing::info!(bucket = %bucket, "using S3 object storage");
            Arc::new(S3Store::from_config(&config.storage, bucket).await)
        }
        None => {
            tracing::warn!("S3_BUCKET not set, uploads are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let payments: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(&config.razorpay)?);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    let state = AppState {
        orm: orm_from_pool(&pool),
        pool,
        config,
        storage,
        payments,
    };
    let app = build_app(state)?;

    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
