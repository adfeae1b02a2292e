use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avocado_shop_api::{
    app::build_app,
    completion::OpenAiCompletion,
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    payments::StripeGateway,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,avocado_shop_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    if config.admin_password_hash.is_none() {
        tracing::warn!("ADMIN_PASSWORD_HASH is not set, operator endpoints are unreachable");
    }

    let state = AppState {
        orm,
        payments: Arc::new(StripeGateway::new(&config.stripe)),
        completion: Arc::new(OpenAiCompletion::new(config.completion.clone())),
        config: Arc::new(config.clone()),
    };

    let app = build_app(state);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
