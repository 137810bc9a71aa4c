use anyhow::Result;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use auth::admin::{AdminAuthority, AdminConfig};
use auth::email::{LogMailer, MailConfig};
use auth::jwt::{JwtConfig, TokenCodec};
use auth::rate_limiter::{RateLimiter, RateLimiterConfig};
use auth::routes;
use auth::service::AuthService;
use auth::stores::{PgTrialCodeStore, PgUserStore};
use auth::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting VoyageX auth service");

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    sqlx::migrate!().run(&pool).await?;

    let jwt_config = JwtConfig::from_env()?;
    let codec = TokenCodec::new(&jwt_config);

    let mail_config = MailConfig::from_env();
    let admin_config = AdminConfig::from_env();

    let user_store = Arc::new(PgUserStore::new(pool.clone()));
    let trial_code_store = Arc::new(PgTrialCodeStore::new(pool.clone()));

    let auth_service = AuthService::new(
        user_store,
        Arc::new(LogMailer),
        codec.clone(),
        mail_config.app_url,
    );
    let admin_authority = AdminAuthority::new(&admin_config, codec.clone(), trial_code_store)?;

    let app_state = AppState {
        auth: Arc::new(auth_service),
        admin: Arc::new(admin_authority),
        codec,
        rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
    };

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Auth service listening on 0.0.0.0:3000");

    axum::serve(listener, app).await?;

    Ok(())
}
