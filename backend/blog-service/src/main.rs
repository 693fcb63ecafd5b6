//! Service entry point.

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use blog_service::db::{PgPostStore, PgUserStore};
use blog_service::handlers::health::{health_check, HealthState};
use blog_service::openapi::ApiDoc;
use blog_service::security::token;
use blog_service::services::S3AssetStore;
use blog_service::{routes, AppState, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    if let Err(e) = token::initialize_keys(&config.auth.jwt_secret) {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to initialize JWT keys: {e}"),
        ));
    }

    // Database connection pool
    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {}", e);
            eprintln!("ERROR: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Connected to database");

    tracing::info!("Running database migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
        tracing::error!("Migration failed: {}", e);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to run migrations: {e}"),
        ));
    }
    tracing::info!("Migrations completed successfully");

    let assets = S3AssetStore::new(&config.s3).await;

    let state = AppState {
        posts: Arc::new(PgPostStore::new(db_pool.clone())),
        users: Arc::new(PgUserStore::new(db_pool.clone())),
        assets: Arc::new(assets),
    };

    let health_state = web::Data::new(HealthState::new(db_pool.clone()));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();

    HttpServer::new(move || {
        // Build CORS configuration
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let openapi_doc = ApiDoc::openapi();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(health_state.clone())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi_doc))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/health", web::get().to(health_check))
            .configure(routes::configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
