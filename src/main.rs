use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vendor_match::config::{LoggingSettings, Settings};
use vendor_match::core::{MatchService, Matcher, RefreshDriver, Stores};
use vendor_match::routes::{self, auth::JwtManager, matches::AppState};
use vendor_match::services::{create_notifier, CacheManager, PostgresClient};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path segment errors (malformed project or match ids)
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path parameter: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging);
    info!("Starting vendor match service...");

    // Initialize cache manager (Redis is optional)
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match settings.cache.redis_url.as_deref() {
        Some(url) => match CacheManager::new(url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized with Redis (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), falling back to in-process cache", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        },
        None => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            CacheManager::local(l1_cache_size, cache_ttl)
        }
    };

    // Initialize PostgreSQL client
    let db_max_conn = settings.database.max_connections.unwrap_or(10);

    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            Some(db_max_conn),
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
    );

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    let notifier = create_notifier(settings.smtp.as_ref())
        .map_err(|e| startup_error("Failed to configure notifications", e))?;

    let criteria = settings.match_criteria();
    info!("Matcher initialized with criteria: {:?}", criteria);

    let service = Arc::new(MatchService::new(
        Stores::from_backend(postgres),
        Matcher::new(criteria),
        Arc::new(cache),
        notifier,
    ));

    let mut scheduler = if settings.scheduler.enabled {
        let driver = RefreshDriver::new(service.clone(), settings.scheduler.clone());
        Some(
            driver
                .start()
                .await
                .map_err(|e| startup_error("Failed to start scheduler", e))?,
        )
    } else {
        info!("Scheduled jobs disabled");
        None
    };

    let app_state = AppState { service };
    let jwt = web::Data::new(JwtManager::new(settings.auth.jwt_secret.as_bytes()));

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let server_result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(jwt.clone())
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    if let Some(sched) = scheduler.as_mut() {
        info!("Stopping scheduled jobs");
        if let Err(e) = sched.shutdown().await {
            warn!("Failed to stop scheduler cleanly: {}", e);
        }
    }

    server_result
}
