mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::error::AppError;
use crate::core::middleware::AuthState;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::alerts::{routes as alerts_routes, AlertService};
use crate::features::auth::routes as auth_routes;
use crate::features::auth::services::{AuthService, AuthTimings};
use crate::features::auth::JwtService;
use crate::features::reports::{routes as reports_routes, ReportService};
use crate::features::schedules::{routes as schedules_routes, ScheduleService};
use crate::features::users::UserService;
use crate::modules::notifications::{EmailSender, Notifier, SmsSender};
use crate::modules::storage::{ImageStore, MinIOImageStore};
use axum::{extract::DefaultBodyLimit, middleware::from_fn, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Feature services shared through router state
struct AppServices {
    auth: Arc<AuthService>,
    reports: Arc<ReportService>,
    alerts: Arc<AlertService>,
    schedules: Arc<ScheduleService>,
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "UP", "timestamp": Utc::now() }))
}

async fn api_root() -> Json<Value> {
    Json(json!({
        "name": "Bien Unido API",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/swagger-ui/",
    }))
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// API routes, health check and fallback. Cross-cutting layers are added by the caller.
fn build_app(services: AppServices, auth_state: AuthState, max_body_size: usize) -> Router {
    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes(Arc::clone(&services.auth)))
        .merge(reports_routes::routes(services.reports))
        .merge(alerts_routes::routes(services.alerts))
        .merge(schedules_routes::routes(services.schedules))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(auth_routes::public_routes(services.auth))
        .route("/api", get(api_root))
        .route("/health", get(health_check));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
}

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}, env={:?}",
        worker_threads,
        std::process::id(),
        config.app.env
    );

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Outbound notifications; a bad SMTP config is fatal, missing Twilio credentials are not
    let email_sender = EmailSender::new(&config.smtp)
        .map_err(|e| anyhow::anyhow!("Failed to configure email sender: {}", e))?;
    let sms_sender = SmsSender::new(&config.sms);
    tracing::info!(
        "Notifications initialized (email mock: {}, sms mock: {})",
        email_sender.is_mock(),
        sms_sender.is_mock()
    );
    let notifier = Arc::new(Notifier::new(email_sender, sms_sender));

    let image_store = MinIOImageStore::connect(config.minio.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO image store: {}", e))?;
    tracing::info!(
        "MinIO image store initialized for bucket: {}",
        image_store.bucket_name()
    );
    let images: Arc<dyn ImageStore> = Arc::new(image_store);

    let jwt = Arc::new(JwtService::new(&config.auth));
    let user_service = Arc::new(UserService::new(pool.clone()));

    let services = AppServices {
        auth: Arc::new(AuthService::new(
            Arc::clone(&user_service),
            Arc::clone(&jwt),
            Arc::clone(&notifier),
            AuthTimings::from_config(&config.auth),
            config.app.frontend_url.clone(),
        )),
        reports: Arc::new(ReportService::new(
            pool.clone(),
            Arc::clone(&user_service),
            Arc::clone(&images),
            Arc::clone(&notifier),
        )),
        alerts: Arc::new(AlertService::new(
            pool.clone(),
            Arc::clone(&user_service),
            Arc::clone(&images),
        )),
        schedules: Arc::new(ScheduleService::new(pool.clone())),
    };
    tracing::info!("Feature services initialized");

    let auth_state = AuthState {
        jwt,
        users: user_service,
    };

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    let app = Router::new()
        .merge(swagger)
        .merge(build_app(
            services,
            auth_state,
            config.app.max_request_body_size,
        ))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AuthConfig;
    use crate::shared::test_helpers::{
        test_image_store, test_jwt, test_notifier, test_pool, TEST_JWT_SECRET,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::time::Duration;

    fn test_server() -> TestServer {
        let pool = test_pool();
        let users = Arc::new(UserService::new(pool.clone()));
        let jwt = test_jwt();
        let auth_config = AuthConfig {
            jwt_secret: String::from_utf8_lossy(TEST_JWT_SECRET).into_owned(),
            jwt_expires_in: Duration::from_secs(3600),
            jwt_leeway: Duration::from_secs(0),
            verification_code_ttl: Duration::from_secs(900),
            reset_token_ttl: Duration::from_secs(3600),
        };
        let services = AppServices {
            auth: Arc::new(AuthService::new(
                Arc::clone(&users),
                Arc::clone(&jwt),
                test_notifier(),
                AuthTimings::from_config(&auth_config),
                "http://localhost:3000".to_string(),
            )),
            reports: Arc::new(ReportService::new(
                pool.clone(),
                Arc::clone(&users),
                test_image_store(),
                test_notifier(),
            )),
            alerts: Arc::new(AlertService::new(
                pool.clone(),
                Arc::clone(&users),
                test_image_store(),
            )),
            schedules: Arc::new(ScheduleService::new(pool)),
        };
        let auth_state = AuthState { jwt, users };
        TestServer::new(build_app(services, auth_state, 1024 * 1024)).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_up() {
        let response = test_server().get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "UP");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_api_root_is_public() {
        test_server().get("/api").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_feature_routes_require_token() {
        let server = test_server();
        for path in ["/api/reports", "/api/alerts", "/api/schedules", "/api/auth/me"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::UNAUTHORIZED);

            let body: Value = response.json();
            assert_eq!(body["message"], "Access denied. No token provided.");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = test_server().get("/api/nothing-here").await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: Value = response.json();
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Route not found");
    }
}
