//! Application wiring: gateway construction, service assembly, and the
//! HTTP server loop.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::api;
use crate::domain::ports::{CourseRepository, PaymentGateway};
use crate::domain::{CheckoutSettings, EnrollmentEngine, PaymentReconciler};
use crate::outbound::payment::{HttpPaymentGateway, WebhookVerifier};
use crate::outbound::persistence::{
    initialize_schema, Database, DatabaseError, PostgresDatabase, SqlCourseRepository,
    SqlEnrollmentRepository, SqliteDatabase,
};

pub use self::config::{AppConfig, DatabaseBackend};

/// Everything the handlers need, cloned into each worker.
#[derive(Clone)]
pub struct AppState {
    /// Enrollment lifecycle service.
    pub engine: EnrollmentEngine,
    /// Payment confirmation reconciler.
    pub reconciler: PaymentReconciler,
    /// Webhook signature verifier.
    pub verifier: WebhookVerifier,
    /// Course read side, used directly by the course-list route.
    pub courses: Arc<dyn CourseRepository>,
}

/// Construct the configured storage gateway. A failure here is fatal;
/// statement-level schema problems later are logged instead.
///
/// # Errors
///
/// [`DatabaseError::Connection`] when the engine cannot be reached or the
/// file cannot be opened.
pub async fn connect_database(config: &AppConfig) -> Result<Arc<dyn Database>, DatabaseError> {
    let db: Arc<dyn Database> = match config.database_backend {
        DatabaseBackend::Sqlite => {
            info!(path = %config.sqlite_path.display(), "using embedded SQLite backend");
            Arc::new(SqliteDatabase::open(&config.sqlite_path)?)
        }
        DatabaseBackend::Postgres => {
            info!("using networked PostgreSQL backend");
            Arc::new(PostgresDatabase::connect(&config.database_url).await?)
        }
    };
    Ok(db)
}

/// Assemble services over an already-connected gateway.
///
/// # Errors
///
/// Returns an error when the outbound HTTP client cannot be constructed.
pub fn build_state(db: Arc<dyn Database>, config: &AppConfig) -> Result<AppState, reqwest::Error> {
    let enrollments = Arc::new(SqlEnrollmentRepository::new(Arc::clone(&db)));
    let courses: Arc<dyn CourseRepository> = Arc::new(SqlCourseRepository::new(Arc::clone(&db)));
    let engine = EnrollmentEngine::new(enrollments);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::with_timeout(
        config.payment_api_base.clone(),
        config.payment_secret_key.clone(),
        Duration::from_secs(config.payment_timeout_seconds),
    )?);
    let reconciler = PaymentReconciler::new(
        Arc::clone(&courses),
        engine.clone(),
        gateway,
        CheckoutSettings {
            currency: config.currency.clone(),
            frontend_base_url: config.frontend_base_url.clone(),
        },
    );
    Ok(AppState {
        engine,
        reconciler,
        verifier: WebhookVerifier::new(config.payment_webhook_secret.clone()),
        courses,
    })
}

/// Register handlers and shared state on a service config. Shared with
/// handler-level tests.
pub fn register(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(web::Data::new(state.engine.clone()))
        .app_data(web::Data::new(state.reconciler.clone()))
        .app_data(web::Data::new(state.verifier.clone()))
        .app_data(web::Data::from(Arc::clone(&state.courses)))
        .service(api::health::health)
        .service(api::payments::create_checkout_session)
        .service(api::payments::webhook)
        .service(api::payments::verify_session)
        .service(api::enrollments::purchase)
        .service(api::enrollments::check)
        .service(api::enrollments::my_courses);
}

/// Bootstrap storage and serve until shutdown.
///
/// # Errors
///
/// I/O errors from binding or serving; fatal storage or client
/// construction failures are surfaced as `std::io::Error`.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    let db = connect_database(&config)
        .await
        .map_err(std::io::Error::other)?;
    initialize_schema(db.as_ref()).await;
    let state = build_state(db, &config).map_err(std::io::Error::other)?;

    info!(bind_addr = %config.bind_addr, "starting HTTP server");
    let server_state = state.clone();
    HttpServer::new(move || {
        let state = server_state.clone();
        App::new().configure(move |cfg| register(cfg, &state))
    })
    .bind(config.bind_addr)?
    .run()
    .await
}
