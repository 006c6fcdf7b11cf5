use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod clock;
mod config;
mod controllers;
mod db;
mod dissector;
mod linker;
mod models;
mod notifications;

use clock::SystemClock;
use config::Config;
use db::Database;
use dissector::BasicDissector;
use linker::LinkerService;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub linker: Arc<LinkerService>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::with_pool_size(&config.database_url, config.db_pool_size)
        .map(Arc::new)
        .map_err(|e| {
            log::error!("Failed to open database: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;

    let notifier = notifications::create_notification_dispatcher(config.notify_url.as_deref());
    let linker = Arc::new(LinkerService::new(
        Arc::clone(&db),
        Arc::new(SystemClock),
        config.linker(),
        Arc::new(BasicDissector),
        notifier,
    ));
    log::info!(
        "[LINKER] Codes: {} chars, {} minute TTL, {} attempts",
        config.code_length,
        config.code_ttl_minutes,
        config.code_max_attempts
    );

    log::info!("Starting linker server on port {}", port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                db: Arc::clone(&db),
                config: config.clone(),
                linker: Arc::clone(&linker),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::linker::config)
            .configure(controllers::wallet::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
