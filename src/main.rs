use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::{info, warn};

use taskmanager::auth::AuthSettings;
use taskmanager::config::{Config, StoreKind};
use taskmanager::email::{LogMailer, Mailer, SendGridMailer};
use taskmanager::routes::{self, health};
use taskmanager::store::{MemoryStore, PgStore, Store};
use taskmanager::AppState;

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

async fn build_store(config: &Config) -> io::Result<Arc<dyn Store>> {
    match config.store {
        StoreKind::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| startup_error("DATABASE_URL must be set"))?;
            let store = PgStore::connect(url, config.db_max_connections)
                .await
                .map_err(startup_error)?;
            info!("Connected to PostgreSQL");
            Ok(Arc::new(store))
        }
    }
}

fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    match &config.sendgrid_api_key {
        Some(key) => Arc::new(SendGridMailer::new(key.clone(), config.mail_from.clone())),
        None => {
            info!("SENDGRID_API_KEY not set; account emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(startup_error)?;
    let store = build_store(&config).await?;
    let state = web::Data::new(AppState::new(
        store,
        build_mailer(&config),
        AuthSettings::from(&config),
    ));

    info!("Starting task manager at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
