mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod utils;
#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::services::mailer::{LogMailer, Mailer};
use crate::services::storage::FileStorage;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trading_journal=info,actix_web=info")),
        )
        .init();

    let config = AppConfig::from_env();

    // Les dossiers d'upload créent aussi instance/ pour la base SQLite
    let storage = FileStorage::new(&config);
    storage.ensure_dirs().await?;

    tracing::info!("🔌 Connecting to database...");
    let db = db::establish_connection(&config.database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {}", e)))?;
    db::create_schema(&db)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to create schema: {}", e)))?;
    db::seed_defaults(&db)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to seed defaults: {}", e)))?;
    tracing::info!("✅ Database connected!");

    let bind_address = config.bind_address.clone();
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    let db = web::Data::new(db);
    let config = web::Data::new(config);
    let storage = web::Data::new(storage);
    let mailer = web::Data::from(mailer);

    tracing::info!("🚀 Starting server on http://{}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(routes::json_config(&config))
            .app_data(web::PayloadConfig::new(config.json_body_limit()))
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(storage.clone())
            .app_data(mailer.clone())
            .configure(routes::configure_routes)
            .default_service(web::to(routes::not_found))
    })
    .bind(bind_address)?
    .run()
    .await
}
