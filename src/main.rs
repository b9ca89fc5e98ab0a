mod models;
mod routes;
mod db;
mod services;
mod utils;
mod middleware;

use actix_web::{App, HttpServer, web};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::services::email::{EmailSender, ResendMailer};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🔌 Connecting to database...");
    let db = db::establish_connection()
        .await
        .expect("Failed to connect to database");
    info!("✅ Database connected!");

    // Le mailer est injecté dans les routes: substituable par un faux en test
    let mailer: Arc<dyn EmailSender> = Arc::new(ResendMailer::from_env());
    let mailer_data: web::Data<dyn EmailSender> = web::Data::from(mailer);

    // Partagé entre les workers via Arc (web::Data) plutôt que cloné:
    // DatabaseConnection n'est pas Clone quand la feature `mock` est active.
    let db_data = web::Data::new(db);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    info!("🚀 Starting server on http://127.0.0.1:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(mailer_data.clone())
            .configure(routes::configure_routes)
    })
        .bind(("127.0.0.1", port))?
        .run()
        .await
}
