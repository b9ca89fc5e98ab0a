pub mod health;
pub mod auth;
pub mod admin;
pub mod students;

use actix_web::{web, HttpResponse};
use tracing::error;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(admin::admin_routes)
            .configure(students::student_routes),
    );
}

/// Loggue le détail de l'erreur côté serveur et renvoie un message
/// générique au client (ne jamais renvoyer le texte d'erreur de la BD)
pub(crate) fn internal_error(context: &str, err: impl std::fmt::Display) -> HttpResponse {
    error!("{}: {}", context, err);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "message": "Internal server error"
    }))
}
