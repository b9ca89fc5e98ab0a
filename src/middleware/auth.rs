use actix_web::{dev::Payload, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::utils::jwt;

/// Structure qui contient les infos de l'utilisateur authentifié
/// Utilisée comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
}

/// Extracteur pour les routes d'administration
/// Mêmes règles que AuthUser, mais exige role = "admin" dans les claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub username: String,
}

/// Extrait le token de session de la requête
/// Priorité au cookie HTTP-only "token", fallback sur "Bearer <token>"
fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie("token") {
        return Some(cookie.value().to_string());
    }

    let auth_str = req.headers().get("Authorization")?.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(|t| t.to_string())
}

fn unauthorized(message: &str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "message": message
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

/// Implémentation de FromRequest pour AuthUser
/// Cela permet à Actix-Web d'extraire automatiquement AuthUser des requêtes
/// Gate synchrone: vérifie signature + expiration, aucun accès BD
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // 1. Extraire le token (cookie ou header)
        let token = match extract_token(req) {
            Some(token) => token,
            None => return ready(Err(unauthorized("Unauthorized"))),
        };

        // 2. Vérifier le token JWT
        let claims = match jwt::verify_token(&token) {
            Ok(claims) => claims,
            Err(_) => return ready(Err(unauthorized("Invalid token"))),
        };

        // 3. Créer et retourner AuthUser
        ready(Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
        }))
    }
}

/// Implémentation de FromRequest pour AdminUser
impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = match extract_token(req) {
            Some(token) => token,
            None => return ready(Err(unauthorized("Unauthorized"))),
        };

        let claims = match jwt::verify_token(&token) {
            Ok(claims) => claims,
            Err(_) => return ready(Err(unauthorized("Invalid token"))),
        };

        if claims.role != jwt::ROLE_ADMIN {
            let response = HttpResponse::Forbidden().json(serde_json::json!({
                "message": "Admin access required"
            }));
            return ready(Err(
                actix_web::error::InternalError::from_response("", response).into(),
            ));
        }

        ready(Ok(AdminUser {
            username: claims.username,
        }))
    }
}
