use actix_web::{delete, get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use tracing::{error, info};

use crate::middleware::AdminUser;
use crate::models::daily_logs::{self, Entity as DailyLogs};
use crate::models::students::{self, Entity as Students};
use crate::models::users::Entity as Users;
use crate::routes::auth::session_cookie;
use crate::routes::internal_error;
use crate::utils::{jwt, password};

// DTO pour la connexion admin
#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

// Un user annoté avec son nombre d'élèves
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserResponse {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub state: i32,
    pub is_subscribed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub student_count: i64,
}

/// POST /api/admin/login - Connexion admin (PUBLIC)
/// Identifiants configurés en environnement (hash PBKDF2), pas de
/// credentials en dur dans le code
#[post("/login")]
pub async fn admin_login(body: web::Json<AdminLoginRequest>) -> HttpResponse {
    let (admin_username, admin_password_hash) =
        match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD_HASH")) {
            (Ok(username), Ok(hash)) => (username, hash),
            _ => {
                error!("ADMIN_USERNAME / ADMIN_PASSWORD_HASH not configured");
                return HttpResponse::InternalServerError().json(serde_json::json!({
                    "message": "Admin login is not configured"
                }));
            }
        };

    let credentials_ok = body.username == admin_username
        && password::verify_password(&body.password, &admin_password_hash).unwrap_or(false);

    if !credentials_ok {
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "message": "Invalid credentials"
        }));
    }

    // Session admin: même mécanique que les users, avec role = "admin"
    let token = match jwt::generate_token(0, &admin_username, jwt::ROLE_ADMIN) {
        Ok(token) => token,
        Err(e) => return internal_error("Failed to generate admin token", e),
    };

    HttpResponse::Ok()
        .cookie(session_cookie(token))
        .json(serde_json::json!({ "success": true }))
}

/// GET /api/admin/users - Lister les users avec leur nombre d'élèves (ADMIN)
#[get("/users")]
pub async fn list_users(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let users = match Users::find().all(db.get_ref()).await {
        Ok(users) => users,
        Err(e) => return internal_error("Failed to fetch users", e),
    };

    // Compter les élèves en UNE SEULE query groupée au lieu de N queries
    let counts: Vec<(i32, i64)> = match Students::find()
        .select_only()
        .column(students::Column::UserId)
        .column_as(students::Column::Id.count(), "student_count")
        .group_by(students::Column::UserId)
        .into_tuple()
        .all(db.get_ref())
        .await
    {
        Ok(counts) => counts,
        Err(e) => return internal_error("Failed to count students", e),
    };

    let counts_map: HashMap<i32, i64> = counts.into_iter().collect();

    let response: Vec<AdminUserResponse> = users
        .into_iter()
        .map(|user| AdminUserResponse {
            student_count: counts_map.get(&user.id).copied().unwrap_or(0),
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            username: user.username,
            state: user.state_id,
            is_subscribed: user.is_subscribed,
            created_at: user.created_at,
        })
        .collect();

    HttpResponse::Ok().json(response)
}

/// Supprime un user et tout ce qui en dépend, dans l'ordre des dépendances:
/// journaux (petits-enfants), puis élèves (enfants), puis le user.
/// Retourne (élèves supprimés, journaux supprimés)
pub(crate) async fn delete_user_cascade(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(u64, u64), DbErr> {
    // 1. Retrouver les élèves du user
    let students_list = Students::find()
        .filter(students::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    let student_ids: Vec<i32> = students_list.iter().map(|s| s.id).collect();

    // 2. Supprimer les journaux de ces élèves
    let mut logs_deleted = 0;
    if !student_ids.is_empty() {
        logs_deleted = DailyLogs::delete_many()
            .filter(daily_logs::Column::StudentId.is_in(student_ids))
            .exec(db)
            .await?
            .rows_affected;
    }

    // 3. Supprimer les élèves
    let students_deleted = Students::delete_many()
        .filter(students::Column::UserId.eq(user_id))
        .exec(db)
        .await?
        .rows_affected;

    // 4. Supprimer le user
    Users::delete_by_id(user_id).exec(db).await?;

    Ok((students_deleted, logs_deleted))
}

/// DELETE /api/admin/users/{id} - Supprimer un user en cascade (ADMIN)
#[delete("/users/{id}")]
pub async fn delete_user(
    admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let user_id = path.into_inner();

    match delete_user_cascade(db.get_ref(), user_id).await {
        Ok((students_deleted, logs_deleted)) => {
            info!(
                "Admin {} deleted user {} ({} students, {} logs)",
                admin.username, user_id, students_deleted, logs_deleted
            );
            HttpResponse::Ok().json(serde_json::json!({
                "message": "User and all associated students and logs deleted"
            }))
        }
        Err(e) => internal_error("Failed to delete user", e),
    }
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(admin_login)
            .service(list_users)
            .service(delete_user),
    );
}
