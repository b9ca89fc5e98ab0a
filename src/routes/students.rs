use actix_web::{delete, get, post, web, HttpResponse};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;

use crate::middleware::AuthUser;
use crate::models::daily_logs::{self, Entity as DailyLogs, ActiveModel as DailyLogActiveModel};
use crate::models::students::{self, Entity as Students, ActiveModel as StudentActiveModel};
use crate::routes::internal_error;

// DTO pour créer un élève
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
}

// DTO pour ajouter une entrée au journal quotidien
#[derive(Deserialize)]
pub struct CreateLogRequest {
    pub subject: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub notes: Option<String>,
}

/// Charge un élève et vérifie qu'il appartient bien à l'utilisateur connecté
/// Un élève d'un autre compte est traité comme inexistant
async fn find_owned_student(
    db: &DatabaseConnection,
    student_id: i32,
    user_id: i32,
) -> Result<Option<students::Model>, DbErr> {
    let student = Students::find_by_id(student_id).one(db).await?;
    Ok(student.filter(|s| s.user_id == user_id))
}

/// POST /api/students - Créer un élève (PROTÉGÉE)
#[post("")]
pub async fn create_student(
    auth_user: AuthUser,
    body: web::Json<CreateStudentRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let new_student = StudentActiveModel {
        user_id: Set(auth_user.user_id),
        first_name: Set(body.first_name.clone()),
        last_name: Set(body.last_name.clone()),
        grade: Set(body.grade.clone()),
        ..Default::default()
    };

    match new_student.insert(db.get_ref()).await {
        Ok(student) => HttpResponse::Created().json(student),
        Err(e) => internal_error("Failed to create student", e),
    }
}

/// GET /api/students - Lister ses élèves (PROTÉGÉE)
#[get("")]
pub async fn get_students(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match Students::find()
        .filter(students::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(students::Column::Id)
        .all(db.get_ref())
        .await
    {
        Ok(students_list) => HttpResponse::Ok().json(students_list),
        Err(e) => internal_error("Failed to fetch students", e),
    }
}

/// GET /api/students/{id} - Récupérer un élève (PROTÉGÉE)
#[get("/{id}")]
pub async fn get_student(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match find_owned_student(db.get_ref(), path.into_inner(), auth_user.user_id).await {
        Ok(Some(student)) => HttpResponse::Ok().json(student),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "message": "Student not found"
        })),
        Err(e) => internal_error("Failed to fetch student", e),
    }
}

/// DELETE /api/students/{id} - Supprimer un élève et ses journaux (PROTÉGÉE)
#[delete("/{id}")]
pub async fn delete_student(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let student = match find_owned_student(db.get_ref(), path.into_inner(), auth_user.user_id).await
    {
        Ok(Some(student)) => student,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "message": "Student not found"
            }));
        }
        Err(e) => return internal_error("Failed to fetch student", e),
    };

    // Journaux d'abord, élève ensuite
    if let Err(e) = DailyLogs::delete_many()
        .filter(daily_logs::Column::StudentId.eq(student.id))
        .exec(db.get_ref())
        .await
    {
        return internal_error("Failed to delete student logs", e);
    }

    match Students::delete_by_id(student.id).exec(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Student and associated logs deleted"
        })),
        Err(e) => internal_error("Failed to delete student", e),
    }
}

/// POST /api/students/{id}/logs - Ajouter une entrée au journal (PROTÉGÉE)
#[post("/{id}/logs")]
pub async fn add_log(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<CreateLogRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // Valider les heures avant tout accès BD
    if body.hours <= 0.0 {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Hours must be greater than 0"
        }));
    }

    match find_owned_student(db.get_ref(), path.into_inner(), auth_user.user_id).await {
        Ok(Some(student)) => {
            let new_log = DailyLogActiveModel {
                student_id: Set(student.id),
                subject: Set(body.subject.clone()),
                date: Set(body.date),
                hours: Set(body.hours),
                notes: Set(body.notes.clone()),
                ..Default::default()
            };

            match new_log.insert(db.get_ref()).await {
                Ok(log) => HttpResponse::Created().json(log),
                Err(e) => internal_error("Failed to create log", e),
            }
        }
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "message": "Student not found"
        })),
        Err(e) => internal_error("Failed to fetch student", e),
    }
}

/// GET /api/students/{id}/logs - Lister le journal d'un élève (PROTÉGÉE)
#[get("/{id}/logs")]
pub async fn get_logs(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let student = match find_owned_student(db.get_ref(), path.into_inner(), auth_user.user_id).await
    {
        Ok(Some(student)) => student,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "message": "Student not found"
            }));
        }
        Err(e) => return internal_error("Failed to fetch student", e),
    };

    match DailyLogs::find()
        .filter(daily_logs::Column::StudentId.eq(student.id))
        .order_by_desc(daily_logs::Column::Date)
        .all(db.get_ref())
        .await
    {
        Ok(logs) => HttpResponse::Ok().json(logs),
        Err(e) => internal_error("Failed to fetch logs", e),
    }
}

pub fn student_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/students")
            .service(create_student)
            .service(get_students)
            .service(get_student)
            .service(delete_student)
            .service(add_log)
            .service(get_logs),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::jwt;
    use actix_web::cookie::Cookie;
    use actix_web::{test, App};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample_student(id: i32, user_id: i32) -> students::Model {
        students::Model {
            id,
            user_id,
            first_name: "Léo".to_string(),
            last_name: "Curie".to_string(),
            grade: Some("5".to_string()),
            profile_picture: None,
            created_at: None,
        }
    }

    fn user_token(user_id: i32) -> String {
        jwt::generate_token(user_id, "marie", jwt::ROLE_USER).unwrap()
    }

    #[actix_web::test]
    async fn test_create_student() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_student(10, 1)]])
            .into_connection();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .configure(student_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/students")
            .cookie(Cookie::new("token", user_token(1)))
            .set_json(serde_json::json!({
                "firstName": "Léo",
                "lastName": "Curie",
                "grade": "5"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
    }

    #[actix_web::test]
    async fn test_get_student_of_another_user_is_404() {
        // L'élève 10 appartient au user 999, pas au user connecté
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_student(10, 999)]])
            .into_connection();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .configure(student_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/students/10")
            .cookie(Cookie::new("token", user_token(1)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_add_log_rejects_non_positive_hours() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .configure(student_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/students/10/logs")
            .cookie(Cookie::new("token", user_token(1)))
            .set_json(serde_json::json!({
                "subject": "Math",
                "date": "2025-09-01",
                "hours": 0.0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_routes_require_session() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .configure(student_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/students").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
