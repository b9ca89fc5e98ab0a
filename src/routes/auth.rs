use actix_web::{post, get, web, HttpResponse};
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::middleware::AuthUser;
use crate::models::otps::{self, Entity as Otps};
use crate::models::states::Entity as States;
use crate::models::users::{self, Entity as Users, Column as UserColumn, ActiveModel as UserActiveModel};
use crate::routes::internal_error;
use crate::services::email::{self, EmailSender};
use crate::utils::{jwt, password};

/// Fenêtre de validité d'un code OTP
const OTP_TTL_MINUTES: i64 = 10;

/// Période d'essai offerte à l'inscription
const TRIAL_DAYS: i64 = 14;

// DTO pour la connexion
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

// DTO pour demander un code OTP (inscription ou reset)
#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

// DTO pour l'inscription (après réception du code OTP)
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub state: i32,
    pub otp: String,
}

// DTO pour retrouver l'email d'un compte
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindEmailRequest {
    pub username_or_email: String,
}

// DTO pour vérifier le code OTP de reset
#[derive(Deserialize)]
pub struct VerifyResetOtpRequest {
    pub email: String,
    pub otp: String,
}

// DTO pour le changement de mot de passe
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

// Projection publique du user retournée au login (jamais le hash)
#[derive(Serialize)]
pub struct UserInfo {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub username: String,
    pub state: i32,
}

// Réponse pour /auth/me
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub state: i32,
    pub min_credits_required: f64,
    pub hours_per_credit: f64,
    pub profile_picture: String,
    pub is_trial: bool,
    pub is_premium: bool,
}

/// Cookie de session HTTP-only (SameSite=Lax, 7 jours)
pub(crate) fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build("token", token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(7))
        .finish()
}

/// Code OTP uniformément aléatoire entre 100000 et 999999
fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Calcule isTrial / isPremium à partir de l'état stocké et de l'instant courant
/// isTrial: trialEndsAt existe et est strictement dans le futur
/// isPremium: isSubscribed ET (pas de date de fin OU fin strictement future)
pub(crate) fn compute_access_flags(
    is_subscribed: bool,
    subscription_ends_at: Option<DateTime<Utc>>,
    trial_ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (bool, bool) {
    let is_trial = trial_ends_at.is_some_and(|t| t > now);
    let is_premium = is_subscribed && subscription_ends_at.is_none_or(|t| t > now);
    (is_trial, is_premium)
}

/// Supprime tous les codes OTP d'un email puis insère le nouveau
/// Les deux étapes ne sont pas transactionnelles: un crash entre les deux
/// laisse zéro code actif, jamais deux valides côté suppression
async fn issue_otp(db: &DatabaseConnection, email: &str) -> Result<String, DbErr> {
    let otp = generate_otp();

    Otps::delete_many()
        .filter(otps::Column::Email.eq(email))
        .exec(db)
        .await?;

    let new_otp = otps::ActiveModel {
        email: Set(email.to_string()),
        otp: Set(otp.clone()),
        expires_at: Set(Utc::now() + Duration::minutes(OTP_TTL_MINUTES)),
        ..Default::default()
    };
    new_otp.insert(db).await?;

    Ok(otp)
}

/// Cherche un code (email, otp) non expiré
/// Si deux lignes coexistent (requêtes concurrentes), n'importe quelle
/// ligne correspondante convient: les codes sont aléatoires
async fn find_valid_otp(
    db: &DatabaseConnection,
    email: &str,
    code: &str,
) -> Result<Option<otps::Model>, DbErr> {
    let row = Otps::find()
        .filter(otps::Column::Email.eq(email))
        .filter(otps::Column::Otp.eq(code))
        .one(db)
        .await?;

    // Un code expiré est traité comme absent
    Ok(row.filter(|r| r.expires_at > Utc::now()))
}

/// POST /api/auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Trouver l'utilisateur par email OU username
    let user = Users::find()
        .filter(
            Condition::any()
                .add(UserColumn::Email.eq(&body.email_or_username))
                .add(UserColumn::Username.eq(&body.email_or_username)),
        )
        .one(db.get_ref())
        .await;

    let user = match user {
        Ok(Some(user)) => user,
        // Même réponse pour "compte inconnu" et "mauvais mot de passe":
        // ne pas révéler l'existence du compte
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invalid credentials"
            }));
        }
        Err(e) => return internal_error("Login query failed", e),
    };

    // 2. Vérifier le mot de passe
    let is_valid = match password::verify_password(&body.password, &user.password_hash) {
        Ok(valid) => valid,
        Err(e) => return internal_error("Password verification error", e),
    };

    if !is_valid {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invalid credentials"
        }));
    }

    // 3. Générer le JWT de session (7 jours)
    let token = match jwt::generate_token(user.id, &user.username, jwt::ROLE_USER) {
        Ok(token) => token,
        Err(e) => return internal_error("Failed to generate token", e),
    };

    // 4. Cookie HTTP-only + projection publique du user
    HttpResponse::Ok()
        .cookie(session_cookie(token))
        .json(serde_json::json!({
            "message": "Login successful",
            "user": UserInfo {
                id: user.id,
                name: format!("{} {}", user.first_name, user.last_name),
                email: user.email,
                username: user.username,
                state: user.state_id,
            }
        }))
}

/// POST /api/auth/logout - Se déconnecter (PUBLIC)
#[post("/logout")]
pub async fn logout() -> HttpResponse {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();

    HttpResponse::Ok().cookie(cookie).json(serde_json::json!({
        "message": "Logged out"
    }))
}

/// GET /api/auth/me - Profil de l'utilisateur connecté (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    // Le token peut survivre à la suppression du compte: re-vérifier en BD
    let user = match Users::find_by_id(auth_user.user_id).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "message": "Unauthorized"
            }));
        }
        Err(e) => return internal_error("Failed to load current user", e),
    };

    // Statuts dérivés, recalculés à chaque requête (pas de cache)
    let (is_trial, is_premium) = compute_access_flags(
        user.is_subscribed,
        user.subscription_ends_at,
        user.trial_ends_at,
        Utc::now(),
    );

    HttpResponse::Ok().json(MeResponse {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        username: user.username,
        state: user.state_id,
        min_credits_required: user.min_credits_required,
        hours_per_credit: user.hours_per_credit,
        profile_picture: user.profile_picture.unwrap_or_default(),
        is_trial,
        is_premium,
    })
}

/// POST /api/auth/send-otp - Envoyer un code d'inscription (PUBLIC)
#[post("/send-otp")]
pub async fn send_otp(
    body: web::Json<SendOtpRequest>,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<dyn EmailSender>,
) -> HttpResponse {
    // 1. Validation minimale de l'email
    if !body.email.contains('@') {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invalid email"
        }));
    }

    // 2. L'email ne doit pas déjà avoir un compte
    match Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Email already registered"
            }));
        }
        Ok(None) => {}
        Err(e) => return internal_error("OTP user lookup failed", e),
    }

    // 3. Émettre le code (invalide les anciens codes de cet email)
    let otp = match issue_otp(db.get_ref(), &body.email).await {
        Ok(otp) => otp,
        Err(e) => return internal_error("Failed to issue OTP", e),
    };

    // 4. Envoyer par email: le code reste en BD même si l'envoi échoue,
    // l'inscription reste possible si le code parvient autrement
    if let Err(e) = mailer
        .send(&body.email, "Your OTP Code", &email::otp_email_html(&otp))
        .await
    {
        error!("Failed to send OTP: {}", e);
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "message": "Failed to send OTP"
        }));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": "OTP sent successfully"
    }))
}

/// POST /api/auth/register - Vérifier l'OTP et créer le compte (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Le code doit exister pour cet email et ne pas être expiré
    match find_valid_otp(db.get_ref(), &body.email, &body.otp).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invalid or expired OTP"
            }));
        }
        Err(e) => return internal_error("OTP lookup failed", e),
    }

    // 2. Email et username doivent être libres
    match Users::find()
        .filter(
            Condition::any()
                .add(UserColumn::Email.eq(&body.email))
                .add(UserColumn::Username.eq(&body.username)),
        )
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Email or username already exists"
            }));
        }
        Ok(None) => {}
        Err(e) => return internal_error("Registration lookup failed", e),
    }

    // 3. Résoudre l'état choisi
    let state = match States::find_by_id(body.state).one(db.get_ref()).await {
        Ok(Some(state)) => state,
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Selected state is invalid"
            }));
        }
        Err(e) => return internal_error("State lookup failed", e),
    };

    // 4. Hash du mot de passe
    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => return internal_error("Failed to hash password", e),
    };

    // 5. Créer l'utilisateur avec les exigences de l'état dénormalisées
    let new_user = UserActiveModel {
        first_name: Set(body.first_name.clone()),
        last_name: Set(body.last_name.clone()),
        email: Set(body.email.clone()),
        username: Set(body.username.clone()),
        password_hash: Set(password_hash),
        state_id: Set(state.id),
        min_credits_required: Set(state.min_credits_required),
        hours_per_credit: Set(state.hours_per_credit),
        is_subscribed: Set(false),
        trial_ends_at: Set(Some(Utc::now() + Duration::days(TRIAL_DAYS))),
        ..Default::default()
    };

    if let Err(e) = new_user.insert(db.get_ref()).await {
        // Deux inscriptions simultanées: la contrainte d'unicité tranche,
        // le perdant reçoit la même réponse que pour un doublon ordinaire
        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Email or username already exists"
            }));
        }
        return internal_error("Failed to create user", e);
    }

    // 6. Purger tous les codes de cet email (tentatives abandonnées incluses)
    // Le compte est déjà créé: un échec de nettoyage ne doit pas faire échouer
    if let Err(e) = Otps::delete_many()
        .filter(otps::Column::Email.eq(&body.email))
        .exec(db.get_ref())
        .await
    {
        error!("OTP cleanup failed: {}", e);
    }

    HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully"
    }))
}

/// POST /api/auth/find-user-email - Retrouver l'email depuis le username (PUBLIC)
/// Première étape du flow de reset password
#[post("/find-user-email")]
pub async fn find_user_email(
    body: web::Json<FindEmailRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let needle = body.username_or_email.trim();
    if needle.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Username or email is required."
        }));
    }

    match Users::find()
        .filter(
            Condition::any()
                .add(UserColumn::Email.eq(needle))
                .add(UserColumn::Username.eq(needle)),
        )
        .one(db.get_ref())
        .await
    {
        Ok(Some(user)) => HttpResponse::Ok().json(serde_json::json!({ "email": user.email })),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "message": "User not found."
        })),
        Err(e) => internal_error("User email lookup failed", e),
    }
}

/// POST /api/auth/verify-reset-otp - Vérifier le code de reset (PUBLIC)
#[post("/verify-reset-otp")]
pub async fn verify_reset_otp(
    body: web::Json<VerifyResetOtpRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match find_valid_otp(db.get_ref(), &body.email, &body.otp).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invalid or expired OTP."
            }));
        }
        Err(e) => return internal_error("Reset OTP lookup failed", e),
    }

    // Usage unique: le code est consommé dès la vérification
    if let Err(e) = Otps::delete_many()
        .filter(otps::Column::Email.eq(&body.email))
        .exec(db.get_ref())
        .await
    {
        return internal_error("Reset OTP cleanup failed", e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": "OTP verified."
    }))
}

/// POST /api/auth/reset-password - Changer le mot de passe après OTP (PUBLIC)
#[post("/reset-password")]
pub async fn reset_password(
    body: web::Json<ResetPasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Politique de mot de passe
    if !password::validate_password(&body.new_password) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Password does not meet security requirements."
        }));
    }

    // 2. Le compte doit exister
    let user = match Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "message": "User not found."
            }));
        }
        Err(e) => return internal_error("Reset password lookup failed", e),
    };

    // 3. Re-hash et sauvegarde
    let password_hash = match password::hash_password(&body.new_password) {
        Ok(hash) => hash,
        Err(e) => return internal_error("Failed to hash password", e),
    };

    let mut active_model: UserActiveModel = user.into();
    active_model.password_hash = Set(password_hash);

    match active_model.update(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Password reset successful."
        })),
        Err(e) => internal_error("Failed to update password", e),
    }
}

/// POST /api/auth/send-reset-otp - Envoyer un code de reset (PUBLIC)
#[post("/send-reset-otp")]
pub async fn send_reset_otp(
    body: web::Json<SendOtpRequest>,
    db: web::Data<DatabaseConnection>,
    mailer: web::Data<dyn EmailSender>,
) -> HttpResponse {
    if !body.email.contains('@') {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invalid email"
        }));
    }

    // Asymétrie assumée avec l'inscription: le reset exige un compte
    // existant et révèle donc son existence
    match Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Email not found."
            }));
        }
        Err(e) => return internal_error("Reset OTP user lookup failed", e),
    }

    let otp = match issue_otp(db.get_ref(), &body.email).await {
        Ok(otp) => otp,
        Err(e) => return internal_error("Failed to issue reset OTP", e),
    };

    if let Err(e) = mailer
        .send(
            &body.email,
            "Your Password Reset OTP Code",
            &email::reset_otp_email_html(&otp),
        )
        .await
    {
        error!("Error sending reset OTP: {}", e);
        return HttpResponse::InternalServerError().json(serde_json::json!({
            "message": "Failed to send OTP"
        }));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": "OTP sent successfully"
    }))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(login)
            .service(logout)
            .service(me)
            .service(send_otp)
            .service(register)
            .service(find_user_email)
            .service(verify_reset_otp)
            .service(reset_password)
            .service(send_reset_otp),
    );
}
