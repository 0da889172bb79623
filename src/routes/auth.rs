use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::{AuthUser, RequestMeta};
use crate::models::dto::ImageUploadRequest;
use crate::models::users::UserRole;
use crate::services::mailer::Mailer;
use crate::services::storage::FileStorage;
use crate::services::user_service::{ProfileUpdate, UserService};
use crate::utils::jwt;

// DTO pour l'inscription
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 25, message = "Username must be between 3 and 25 characters."))]
    pub username: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match."))]
    pub confirm_password: String,
}

// DTO pour la connexion
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// DTO pour changer le mot de passe
#[derive(Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords must match."))]
    pub confirm_new_password: String,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match."))]
    pub confirm_password: String,
}

#[derive(Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct ApiKeyRequest {
    #[validate(length(min = 1, max = 100, message = "Key name is required (max 100 characters)."))]
    pub name: String,
    #[validate(range(min = 1, max = 365))]
    pub expires_in_days: Option<i64>,
}

// Réponse après login
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
}

fn message(text: &str) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": text }))
}

/// POST /auth/register - Créer un compte (PUBLIC)
#[post("/register")]
pub async fn register(
    req: HttpRequest,
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let user = UserService::register(
        db.get_ref(),
        &config,
        mailer.get_ref(),
        &body.username,
        &body.email,
        &body.password,
        &RequestMeta::from_http(&req),
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Registration successful! A verification email has been sent. Please check your inbox.",
        "user": user,
    })))
}

/// POST /auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let user = UserService::login(db.get_ref(), &body.username, &body.password, &RequestMeta::from_http(&req)).await?;
    let token = jwt::generate_token(user.id, &user.username, user.role, &config.jwt_secret, config.jwt_ttl_hours)
        .map_err(AppError::Internal)?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// GET /auth/me - Utilisateur courant (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let user = UserService::find_by_id(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// POST /auth/change-password - Changer son mot de passe (PROTÉGÉE)
#[post("/change-password")]
pub async fn change_password(
    req: HttpRequest,
    auth_user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    UserService::change_password(
        db.get_ref(),
        auth_user.user_id,
        &body.current_password,
        &body.new_password,
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(message("Your password has been updated."))
}

/// GET /auth/verify-email?token= (PUBLIC)
#[get("/verify-email")]
pub async fn verify_email(
    req: HttpRequest,
    query: web::Query<TokenQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    UserService::verify_email(db.get_ref(), &query.token, &RequestMeta::from_http(&req)).await?;
    Ok(message("Your email has been verified! You can now log in."))
}

/// POST /auth/resend-verification (PUBLIC, ne révèle pas si le compte existe)
#[post("/resend-verification")]
pub async fn resend_verification(
    body: web::Json<EmailRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    UserService::resend_verification(db.get_ref(), &config, mailer.get_ref(), &body.email).await?;
    Ok(message(
        "If an account with that email exists and is not verified, a new verification link has been sent.",
    ))
}

/// POST /auth/forgot-password (PUBLIC)
#[post("/forgot-password")]
pub async fn forgot_password(
    body: web::Json<EmailRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    UserService::forgot_password(db.get_ref(), &config, mailer.get_ref(), &body.email).await?;
    Ok(message(
        "If an account with that email exists, instructions to reset your password have been sent.",
    ))
}

/// POST /auth/reset-password (PUBLIC)
#[post("/reset-password")]
pub async fn reset_password(
    req: HttpRequest,
    body: web::Json<ResetPasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    UserService::reset_password(db.get_ref(), &body.token, &body.password, &RequestMeta::from_http(&req)).await?;
    Ok(message("Your password has been updated! You are now able to log in."))
}

#[get("/profile")]
pub async fn get_profile(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let user = UserService::find_by_id(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[put("/profile")]
pub async fn update_profile(
    req: HttpRequest,
    auth_user: AuthUser,
    body: web::Json<ProfileRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let body = body.into_inner();
    let (user, email_changed) = UserService::update_profile(
        db.get_ref(),
        &config,
        mailer.get_ref(),
        auth_user.user_id,
        ProfileUpdate {
            name: body.name,
            email: body.email,
            bio: body.bio,
        },
        &RequestMeta::from_http(&req),
    )
    .await?;

    let text = if email_changed {
        "Your profile has been updated. Please verify your new email address."
    } else {
        "Your profile has been updated."
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": text, "user": user })))
}

#[post("/profile/picture")]
pub async fn upload_profile_picture(
    auth_user: AuthUser,
    body: web::Json<ImageUploadRequest>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let user = UserService::set_profile_picture(
        db.get_ref(),
        &storage,
        auth_user.user_id,
        &body.filename,
        &body.content_base64,
    )
    .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/api-keys")]
pub async fn list_api_keys(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let keys = UserService::list_api_keys(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(keys))
}

#[post("/api-keys")]
pub async fn create_api_key(
    req: HttpRequest,
    auth_user: AuthUser,
    body: web::Json<ApiKeyRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let key = UserService::create_api_key(
        db.get_ref(),
        auth_user.user_id,
        &body.name,
        body.expires_in_days,
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Created().json(key))
}

#[delete("/api-keys/{id}")]
pub async fn delete_api_key(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    UserService::delete_api_key(db.get_ref(), auth_user.user_id, path.into_inner(), &RequestMeta::from_http(&req))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(me)
            .service(change_password)
            .service(verify_email)
            .service(resend_verification)
            .service(forgot_password)
            .service(reset_password)
            .service(get_profile)
            .service(update_profile)
            .service(upload_profile_picture)
            .service(list_api_keys)
            .service(create_api_key)
            .service(delete_api_key),
    );
}
