use actix_web::{HttpRequest, HttpResponse, get, put, web};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, RequestMeta};
use crate::services::settings_service::{SettingsRequest, SettingsService};

#[get("/settings")]
pub async fn get_settings(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let settings = SettingsService::get_or_create(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[put("/settings")]
pub async fn update_settings(
    req: HttpRequest,
    auth_user: AuthUser,
    body: web::Json<SettingsRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let settings =
        SettingsService::update(db.get_ref(), auth_user.user_id, body.into_inner(), &RequestMeta::from_http(&req))
            .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Your settings have been updated.",
        "settings": settings,
    })))
}
