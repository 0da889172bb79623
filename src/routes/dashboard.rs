use actix_web::{HttpResponse, get, web};
use sea_orm::DatabaseConnection;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::dashboard_service::DashboardService;

#[get("/dashboard")]
pub async fn dashboard(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let summary = DashboardService::summary(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}
