use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::{AdminUser, RequestMeta};
use crate::models::dto::PageQuery;
use crate::services::admin_service::{AdminCreateUserRequest, AdminService, AdminUpdateUserRequest};
use crate::services::mailer::Mailer;
use crate::services::storage::FileStorage;
use crate::services::user_service::UserService;

// Les ids restent bruts: chaque entrée invalide est signalée individuellement
#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub user_ids: Vec<serde_json::Value>,
}

/// GET /admin/dashboard - Compteurs d'utilisateurs
#[get("/dashboard")]
pub async fn dashboard(_admin: AdminUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(AdminService::counts(db.get_ref()).await?))
}

#[get("/users")]
pub async fn list_users(
    _admin: AdminUser,
    query: web::Query<PageQuery>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let page = AdminService::list_users(db.get_ref(), query.page(), config.items_per_page).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/users")]
pub async fn create_user(
    req: HttpRequest,
    admin: AdminUser,
    body: web::Json<AdminCreateUserRequest>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    mailer: web::Data<dyn Mailer>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let admin = UserService::find_by_id(db.get_ref(), admin.0.user_id).await?;
    let created = AdminService::create_user(
        db.get_ref(),
        &config,
        mailer.get_ref(),
        &admin,
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Created().json(created))
}

#[put("/users/{id}")]
pub async fn update_user(
    req: HttpRequest,
    admin: AdminUser,
    path: web::Path<i32>,
    body: web::Json<AdminUpdateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let admin = UserService::find_by_id(db.get_ref(), admin.0.user_id).await?;
    let user = AdminService::update_user(
        db.get_ref(),
        &admin,
        path.into_inner(),
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/users/{id}")]
pub async fn delete_user(
    req: HttpRequest,
    admin: AdminUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    let admin = UserService::find_by_id(db.get_ref(), admin.0.user_id).await?;
    AdminService::delete_user(
        db.get_ref(),
        &storage,
        &admin,
        path.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /admin/users/bulk-delete - {"user_ids": [...]}
#[post("/users/bulk-delete")]
pub async fn bulk_delete_users(
    req: HttpRequest,
    admin: AdminUser,
    body: web::Json<BulkDeleteRequest>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    let admin = UserService::find_by_id(db.get_ref(), admin.0.user_id).await?;
    let report = AdminService::bulk_delete(
        db.get_ref(),
        &storage,
        &admin,
        &body.user_ids,
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    // bulk-delete avant /users/{id}
    cfg.service(
        web::scope("/admin")
            .service(dashboard)
            .service(list_users)
            .service(create_user)
            .service(bulk_delete_users)
            .service(update_user)
            .service(delete_user),
    );
}
