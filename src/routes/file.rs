use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, RequestMeta};
use crate::models::dto::{PageQuery, UploadRequest};
use crate::services::file_service::FileService;
use crate::services::settings_service::SettingsService;
use crate::services::storage::FileStorage;

/// GET /files - Pagination selon les paramètres de l'utilisateur
#[get("")]
pub async fn list_files(
    auth_user: AuthUser,
    query: web::Query<PageQuery>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let settings = SettingsService::get_or_create(db.get_ref(), auth_user.user_id).await?;
    let per_page = u64::try_from(settings.items_per_page).unwrap_or(10).max(1);
    let page = FileService::list(db.get_ref(), auth_user.user_id, query.page(), per_page).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("")]
pub async fn upload_file(
    req: HttpRequest,
    auth_user: AuthUser,
    body: web::Json<UploadRequest>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let info = FileService::upload(
        db.get_ref(),
        &storage,
        auth_user.user_id,
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Created().json(info))
}

#[get("/{id}")]
pub async fn file_metadata(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let info = FileService::metadata(db.get_ref(), auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(info))
}

#[get("/{id}/download")]
pub async fn download_file(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    let (file, bytes) = FileService::download(db.get_ref(), &storage, auth_user.user_id, path.into_inner()).await?;
    let mime = file
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(HttpResponse::Ok()
        .content_type(mime)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file.filename)],
        })
        .body(bytes))
}

#[delete("/{id}")]
pub async fn delete_file(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    FileService::delete(
        db.get_ref(),
        &storage,
        auth_user.user_id,
        auth_user.role.is_admin(),
        path.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn file_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/files")
            .service(list_files)
            .service(upload_file)
            .service(file_metadata)
            .service(download_file)
            .service(delete_file),
    );
}
