use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::{AuthUser, RequestMeta};
use crate::models::dto::{ImageUploadRequest, PageQuery, TradeRequest};
use crate::services::csv_service::CsvService;
use crate::services::storage::FileStorage;
use crate::services::trade_service::TradeService;

#[get("")]
pub async fn list_trades(
    auth_user: AuthUser,
    query: web::Query<PageQuery>,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let page = TradeService::list(db.get_ref(), auth_user.user_id, query.page(), config.per_page_trades).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("")]
pub async fn create_trade(
    req: HttpRequest,
    auth_user: AuthUser,
    body: web::Json<TradeRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let written = TradeService::create(
        db.get_ref(),
        auth_user.user_id,
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Created().json(written))
}

/// GET /trades/export - Tous les trades de l'utilisateur en CSV
#[get("/export")]
pub async fn export_trades(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let content = CsvService::export(db.get_ref(), auth_user.user_id).await?;
    let filename = format!("trades_export_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(content))
}

/// POST /trades/import - Corps = contenu CSV brut
#[post("/import")]
pub async fn import_trades(
    req: HttpRequest,
    auth_user: AuthUser,
    body: String,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("No file selected.".to_string()));
    }
    let report = CsvService::import(db.get_ref(), auth_user.user_id, &body, &RequestMeta::from_http(&req)).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[get("/{id}")]
pub async fn get_trade(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let trade = TradeService::get(db.get_ref(), auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(trade))
}

#[put("/{id}")]
pub async fn update_trade(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TradeRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let written = TradeService::update(
        db.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Ok().json(written))
}

#[delete("/{id}")]
pub async fn delete_trade(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    TradeService::delete(
        db.get_ref(),
        &storage,
        auth_user.user_id,
        path.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/images")]
pub async fn add_trade_image(
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<ImageUploadRequest>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let image = TradeService::add_image(db.get_ref(), &storage, auth_user.user_id, path.into_inner(), &body).await?;
    Ok(HttpResponse::Created().json(image))
}

#[delete("/{id}/images/{image_id}")]
pub async fn delete_trade_image(
    auth_user: AuthUser,
    path: web::Path<(i32, i32)>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    let (trade_id, image_id) = path.into_inner();
    TradeService::delete_image(db.get_ref(), &storage, auth_user.user_id, trade_id, image_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn trade_routes(cfg: &mut web::ServiceConfig) {
    // /export avant /{id}
    cfg.service(
        web::scope("/trades")
            .service(list_trades)
            .service(create_trade)
            .service(export_trades)
            .service(import_trades)
            .service(get_trade)
            .service(update_trade)
            .service(delete_trade)
            .service(add_trade_image)
            .service(delete_trade_image),
    );
}
