use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, RequestMeta};
use crate::models::dto::TradingModelRequest;
use crate::services::trading_model_service::TradingModelService;

#[get("")]
pub async fn list_models(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let models = TradingModelService::list(db.get_ref(), auth_user.user_id).await?;
    Ok(HttpResponse::Ok().json(models))
}

#[post("")]
pub async fn create_model(
    req: HttpRequest,
    auth_user: AuthUser,
    body: web::Json<TradingModelRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let model = TradingModelService::create(
        db.get_ref(),
        auth_user.user_id,
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Created().json(model))
}

#[get("/{id}")]
pub async fn get_model(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let model = TradingModelService::find_owned(db.get_ref(), auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(model))
}

#[put("/{id}")]
pub async fn update_model(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<TradingModelRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let model = TradingModelService::update(
        db.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::Ok().json(model))
}

#[delete("/{id}")]
pub async fn delete_model(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    TradingModelService::delete(db.get_ref(), auth_user.user_id, path.into_inner(), &RequestMeta::from_http(&req))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn trading_model_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/trading-models")
            .service(list_models)
            .service(create_model)
            .service(get_model)
            .service(update_model)
            .service(delete_model),
    );
}
