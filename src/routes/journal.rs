use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, RequestMeta};
use crate::models::dto::ImageUploadRequest;
use crate::models::journal_dto::{
    DailyJournalRequest, MonthlyJournalRequest, QuarterlyJournalRequest, WeeklyJournalRequest,
    YearlyJournalRequest,
};
use crate::services::journal_service::{JournalService, Saved};
use crate::services::storage::FileStorage;

/// 201 à la création, 200 à la mise à jour
fn saved_response<T: Serialize>(saved: Saved<T>) -> HttpResponse {
    if saved.created {
        HttpResponse::Created().json(saved)
    } else {
        HttpResponse::Ok().json(saved)
    }
}

// ----------------------------------------------------------------------------
// Quotidien
// ----------------------------------------------------------------------------

#[get("/daily")]
pub async fn list_daily(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(JournalService::list_daily(db.get_ref(), auth_user.user_id).await?))
}

#[get("/daily/{date}")]
pub async fn get_daily(
    auth_user: AuthUser,
    path: web::Path<NaiveDate>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let view = JournalService::daily_view(db.get_ref(), auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[put("/daily/{date}")]
pub async fn save_daily(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<NaiveDate>,
    body: web::Json<DailyJournalRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let saved = JournalService::save_daily(
        db.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(saved_response(saved))
}

#[delete("/daily/{date}")]
pub async fn delete_daily(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<NaiveDate>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    JournalService::delete_daily(
        db.get_ref(),
        &storage,
        auth_user.user_id,
        path.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/daily/{date}/images")]
pub async fn add_daily_image(
    auth_user: AuthUser,
    path: web::Path<NaiveDate>,
    body: web::Json<ImageUploadRequest>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let image =
        JournalService::add_daily_image(db.get_ref(), &storage, auth_user.user_id, path.into_inner(), &body).await?;
    Ok(HttpResponse::Created().json(image))
}

#[delete("/daily/{date}/images/{image_id}")]
pub async fn delete_daily_image(
    auth_user: AuthUser,
    path: web::Path<(NaiveDate, i32)>,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<FileStorage>,
) -> Result<HttpResponse, AppError> {
    let (date, image_id) = path.into_inner();
    JournalService::delete_daily_image(db.get_ref(), &storage, auth_user.user_id, date, image_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ----------------------------------------------------------------------------
// Hebdomadaire
// ----------------------------------------------------------------------------

#[get("/weekly")]
pub async fn list_weekly(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(JournalService::list_weekly(db.get_ref(), auth_user.user_id).await?))
}

#[get("/weekly/{year}/{week}")]
pub async fn get_weekly(
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, week) = path.into_inner();
    let view = JournalService::weekly_view(db.get_ref(), auth_user.user_id, year, week).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[put("/weekly/{year}/{week}")]
pub async fn save_weekly(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    body: web::Json<WeeklyJournalRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, week) = path.into_inner();
    let saved = JournalService::save_weekly(
        db.get_ref(),
        auth_user.user_id,
        year,
        week,
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(saved_response(saved))
}

#[delete("/weekly/{year}/{week}")]
pub async fn delete_weekly(
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, week) = path.into_inner();
    JournalService::delete_weekly(db.get_ref(), auth_user.user_id, year, week).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ----------------------------------------------------------------------------
// Mensuel
// ----------------------------------------------------------------------------

#[get("/monthly")]
pub async fn list_monthly(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(JournalService::list_monthly(db.get_ref(), auth_user.user_id).await?))
}

#[get("/monthly/{year}/{month}")]
pub async fn get_monthly(
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, month) = path.into_inner();
    let view = JournalService::monthly_view(db.get_ref(), auth_user.user_id, year, month).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[put("/monthly/{year}/{month}")]
pub async fn save_monthly(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    body: web::Json<MonthlyJournalRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, month) = path.into_inner();
    let saved = JournalService::save_monthly(
        db.get_ref(),
        auth_user.user_id,
        year,
        month,
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(saved_response(saved))
}

#[delete("/monthly/{year}/{month}")]
pub async fn delete_monthly(
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, month) = path.into_inner();
    JournalService::delete_monthly(db.get_ref(), auth_user.user_id, year, month).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ----------------------------------------------------------------------------
// Trimestriel
// ----------------------------------------------------------------------------

#[get("/quarterly")]
pub async fn list_quarterly(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(JournalService::list_quarterly(db.get_ref(), auth_user.user_id).await?))
}

#[get("/quarterly/{year}/{quarter}")]
pub async fn get_quarterly(
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, quarter) = path.into_inner();
    let view = JournalService::quarterly_view(db.get_ref(), auth_user.user_id, year, quarter).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[put("/quarterly/{year}/{quarter}")]
pub async fn save_quarterly(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    body: web::Json<QuarterlyJournalRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, quarter) = path.into_inner();
    let saved = JournalService::save_quarterly(
        db.get_ref(),
        auth_user.user_id,
        year,
        quarter,
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(saved_response(saved))
}

#[delete("/quarterly/{year}/{quarter}")]
pub async fn delete_quarterly(
    auth_user: AuthUser,
    path: web::Path<(i32, u32)>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let (year, quarter) = path.into_inner();
    JournalService::delete_quarterly(db.get_ref(), auth_user.user_id, year, quarter).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ----------------------------------------------------------------------------
// Annuel
// ----------------------------------------------------------------------------

#[get("/yearly")]
pub async fn list_yearly(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(JournalService::list_yearly(db.get_ref(), auth_user.user_id).await?))
}

#[get("/yearly/{year}")]
pub async fn get_yearly(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let view = JournalService::yearly_view(db.get_ref(), auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[put("/yearly/{year}")]
pub async fn save_yearly(
    req: HttpRequest,
    auth_user: AuthUser,
    path: web::Path<i32>,
    body: web::Json<YearlyJournalRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let saved = JournalService::save_yearly(
        db.get_ref(),
        auth_user.user_id,
        path.into_inner(),
        body.into_inner(),
        &RequestMeta::from_http(&req),
    )
    .await?;
    Ok(saved_response(saved))
}

#[delete("/yearly/{year}")]
pub async fn delete_yearly(
    auth_user: AuthUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    JournalService::delete_yearly(db.get_ref(), auth_user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn journal_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/journal")
            .service(list_daily)
            .service(get_daily)
            .service(save_daily)
            .service(delete_daily)
            .service(add_daily_image)
            .service(delete_daily_image)
            .service(list_weekly)
            .service(get_weekly)
            .service(save_weekly)
            .service(delete_weekly)
            .service(list_monthly)
            .service(get_monthly)
            .service(save_monthly)
            .service(delete_monthly)
            .service(list_quarterly)
            .service(get_quarterly)
            .service(save_quarterly)
            .service(delete_quarterly)
            .service(list_yearly)
            .service(get_yearly)
            .service(save_yearly)
            .service(delete_yearly),
    );
}
