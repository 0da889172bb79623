use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use sea_orm::DatabaseConnection;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{AuthUser, EditorUser, RequestMeta};
use crate::services::news_event_service::{NewsEventRequest, NewsEventService};

#[get("")]
pub async fn list_events(_user: AuthUser, db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(NewsEventService::list(db.get_ref()).await?))
}

/// POST /news-events - Éditeur ou admin
#[post("")]
pub async fn create_event(
    req: HttpRequest,
    editor: EditorUser,
    body: web::Json<NewsEventRequest>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;
    let event =
        NewsEventService::create(db.get_ref(), editor.0.user_id, body.into_inner(), &RequestMeta::from_http(&req))
            .await?;
    Ok(HttpResponse::Created().json(event))
}

#[delete("/{id}")]
pub async fn delete_event(
    req: HttpRequest,
    editor: EditorUser,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    NewsEventService::delete(db.get_ref(), editor.0.user_id, path.into_inner(), &RequestMeta::from_http(&req)).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn news_event_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/news-events")
            .service(list_events)
            .service(create_event)
            .service(delete_event),
    );
}
