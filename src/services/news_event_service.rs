use chrono::NaiveTime;
use sea_orm::*;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::news_event_item;
use crate::services::activity_service::{ActivityService, Resource};
use crate::utils::serde_time;

#[derive(Debug, Deserialize, Validate)]
pub struct NewsEventRequest {
    #[validate(length(min = 1, max = 100, message = "Event name is required (max 100 characters)."))]
    pub name: String,
    #[serde(default, deserialize_with = "serde_time::option::deserialize")]
    pub default_release_time: Option<NaiveTime>,
}

pub struct NewsEventService;

impl NewsEventService {
    pub async fn list(db: &DatabaseConnection) -> Result<Vec<news_event_item::Model>, DbErr> {
        news_event_item::Entity::find()
            .order_by_asc(news_event_item::Column::Name)
            .all(db)
            .await
    }

    pub async fn create(
        db: &DatabaseConnection,
        editor_id: i32,
        request: NewsEventRequest,
        meta: &RequestMeta,
    ) -> Result<news_event_item::Model, AppError> {
        let name = request.name.trim().to_string();
        let txn = db.begin().await?;
        let existing = news_event_item::Entity::find()
            .filter(news_event_item::Column::Name.eq(name.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!("News event '{}' already exists.", name)));
        }

        let event = news_event_item::ActiveModel {
            name: Set(name),
            default_release_time: Set(request.default_release_time),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        ActivityService::record(
            &txn,
            editor_id,
            "news_event_create",
            Some(event.name.clone()),
            meta,
            Some(Resource { id: event.id, kind: "NewsEventItem" }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(editor_id, event_id = event.id, "news event created");
        Ok(event)
    }

    pub async fn delete(
        db: &DatabaseConnection,
        editor_id: i32,
        event_id: i32,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let txn = db.begin().await?;
        let event = news_event_item::Entity::find_by_id(event_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("News event"))?;
        let name = event.name.clone();
        event.delete(&txn).await?;
        ActivityService::record(
            &txn,
            editor_id,
            "news_event_delete",
            Some(name),
            meta,
            Some(Resource { id: event_id, kind: "NewsEventItem" }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(editor_id, event_id, "news event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::UserRole;
    use crate::test_utils::{create_user, setup_test_db};

    #[actix_web::test]
    async fn seeded_events_are_listed_and_names_unique() {
        let db = setup_test_db().await;
        let editor = create_user(&db, "editor", UserRole::Editor).await;
        let meta = RequestMeta::default();

        let seeded = NewsEventService::list(&db).await.unwrap();
        assert!(seeded.iter().any(|e| e.name == "CPI"));

        let created = NewsEventService::create(
            &db,
            editor.id,
            NewsEventRequest {
                name: "PPI".to_string(),
                default_release_time: NaiveTime::from_hms_opt(8, 30, 0),
            },
            &meta,
        )
        .await
        .unwrap();
        let again = NewsEventService::create(
            &db,
            editor.id,
            NewsEventRequest { name: " PPI ".to_string(), default_release_time: None },
            &meta,
        )
        .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        NewsEventService::delete(&db, editor.id, created.id, &meta).await.unwrap();
        assert_eq!(NewsEventService::list(&db).await.unwrap().len(), seeded.len());
    }
}
