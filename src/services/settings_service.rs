use sea_orm::*;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::middleware::RequestMeta;
use crate::models::settings::{self, DEFAULT_THEME, THEMES};
use crate::services::activity_service::ActivityService;

fn validate_theme(value: &str) -> Result<(), ValidationError> {
    if THEMES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("theme").with_message("Not a valid choice.".into()))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SettingsRequest {
    #[validate(custom(function = "validate_theme"))]
    pub theme: String,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[validate(range(min = 1, max = 100))]
    pub items_per_page: i32,
    #[validate(length(min = 2, max = 10))]
    pub language: String,
}

pub struct SettingsService;

impl SettingsService {
    pub fn defaults(user_id: i32) -> settings::ActiveModel {
        settings::ActiveModel {
            user_id: Set(user_id),
            theme: Set(DEFAULT_THEME.to_string()),
            notifications_enabled: Set(true),
            items_per_page: Set(10),
            language: Set("en".to_string()),
            created_at: Set(super::now()),
            ..Default::default()
        }
    }

    /// Paramètres de l'utilisateur, créés avec les valeurs par défaut au premier accès
    pub async fn get_or_create<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<settings::Model, DbErr> {
        let existing = settings::Entity::find()
            .filter(settings::Column::UserId.eq(user_id))
            .one(db)
            .await?;
        match existing {
            Some(s) => Ok(s),
            None => Self::defaults(user_id).insert(db).await,
        }
    }

    pub async fn update(
        db: &DatabaseConnection,
        user_id: i32,
        request: SettingsRequest,
        meta: &RequestMeta,
    ) -> Result<settings::Model, DbErr> {
        let txn = db.begin().await?;

        let current = Self::get_or_create(&txn, user_id).await?;
        let mut active: settings::ActiveModel = current.into();
        active.theme = Set(request.theme);
        active.notifications_enabled = Set(request.notifications_enabled);
        active.items_per_page = Set(request.items_per_page);
        active.language = Set(request.language);
        active.updated_at = Set(Some(super::now()));
        let updated = active.update(&txn).await?;

        ActivityService::record(&txn, user_id, "settings_update", None, meta, None).await?;
        txn.commit().await?;

        tracing::info!(user_id, "settings updated");
        Ok(updated)
    }
}
