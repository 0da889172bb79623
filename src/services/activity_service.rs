use sea_orm::*;

use crate::middleware::RequestMeta;
use crate::models::activity;

/// Ressource touchée par une action (pour le journal d'audit)
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub id: i32,
    pub kind: &'a str,
}

pub struct ActivityService;

impl ActivityService {
    /// Ajoute une ligne au journal d'audit, dans la même unité de travail
    /// que l'opération qui l'a déclenchée
    pub async fn record<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        action: &str,
        details: Option<String>,
        meta: &RequestMeta,
        resource: Option<Resource<'_>>,
    ) -> Result<activity::Model, DbErr> {
        activity::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            details: Set(details),
            ip_address: Set(meta.ip_address.clone()),
            user_agent: Set(meta.user_agent.clone()),
            timestamp: Set(super::now()),
            resource_id: Set(resource.map(|r| r.id)),
            resource_type: Set(resource.map(|r| r.kind.to_string())),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn recent<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<activity::Model>, DbErr> {
        activity::Entity::find()
            .filter(activity::Column::UserId.eq(user_id))
            .order_by_desc(activity::Column::Timestamp)
            .order_by_desc(activity::Column::Id)
            .limit(limit)
            .all(db)
            .await
    }
}
