use sea_orm::*;
use serde::Serialize;

use crate::models::{account_setting, activity, trade};
use crate::services::activity_service::ActivityService;
use crate::services::trade_service::TradeService;

const RECENT_ACTIVITY_LIMIT: u64 = 10;

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_trades: u64,
    pub cumulative_gross_pnl: f64,
    pub current_account_size: Option<String>,
    pub recent_activities: Vec<activity::Model>,
}

pub struct DashboardService;

impl DashboardService {
    pub async fn account_size<C: ConnectionTrait>(db: &C) -> Result<Option<String>, DbErr> {
        let setting = account_setting::Entity::find()
            .filter(account_setting::Column::SettingName.eq(account_setting::CURRENT_ACCOUNT_SIZE))
            .one(db)
            .await?;
        Ok(setting.and_then(|s| s.value_str))
    }

    pub async fn summary(db: &DatabaseConnection, user_id: i32) -> Result<DashboardSummary, DbErr> {
        let trades = trade::Entity::find()
            .filter(trade::Column::UserId.eq(user_id))
            .all(db)
            .await?;
        let total_trades = trades.len() as u64;
        let cumulative_gross_pnl = TradeService::with_details(db, trades)
            .await?
            .iter()
            .map(|t| t.metrics.gross_pnl)
            .sum();

        Ok(DashboardSummary {
            total_trades,
            cumulative_gross_pnl,
            current_account_size: Self::account_size(db).await?,
            recent_activities: ActivityService::recent(db, user_id, RECENT_ACTIVITY_LIMIT).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::RequestMeta;
    use crate::models::trade::Direction;
    use crate::models::users::UserRole;
    use crate::test_utils::{create_user, setup_test_db, trade_request};

    #[actix_web::test]
    async fn summary_adds_up_pnl_and_reads_account_size() {
        let db = setup_test_db().await;
        let user = create_user(&db, "dash", UserRole::User).await;
        let meta = RequestMeta::default();
        TradeService::create(&db, user.id, trade_request(Direction::Long), &meta).await.unwrap();
        TradeService::create(&db, user.id, trade_request(Direction::Short), &meta).await.unwrap();
        TradeService::create(&db, user.id, trade_request(Direction::Long), &meta).await.unwrap();

        let summary = DashboardService::summary(&db, user.id).await.unwrap();

        assert_eq!(summary.total_trades, 3);
        assert!((summary.cumulative_gross_pnl - 200.0).abs() < 1e-9);
        assert_eq!(summary.current_account_size.as_deref(), Some("100000"));
        assert_eq!(summary.recent_activities.len(), 3);
        assert_eq!(summary.recent_activities[0].action, "trade_logged");
    }
}
