use sea_orm::*;

use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::dto::TradingModelRequest;
use crate::models::{trade, trading_model};
use crate::services::activity_service::{ActivityService, Resource};

pub struct TradingModelService;

impl TradingModelService {
    pub async fn list(db: &DatabaseConnection, user_id: i32) -> Result<Vec<trading_model::Model>, DbErr> {
        trading_model::Entity::find()
            .filter(trading_model::Column::UserId.eq(user_id))
            .order_by_asc(trading_model::Column::Name)
            .all(db)
            .await
    }

    pub async fn find_owned<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        model_id: i32,
    ) -> Result<trading_model::Model, AppError> {
        trading_model::Entity::find_by_id(model_id)
            .filter(trading_model::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Trading model"))
    }

    async fn ensure_name_free<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        name: &str,
        except_id: Option<i32>,
    ) -> Result<(), AppError> {
        let clash = trading_model::Entity::find()
            .filter(trading_model::Column::UserId.eq(user_id))
            .filter(trading_model::Column::Name.eq(name))
            .one(db)
            .await?;
        match clash {
            Some(existing) if Some(existing.id) != except_id => Err(AppError::Conflict(format!(
                "A trading model named '{}' already exists.",
                name
            ))),
            _ => Ok(()),
        }
    }

    fn apply(active: &mut trading_model::ActiveModel, r: TradingModelRequest) {
        use super::non_empty as ne;

        active.name = Set(r.name.trim().to_string());
        active.version = Set(ne(r.version));
        active.is_active = Set(r.is_active);
        active.overview_logic = Set(ne(r.overview_logic));
        active.primary_chart_tf = Set(ne(r.primary_chart_tf));
        active.execution_chart_tf = Set(ne(r.execution_chart_tf));
        active.context_chart_tf = Set(ne(r.context_chart_tf));
        active.technical_indicators_used = Set(ne(r.technical_indicators_used));
        active.chart_patterns_used = Set(ne(r.chart_patterns_used));
        active.price_action_signals = Set(ne(r.price_action_signals));
        active.key_levels_identification = Set(ne(r.key_levels_identification));
        active.volume_analysis_notes = Set(ne(r.volume_analysis_notes));
        active.fundamental_analysis_notes = Set(ne(r.fundamental_analysis_notes));
        active.instrument_applicability = Set(ne(r.instrument_applicability));
        active.session_applicability = Set(ne(r.session_applicability));
        active.optimal_market_conditions = Set(ne(r.optimal_market_conditions));
        active.sub_optimal_market_conditions = Set(ne(r.sub_optimal_market_conditions));
        active.entry_trigger_description = Set(ne(Some(r.entry_trigger_description)));
        active.stop_loss_strategy = Set(ne(Some(r.stop_loss_strategy)));
        active.take_profit_strategy = Set(ne(Some(r.take_profit_strategy)));
        active.min_risk_reward_ratio = Set(r.min_risk_reward_ratio);
        active.position_sizing_rules = Set(ne(r.position_sizing_rules));
        active.scaling_in_out_rules = Set(ne(r.scaling_in_out_rules));
        active.trade_management_breakeven_rules = Set(ne(r.trade_management_breakeven_rules));
        active.trade_management_trailing_stop_rules = Set(ne(r.trade_management_trailing_stop_rules));
        active.trade_management_partial_profit_rules = Set(ne(r.trade_management_partial_profit_rules));
        active.trade_management_adverse_price_action = Set(ne(r.trade_management_adverse_price_action));
        active.model_max_loss_per_trade = Set(ne(r.model_max_loss_per_trade));
        active.model_max_daily_loss = Set(ne(r.model_max_daily_loss));
        active.model_max_weekly_loss = Set(ne(r.model_max_weekly_loss));
        active.model_consecutive_loss_limit = Set(ne(r.model_consecutive_loss_limit));
        active.model_action_on_max_drawdown = Set(ne(r.model_action_on_max_drawdown));
        active.pre_trade_checklist = Set(ne(r.pre_trade_checklist));
        active.order_types_used = Set(ne(r.order_types_used));
        active.broker_platform_notes = Set(ne(r.broker_platform_notes));
        active.execution_confirmation_notes = Set(ne(r.execution_confirmation_notes));
        active.post_trade_routine_model = Set(ne(r.post_trade_routine_model));
        active.strengths = Set(ne(r.strengths));
        active.weaknesses = Set(ne(r.weaknesses));
        active.backtesting_forwardtesting_notes = Set(ne(r.backtesting_forwardtesting_notes));
        active.refinements_learnings = Set(ne(r.refinements_learnings));
        active.updated_at = Set(super::now());
    }

    pub async fn create(
        db: &DatabaseConnection,
        user_id: i32,
        request: TradingModelRequest,
        meta: &RequestMeta,
    ) -> Result<trading_model::Model, AppError> {
        let txn = db.begin().await?;
        Self::ensure_name_free(&txn, user_id, request.name.trim(), None).await?;

        let mut active = trading_model::ActiveModel {
            user_id: Set(user_id),
            created_at: Set(super::now()),
            ..Default::default()
        };
        Self::apply(&mut active, request);
        let model = active.insert(&txn).await?;

        ActivityService::record(
            &txn,
            user_id,
            "trading_model_create",
            Some(model.name.clone()),
            meta,
            Some(Resource { id: model.id, kind: "TradingModel" }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(user_id, model_id = model.id, "trading model created");
        Ok(model)
    }

    pub async fn update(
        db: &DatabaseConnection,
        user_id: i32,
        model_id: i32,
        request: TradingModelRequest,
        meta: &RequestMeta,
    ) -> Result<trading_model::Model, AppError> {
        let txn = db.begin().await?;
        let existing = Self::find_owned(&txn, user_id, model_id).await?;
        Self::ensure_name_free(&txn, user_id, request.name.trim(), Some(model_id)).await?;

        let mut active: trading_model::ActiveModel = existing.into();
        Self::apply(&mut active, request);
        let model = active.update(&txn).await?;

        ActivityService::record(
            &txn,
            user_id,
            "trading_model_update",
            Some(model.name.clone()),
            meta,
            Some(Resource { id: model.id, kind: "TradingModel" }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(user_id, model_id, "trading model updated");
        Ok(model)
    }

    /// Refusé tant qu'un trade référence le modèle
    pub async fn delete(
        db: &DatabaseConnection,
        user_id: i32,
        model_id: i32,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let txn = db.begin().await?;
        let model = Self::find_owned(&txn, user_id, model_id).await?;

        let linked_trades = trade::Entity::find()
            .filter(trade::Column::TradingModelId.eq(model_id))
            .count(&txn)
            .await?;
        if linked_trades > 0 {
            tracing::warn!(user_id, model_id, linked_trades, "trading model still in use");
            return Err(AppError::Conflict(format!(
                "Cannot delete model '{}' as it is associated with {} trade(s).",
                model.name, linked_trades
            )));
        }

        let name = model.name.clone();
        model.delete(&txn).await?;
        ActivityService::record(
            &txn,
            user_id,
            "trading_model_delete",
            Some(name),
            meta,
            Some(Resource { id: model_id, kind: "TradingModel" }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(user_id, model_id, "trading model deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trade::Direction;
    use crate::models::users::UserRole;
    use crate::services::trade_service::TradeService;
    use crate::test_utils::{create_user, setup_test_db, trade_request, trading_model_request};

    #[actix_web::test]
    async fn names_are_unique_per_user() {
        let db = setup_test_db().await;
        let meta = RequestMeta::default();
        let alice = create_user(&db, "alice", UserRole::User).await;
        let bob = create_user(&db, "bob", UserRole::User).await;

        TradingModelService::create(&db, alice.id, trading_model_request("ORB"), &meta).await.unwrap();
        let clash = TradingModelService::create(&db, alice.id, trading_model_request("ORB"), &meta).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        // même nom chez un autre utilisateur: autorisé
        TradingModelService::create(&db, bob.id, trading_model_request("ORB"), &meta).await.unwrap();
    }

    #[actix_web::test]
    async fn rename_into_existing_name_conflicts() {
        let db = setup_test_db().await;
        let meta = RequestMeta::default();
        let user = create_user(&db, "renamer", UserRole::User).await;
        TradingModelService::create(&db, user.id, trading_model_request("A"), &meta).await.unwrap();
        let b = TradingModelService::create(&db, user.id, trading_model_request("B"), &meta).await.unwrap();

        let result = TradingModelService::update(&db, user.id, b.id, trading_model_request("A"), &meta).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let same = TradingModelService::update(&db, user.id, b.id, trading_model_request("B"), &meta).await;
        assert!(same.is_ok());
    }

    #[actix_web::test]
    async fn model_in_use_cannot_be_deleted() {
        let db = setup_test_db().await;
        let meta = RequestMeta::default();
        let user = create_user(&db, "modeler", UserRole::User).await;
        let model = TradingModelService::create(&db, user.id, trading_model_request("Trend"), &meta)
            .await
            .unwrap();

        let mut request = trade_request(Direction::Long);
        request.trading_model_id = Some(model.id);
        let trade = TradeService::create(&db, user.id, request, &meta).await.unwrap().trade;

        let refused = TradingModelService::delete(&db, user.id, model.id, &meta).await;
        assert!(matches!(refused, Err(AppError::Conflict(_))));

        TradeService::delete(&db, &crate::test_utils::test_storage(&std::env::temp_dir()), user.id, trade.trade.id, &meta)
            .await
            .unwrap();
        TradingModelService::delete(&db, user.id, model.id, &meta).await.unwrap();
        assert!(TradingModelService::list(&db, user.id).await.unwrap().is_empty());
    }
}
