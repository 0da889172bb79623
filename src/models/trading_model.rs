// ============================================================================
// MODÈLE : TRADING MODEL
// ============================================================================
//
// Description:
//   Playbook d'une stratégie écrit par l'utilisateur. Les trades peuvent
//   référencer un modèle pour la catégorisation.
//
// Points d'attention:
//   - (user_id, name) est unique: index uq_user_tradingmodel_name
//   - Suppression refusée tant qu'un trade le référence (vérifié dans
//     TradingModelService, la FK côté trade est en SET NULL)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trading_model")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub name: String,
    pub version: Option<String>,
    pub is_active: bool,

    // Vue d'ensemble et timeframes
    pub overview_logic: Option<String>,
    pub primary_chart_tf: Option<String>,
    pub execution_chart_tf: Option<String>,
    pub context_chart_tf: Option<String>,

    // Analyse
    pub technical_indicators_used: Option<String>,
    pub chart_patterns_used: Option<String>,
    pub price_action_signals: Option<String>,
    pub key_levels_identification: Option<String>,
    pub volume_analysis_notes: Option<String>,
    pub fundamental_analysis_notes: Option<String>,

    // Applicabilité
    pub instrument_applicability: Option<String>,
    pub session_applicability: Option<String>,
    pub optimal_market_conditions: Option<String>,
    pub sub_optimal_market_conditions: Option<String>,

    // Exécution
    pub entry_trigger_description: Option<String>,
    pub stop_loss_strategy: Option<String>,
    pub take_profit_strategy: Option<String>,
    pub min_risk_reward_ratio: Option<f64>,
    pub position_sizing_rules: Option<String>,
    pub scaling_in_out_rules: Option<String>,

    // Gestion du trade
    pub trade_management_breakeven_rules: Option<String>,
    pub trade_management_trailing_stop_rules: Option<String>,
    pub trade_management_partial_profit_rules: Option<String>,
    pub trade_management_adverse_price_action: Option<String>,

    // Risque
    pub model_max_loss_per_trade: Option<String>,
    pub model_max_daily_loss: Option<String>,
    pub model_max_weekly_loss: Option<String>,
    pub model_consecutive_loss_limit: Option<String>,
    pub model_action_on_max_drawdown: Option<String>,

    // Routines
    pub pre_trade_checklist: Option<String>,
    pub order_types_used: Option<String>,
    pub broker_platform_notes: Option<String>,
    pub execution_confirmation_notes: Option<String>,
    pub post_trade_routine_model: Option<String>,

    // Revue
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub backtesting_forwardtesting_notes: Option<String>,
    pub refinements_learnings: Option<String>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::trade::Entity")]
    Trade,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::trade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
