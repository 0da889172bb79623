use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(5))")]
pub enum Direction {
    #[sea_orm(string_value = "Long")]
    Long,
    #[sea_orm(string_value = "Short")]
    Short,
}

/// Valeur de how_closed pour une position pas encore finalisée
pub const STILL_OPEN: &str = "Still Open";

pub const HOW_CLOSED_CHOICES: [&str; 6] = ["Manual", "SL", "TP", "Trailing SL", "Time Exit", STILL_OPEN];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trade")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub trading_model_id: Option<i32>,
    pub instrument: String,  // 'NQ', 'ES', 'MNQ'...
    #[sea_orm(indexed)]
    pub trade_date: Date,
    pub direction: Direction,
    pub point_value: Option<f64>,  // $ par point et par contrat (NQ=20, ES=50)
    pub initial_stop_loss: Option<f64>,
    pub terminus_target: Option<f64>,
    pub is_dca: bool,
    pub mae: Option<f64>,
    pub mfe: Option<f64>,
    pub entry_model_legacy: Option<String>,
    pub how_closed: Option<String>,
    pub news_event: Option<String>,

    // Notes de 1 à 5
    pub rules_rating: Option<i32>,
    pub management_rating: Option<i32>,
    pub target_rating: Option<i32>,
    pub entry_rating: Option<i32>,
    pub preparation_rating: Option<i32>,

    pub trade_notes: Option<String>,
    pub psych_scored_highest: Option<String>,
    pub psych_scored_lowest: Option<String>,
    pub overall_analysis_notes: Option<String>,
    pub trade_management_notes: Option<String>,
    pub errors_notes: Option<String>,
    pub improvements_notes: Option<String>,
    pub screenshot_link: Option<String>,
    pub tags: Option<String>,  // séparés par des virgules
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

    #[sea_orm(
        belongs_to = "super::trading_model::Entity",
        from = "Column::TradingModelId",
        to = "super::trading_model::Column::Id",
        on_delete = "SetNull"
    )]
    TradingModel,

    #[sea_orm(has_many = "super::entry_point::Entity")]
    EntryPoint,

    #[sea_orm(has_many = "super::exit_point::Entity")]
    ExitPoint,

    #[sea_orm(has_many = "super::trade_image::Entity")]
    TradeImage,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::trading_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TradingModel.def()
    }
}

impl Related<super::entry_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntryPoint.def()
    }
}

impl Related<super::exit_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExitPoint.def()
    }
}

impl Related<super::trade_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TradeImage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
