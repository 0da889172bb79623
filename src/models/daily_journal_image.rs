use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

pub const IMAGE_TYPES: [&str; 2] = ["pre_market", "eod_chart"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_journal_image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub daily_journal_id: i32,
    pub user_id: i32,
    pub filename: String,
    #[sea_orm(unique)]
    pub filepath: String,
    pub filesize: i64,
    pub mime_type: Option<String>,
    pub image_type: String,  // 'pre_market' | 'eod_chart'
    pub upload_date: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::daily_journal::Entity",
        from = "Column::DailyJournalId",
        to = "super::daily_journal::Column::Id",
        on_delete = "Cascade"
    )]
    DailyJournal,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::daily_journal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyJournal.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
