use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;
use chrono::{NaiveDate, Weekday};

/// Journal hebdomadaire, unique par (user, year, week_number). Semaine ISO.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weekly_journal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub year: i32,
    pub week_number: i32,
    pub know_traded_well_if: Option<String>,
    pub key_actions_for_excellence: Option<String>,
    pub potential_challenge_and_response: Option<String>,
    pub improvement_area_and_approach: Option<String>,
    pub weekly_did_well_more_of: Option<String>,
    pub weekly_could_do_differently: Option<String>,
    pub weekly_challenge_overcame_learned: Option<String>,
    pub weekly_improve_action_next_week: Option<String>,
}

/// Lundi de la semaine ISO, None si la semaine n'existe pas cette année-là
pub fn week_start_date(year: i32, week: u32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
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
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
