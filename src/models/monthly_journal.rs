use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_journal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub year: i32,
    pub month: i32, // 1-12
    pub long_term_trading_goal: Option<String>,
    pub reason_for_trading: Option<String>,
    pub monthly_goals: Option<String>,
    pub monthly_actions_to_achieve_goals: Option<String>,
    pub coach_advice_for_month_ahead: Option<String>,
    pub monthly_did_well_more_of: Option<String>,
    pub monthly_could_do_differently: Option<String>,
    pub monthly_challenge_overcame_learned: Option<String>,
    pub monthly_action_taken_and_progress: Option<String>,
    pub coach_feedback_on_month: Option<String>,
}

/// "May 2024"
pub fn month_year_display(year: i32, month: u32) -> Option<String> {
    let name = MONTH_NAMES.get((month as usize).checked_sub(1)?)?;
    Some(format!("{} {}", name, year))
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
