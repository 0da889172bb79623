use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

pub const QUARTER_NAMES: [&str; 4] = ["Q1 (Jan-Mar)", "Q2 (Apr-Jun)", "Q3 (Jul-Sep)", "Q4 (Oct-Dec)"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quarterly_journal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub year: i32,
    pub quarter: i32, // 1-4
    pub key_goals_for_quarter: Option<String>,
    pub major_focus_areas_strategies: Option<String>,
    pub anticipated_challenges_mitigation: Option<String>,
    pub quarterly_achievements_progress: Option<String>,
    pub what_went_well_quarter: Option<String>,
    pub what_did_not_go_well_quarter: Option<String>,
    pub key_lessons_learned_quarter: Option<String>,
    pub adjustments_for_next_quarter: Option<String>,
}

pub fn quarter_display_name(quarter: u32) -> Option<&'static str> {
    QUARTER_NAMES.get((quarter as usize).checked_sub(1)?).copied()
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
