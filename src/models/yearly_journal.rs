use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "yearly_journal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub year: i32,
    pub yearly_long_term_vision: Option<String>,
    pub yearly_key_goals: Option<String>,
    pub yearly_major_focus_areas: Option<String>,
    pub yearly_coach_advice_for_year_ahead: Option<String>,
    pub yearly_achievements: Option<String>,
    pub yearly_challenges_overcome: Option<String>,
    pub yearly_lessons_learned: Option<String>,
    pub yearly_goals_for_next_year: Option<String>,
    pub yearly_coach_feedback_on_year: Option<String>,
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
