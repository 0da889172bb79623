use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Un fill de sortie. Tout est nullable: une sortie peut être saisie plus tard.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exit_point")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    #[serde(skip_serializing)]
    pub trade_id: i32,
    pub exit_time: Option<Time>,
    pub contracts: Option<i32>,
    pub exit_price: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trade::Entity",
        from = "Column::TradeId",
        to = "super::trade::Column::Id",
        on_delete = "Cascade"
    )]
    Trade,
}

impl Related<super::trade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
