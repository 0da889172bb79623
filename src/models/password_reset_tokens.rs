// ============================================================================
// MODÈLE : PASSWORD RESET TOKENS
// ============================================================================
//
// Colonnes de la table password_reset:
//   - id (INTEGER, PRIMARY KEY)
//   - user_id (INTEGER, NOT NULL, FK vers user, ON DELETE CASCADE)
//   - token (VARCHAR, UNIQUE, NOT NULL) - UUID v4 en hex
//   - expires_at (TIMESTAMP, NOT NULL) - created_at + RESET_TOKEN_HOURS
//   - used (BOOLEAN, NOT NULL)
//   - created_at (TIMESTAMP, NOT NULL)
//
// Workflow:
//   1. POST /api/auth/forgot-password avec l'email
//   2. Le token est inséré ici puis envoyé par mail
//   3. POST /api/auth/reset-password avec token + nouveau password
//   4. Vérification: token existe, pas expiré, pas utilisé -> used = true
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_reset")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub token: String,

    pub expires_at: DateTime,

    pub used: bool,

    pub created_at: DateTime,
}

impl Model {
    pub fn is_valid(&self, now: DateTime) -> bool {
        !self.used && now <= self.expires_at
    }
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
