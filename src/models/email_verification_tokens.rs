// ============================================================================
// MODÈLE : EMAIL VERIFICATION TOKENS
// ============================================================================
//
// Workflow:
//   1. Inscription (ou création par un admin sans "verified")
//   2. Le user est créé avec is_email_verified = false
//   3. Un token est inséré ici et le lien est envoyé par mail
//   4. GET /api/auth/verify-email?token=xxx
//   5. Token valide -> user.is_email_verified = true, token.used = true
//
// Points d'attention:
//   - Un token ne sert qu'une fois
//   - Expire après VERIFICATION_TOKEN_HOURS (24h par défaut)
//   - ON DELETE CASCADE: si user supprimé, tokens supprimés aussi
//
// ============================================================================

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_verification_token")]
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
