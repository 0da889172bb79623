use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Rôle d'un compte. Un admin est aussi éditeur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "editor")]
    Editor,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        self == UserRole::Admin
    }

    pub fn is_editor(self) -> bool {
        matches!(self, UserRole::Editor | UserRole::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Editor => "editor",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "editor" => Some(UserRole::Editor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String, // toujours en minuscules
    #[serde(skip_serializing)]
    pub password_hash: String, // Format: pbkdf2:sha256:iterations$salt$hash
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime,
    pub updated_at: Option<DateTime>,
    pub last_login: Option<DateTime>,
    pub is_active: bool,
    pub profile_picture: Option<String>, // nom du fichier dans PROFILE_PICS_FOLDER
    pub bio: Option<String>,
    pub is_email_verified: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::activity::Entity")]
    Activity,

    #[sea_orm(has_many = "super::file::Entity")]
    File,

    #[sea_orm(has_one = "super::settings::Entity")]
    Settings,

    #[sea_orm(has_many = "super::api_key::Entity")]
    ApiKey,

    #[sea_orm(has_many = "super::trading_model::Entity")]
    TradingModel,

    #[sea_orm(has_many = "super::trade::Entity")]
    Trade,

    #[sea_orm(has_many = "super::daily_journal::Entity")]
    DailyJournal,
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl Related<super::file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::File.def()
    }
}

impl Related<super::settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settings.def()
    }
}

impl Related<super::api_key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiKey.def()
    }
}

impl Related<super::trading_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TradingModel.def()
    }
}

impl Related<super::trade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trade.def()
    }
}

impl Related<super::daily_journal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyJournal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
