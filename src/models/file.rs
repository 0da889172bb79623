use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub filename: String,  // nom d'origine (nettoyé)
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub filepath: String,  // nom stocké sur disque (uuid + extension)
    pub filesize: i64,
    pub file_type: Option<String>,  // extension: 'pdf', 'jpg'
    pub mime_type: Option<String>,
    pub upload_date: DateTime,
    pub last_accessed: Option<DateTime>,
    pub description: Option<String>,
    pub is_public: bool,
    pub download_count: i32,
}

impl Model {
    /// Taille lisible: 512 B, 1.5 KB, 2.0 MB...
    pub fn size_formatted(&self) -> String {
        format_filesize(self.filesize)
    }
}

pub fn format_filesize(size: i64) -> String {
    const KB: f64 = 1024.0;
    let size_f = size as f64;
    if size < 0 {
        "0 B".to_string()
    } else if size_f < KB {
        format!("{} B", size)
    } else if size_f < KB * KB {
        format!("{:.1} KB", size_f / KB)
    } else if size_f < KB * KB * KB {
        format!("{:.1} MB", size_f / (KB * KB))
    } else {
        format!("{:.1} GB", size_f / (KB * KB * KB))
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

#[cfg(test)]
mod tests {
    use super::format_filesize;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_filesize(-3), "0 B");
        assert_eq!(format_filesize(512), "512 B");
        assert_eq!(format_filesize(1536), "1.5 KB");
        assert_eq!(format_filesize(2 * 1024 * 1024), "2.0 MB");
    }
}
