// ============================================================================
// SERVICE : FICHIERS
// ============================================================================
//
// Description:
//   Documents uploadés par un utilisateur: liste paginée avec l'espace
//   utilisé, upload, métadonnées, téléchargement et suppression.
//
// Points d'attention:
//   - Lecture: propriétaire ou fichier public. Suppression: propriétaire
//     ou admin. Sinon 404, l'existence du fichier n'est pas révélée
//   - Le fichier disque est écrit avant l'insert et supprimé si l'insert
//     échoue; à la suppression il part après le commit
//
// ============================================================================

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::dto::{Paginated, UploadRequest};
use crate::models::file::{self, format_filesize};
use crate::services::activity_service::{ActivityService, Resource};
use crate::services::storage::{FileStorage, Folder, UploadKind};

#[derive(Debug, Serialize)]
pub struct FileInfo {
    #[serde(flatten)]
    pub file: file::Model,
    pub size_formatted: String,
}

impl From<file::Model> for FileInfo {
    fn from(file: file::Model) -> Self {
        FileInfo {
            size_formatted: file.size_formatted(),
            file,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileListPage {
    #[serde(flatten)]
    pub page: Paginated<FileInfo>,
    pub storage_used: i64,
    pub storage_used_formatted: String,
}

pub struct FileService;

impl FileService {
    pub async fn storage_used<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<i64, DbErr> {
        let sizes: Vec<i64> = file::Entity::find()
            .select_only()
            .column(file::Column::Filesize)
            .filter(file::Column::UserId.eq(user_id))
            .into_tuple()
            .all(db)
            .await?;
        Ok(sizes.into_iter().sum())
    }

    pub async fn list(
        db: &DatabaseConnection,
        user_id: i32,
        page: u64,
        per_page: u64,
    ) -> Result<FileListPage, DbErr> {
        let paginator = file::Entity::find()
            .filter(file::Column::UserId.eq(user_id))
            .order_by_desc(file::Column::UploadDate)
            .order_by_desc(file::Column::Id)
            .paginate(db, per_page);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;
        let storage_used = Self::storage_used(db, user_id).await?;

        Ok(FileListPage {
            page: Paginated {
                items: items.into_iter().map(FileInfo::from).collect(),
                page,
                per_page,
                total_items: totals.number_of_items,
                total_pages: super::total_pages(totals.number_of_items, per_page),
            },
            storage_used,
            storage_used_formatted: format_filesize(storage_used),
        })
    }

    pub async fn upload(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        request: UploadRequest,
        meta: &RequestMeta,
    ) -> Result<FileInfo, AppError> {
        let stored = storage
            .save_base64(Folder::Uploads, UploadKind::Document, &request.filename, &request.content_base64)
            .await?;
        let description = super::non_empty(request.description);

        let result = async {
            let txn = db.begin().await?;
            let saved = file::ActiveModel {
                user_id: Set(user_id),
                filename: Set(stored.original_name.clone()),
                filepath: Set(stored.stored_name.clone()),
                filesize: Set(stored.size),
                file_type: Set(Some(stored.extension.clone())),
                mime_type: Set(Some(stored.mime_type.clone())),
                upload_date: Set(super::now()),
                description: Set(description),
                is_public: Set(request.is_public),
                download_count: Set(0),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            ActivityService::record(
                &txn,
                user_id,
                "file_upload",
                Some(saved.filename.clone()),
                meta,
                Some(Resource { id: saved.id, kind: "File" }),
            )
            .await?;
            txn.commit().await?;
            Ok::<_, DbErr>(saved)
        }
        .await;

        match result {
            Ok(saved) => {
                tracing::info!(user_id, file_id = saved.id, size = saved.filesize, "file uploaded");
                Ok(saved.into())
            }
            Err(e) => {
                storage.remove(Folder::Uploads, &stored.stored_name).await;
                Err(e.into())
            }
        }
    }

    /// Fichier lisible par `user_id`: le sien ou un fichier public
    pub async fn find_readable(db: &DatabaseConnection, user_id: i32, file_id: i32) -> Result<file::Model, AppError> {
        match file::Entity::find_by_id(file_id).one(db).await? {
            Some(f) if f.user_id == user_id || f.is_public => Ok(f),
            _ => Err(AppError::not_found("File")),
        }
    }

    pub async fn metadata(db: &DatabaseConnection, user_id: i32, file_id: i32) -> Result<FileInfo, AppError> {
        Ok(Self::find_readable(db, user_id, file_id).await?.into())
    }

    /// Contenu du fichier; compte le téléchargement
    pub async fn download(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        file_id: i32,
    ) -> Result<(file::Model, Vec<u8>), AppError> {
        let found = Self::find_readable(db, user_id, file_id).await?;
        let bytes = storage.read(Folder::Uploads, &found.filepath).await?;

        file::Entity::update_many()
            .col_expr(file::Column::DownloadCount, Expr::col(file::Column::DownloadCount).add(1))
            .col_expr(file::Column::LastAccessed, Expr::value(Some(super::now())))
            .filter(file::Column::Id.eq(file_id))
            .exec(db)
            .await?;

        let updated = file::Entity::find_by_id(file_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("File"))?;
        tracing::debug!(user_id, file_id, "file downloaded");
        Ok((updated, bytes))
    }

    pub async fn delete(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        is_admin: bool,
        file_id: i32,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let txn = db.begin().await?;
        let found = match file::Entity::find_by_id(file_id).one(&txn).await? {
            Some(f) if f.user_id == user_id || is_admin => f,
            _ => return Err(AppError::not_found("File")),
        };

        let filepath = found.filepath.clone();
        let filename = found.filename.clone();
        found.delete(&txn).await?;
        ActivityService::record(
            &txn,
            user_id,
            "file_delete",
            Some(filename),
            meta,
            Some(Resource { id: file_id, kind: "File" }),
        )
        .await?;
        txn.commit().await?;

        storage.remove(Folder::Uploads, &filepath).await;
        tracing::info!(user_id, file_id, "file deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::UserRole;
    use crate::test_utils::{create_user, setup_test_db, test_storage};
    use base64::{Engine, engine::general_purpose::STANDARD};

    fn upload(name: &str, content: &[u8], is_public: bool) -> UploadRequest {
        UploadRequest {
            filename: name.to_string(),
            content_base64: STANDARD.encode(content),
            description: Some("  ".to_string()),
            is_public,
        }
    }

    #[actix_web::test]
    async fn upload_list_and_storage_usage() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let user = create_user(&db, "uploader", UserRole::User).await;
        let meta = RequestMeta::default();

        let first = FileService::upload(&db, &storage, user.id, upload("a.txt", b"hello", false), &meta)
            .await
            .unwrap();
        FileService::upload(&db, &storage, user.id, upload("b.csv", b"x,y\n1,2\n", false), &meta)
            .await
            .unwrap();
        let refused = FileService::upload(&db, &storage, user.id, upload("run.exe", b"MZ", false), &meta).await;
        assert!(matches!(refused, Err(AppError::BadRequest(_))));

        assert_eq!(first.file.description, None);
        assert_eq!(first.file.file_type.as_deref(), Some("txt"));

        let listing = FileService::list(&db, user.id, 1, 1).await.unwrap();
        assert_eq!(listing.page.items.len(), 1);
        assert_eq!(listing.page.total_pages, 2);
        assert_eq!(listing.storage_used, 13);
        assert_eq!(listing.storage_used_formatted, "13 B");
    }

    #[actix_web::test]
    async fn download_rules_and_counter() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let owner = create_user(&db, "owner", UserRole::User).await;
        let other = create_user(&db, "other", UserRole::User).await;
        let meta = RequestMeta::default();

        let private = FileService::upload(&db, &storage, owner.id, upload("p.txt", b"secret", false), &meta)
            .await
            .unwrap();
        let public = FileService::upload(&db, &storage, owner.id, upload("s.txt", b"shared", true), &meta)
            .await
            .unwrap();

        let denied = FileService::download(&db, &storage, other.id, private.file.id).await;
        assert!(matches!(denied, Err(AppError::NotFound(_))));

        let (record, bytes) = FileService::download(&db, &storage, other.id, public.file.id).await.unwrap();
        assert_eq!(bytes, b"shared");
        assert_eq!(record.download_count, 1);
        assert!(record.last_accessed.is_some());
    }

    #[actix_web::test]
    async fn delete_by_owner_or_admin_only() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let owner = create_user(&db, "owner", UserRole::User).await;
        let other = create_user(&db, "other", UserRole::User).await;
        let admin = create_user(&db, "admin", UserRole::Admin).await;
        let meta = RequestMeta::default();

        let uploaded = FileService::upload(&db, &storage, owner.id, upload("n.txt", b"note", true), &meta)
            .await
            .unwrap();
        let path = storage.path_of(Folder::Uploads, &uploaded.file.filepath);

        let refused = FileService::delete(&db, &storage, other.id, false, uploaded.file.id, &meta).await;
        assert!(matches!(refused, Err(AppError::NotFound(_))));
        assert!(path.exists());

        FileService::delete(&db, &storage, admin.id, true, uploaded.file.id, &meta).await.unwrap();
        assert!(!path.exists());
    }
}
