// ============================================================================
// SERVICE : ADMINISTRATION DES UTILISATEURS
// ============================================================================
//
// Description:
//   Statistiques, liste paginée, création / édition / suppression de comptes
//   et suppression groupée.
//
// Points d'attention:
//   - Un admin ne peut pas se supprimer lui-même
//   - Il reste toujours au moins un admin (suppression ou rétrogradation)
//   - Les lignes liées partent par cascade; les fichiers disque sont
//     supprimés après le commit
//
// ============================================================================

use sea_orm::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::dto::Paginated;
use crate::models::users::{self, UserRole};
use crate::models::{daily_journal_image, file, trade_image};
use crate::services::activity_service::ActivityService;
use crate::services::mailer::Mailer;
use crate::services::storage::{FileStorage, Folder};
use crate::services::user_service::{NewUser, UserService};
use crate::utils::password;

#[derive(Debug, Serialize)]
pub struct UserCounts {
    pub total_users: u64,
    pub active_users: u64,
    pub admin_users: u64,
}

#[derive(Debug, Serialize)]
pub struct UserListPage {
    #[serde(flatten)]
    pub page: Paginated<users::Model>,
    #[serde(flatten)]
    pub counts: UserCounts,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(length(min = 3, max = 25))]
    pub username: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_email_verified: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 3, max = 25))]
    pub username: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    /// Absent: conservé, sauf si l'e-mail change (remis à false)
    pub is_email_verified: Option<bool>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: users::Model,
    pub verification_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteReport {
    pub message: String,
    pub deleted_count: u32,
    pub skipped_count: u32,
    pub skipped_info: Vec<String>,
}

/// Fichiers disque d'un compte, à supprimer une fois la suppression commitée
#[derive(Debug, Default)]
struct UserFiles {
    uploads: Vec<String>,
    profile_pictures: Vec<String>,
}

impl UserFiles {
    async fn collect<C: ConnectionTrait>(&mut self, db: &C, user: &users::Model) -> Result<(), DbErr> {
        let files = file::Entity::find()
            .filter(file::Column::UserId.eq(user.id))
            .all(db)
            .await?;
        let trade_images = trade_image::Entity::find()
            .filter(trade_image::Column::UserId.eq(user.id))
            .all(db)
            .await?;
        let journal_images = daily_journal_image::Entity::find()
            .filter(daily_journal_image::Column::UserId.eq(user.id))
            .all(db)
            .await?;

        self.uploads.extend(files.into_iter().map(|f| f.filepath));
        self.uploads.extend(trade_images.into_iter().map(|i| i.filepath));
        self.uploads.extend(journal_images.into_iter().map(|i| i.filepath));
        self.profile_pictures.extend(user.profile_picture.clone());
        Ok(())
    }

    async fn remove(self, storage: &FileStorage) {
        storage.remove_all(Folder::Uploads, &self.uploads).await;
        storage.remove_all(Folder::ProfilePics, &self.profile_pictures).await;
    }
}

/// Identifiant reçu en JSON: nombre ou chaîne numérique
fn parse_user_id(raw: &serde_json::Value) -> Option<i32> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_raw_id(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct AdminService;

impl AdminService {
    async fn count_admins<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        users::Entity::find()
            .filter(users::Column::Role.eq(UserRole::Admin))
            .count(db)
            .await
    }

    pub async fn counts(db: &DatabaseConnection) -> Result<UserCounts, DbErr> {
        Ok(UserCounts {
            total_users: users::Entity::find().count(db).await?,
            active_users: users::Entity::find()
                .filter(users::Column::IsActive.eq(true))
                .count(db)
                .await?,
            admin_users: Self::count_admins(db).await?,
        })
    }

    pub async fn list_users(db: &DatabaseConnection, page: u64, per_page: u64) -> Result<UserListPage, DbErr> {
        let paginator = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .paginate(db, per_page);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(UserListPage {
            page: Paginated {
                items,
                page,
                per_page,
                total_items: totals.number_of_items,
                total_pages: super::total_pages(totals.number_of_items, per_page),
            },
            counts: Self::counts(db).await?,
        })
    }

    pub async fn create_user(
        db: &DatabaseConnection,
        config: &AppConfig,
        mailer: &dyn Mailer,
        admin: &users::Model,
        request: AdminCreateUserRequest,
        meta: &RequestMeta,
    ) -> Result<CreatedUser, AppError> {
        let txn = db.begin().await?;
        UserService::ensure_unique(&txn, &request.username, &request.email, None).await?;

        let user = UserService::insert_user(
            &txn,
            NewUser {
                username: request.username,
                email: request.email,
                password: request.password,
                name: request.name,
                role: request.role,
                is_active: request.is_active,
                is_email_verified: request.is_email_verified,
            },
        )
        .await?;
        let token = if user.is_email_verified {
            None
        } else {
            Some(UserService::create_verification_token(&txn, user.id, config.verification_token_hours).await?)
        };
        ActivityService::record(
            &txn,
            admin.id,
            "admin_user_create",
            Some(format!("Admin {} created user: {}", admin.username, user.username)),
            meta,
            None,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(admin_id = admin.id, user_id = user.id, "user created by admin");
        let verification_sent = match token {
            Some(token) => UserService::send_verification(config, mailer, &user, &token).await,
            None => false,
        };
        Ok(CreatedUser { user, verification_sent })
    }

    pub async fn update_user(
        db: &DatabaseConnection,
        admin: &users::Model,
        user_id: i32,
        request: AdminUpdateUserRequest,
        meta: &RequestMeta,
    ) -> Result<users::Model, AppError> {
        let txn = db.begin().await?;
        let user = UserService::find_by_id(&txn, user_id).await?;
        UserService::ensure_unique(&txn, &request.username, &request.email, Some(user_id)).await?;

        if user.role.is_admin() && !request.role.is_admin() && Self::count_admins(&txn).await? <= 1 {
            tracing::warn!(admin_id = admin.id, user_id, "refused to demote the last admin");
            return Err(AppError::BadRequest("Cannot remove the role of the last admin account.".to_string()));
        }

        let email = request.email.trim().to_lowercase();
        let is_email_verified = match request.is_email_verified {
            Some(verified) => verified,
            None if email != user.email => false,
            None => user.is_email_verified,
        };
        let password_hash = match super::non_empty(request.new_password) {
            Some(new_password) => Some(password::hash_password(&new_password).map_err(AppError::Internal)?),
            None => None,
        };

        let mut active: users::ActiveModel = user.into();
        active.username = Set(request.username.trim().to_string());
        active.email = Set(email);
        active.name = Set(super::non_empty(request.name));
        active.role = Set(request.role);
        active.is_active = Set(request.is_active);
        active.is_email_verified = Set(is_email_verified);
        active.updated_at = Set(Some(super::now()));
        let password_changed = password_hash.is_some();
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        let user = active.update(&txn).await?;

        ActivityService::record(
            &txn,
            admin.id,
            "admin_user_edit",
            Some(format!("Admin {} edited user: {}", admin.username, user.username)),
            meta,
            None,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(admin_id = admin.id, user_id, password_changed, "user updated by admin");
        Ok(user)
    }

    pub async fn delete_user(
        db: &DatabaseConnection,
        storage: &FileStorage,
        admin: &users::Model,
        user_id: i32,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        if user_id == admin.id {
            return Err(AppError::BadRequest("You cannot delete your own account.".to_string()));
        }

        let txn = db.begin().await?;
        let user = UserService::find_by_id(&txn, user_id).await?;
        if user.role.is_admin() && Self::count_admins(&txn).await? <= 1 {
            tracing::warn!(admin_id = admin.id, user_id, "refused to delete the last admin");
            return Err(AppError::BadRequest("Cannot delete the last admin account.".to_string()));
        }

        let mut disk_files = UserFiles::default();
        disk_files.collect(&txn, &user).await?;
        let username = user.username.clone();
        user.delete(&txn).await?;
        ActivityService::record(
            &txn,
            admin.id,
            "admin_user_delete",
            Some(format!("Admin {} deleted user: {}", admin.username, username)),
            meta,
            None,
        )
        .await?;
        txn.commit().await?;

        disk_files.remove(storage).await;
        tracing::info!(admin_id = admin.id, user_id, "user deleted by admin");
        Ok(())
    }

    /// Supprime plusieurs comptes dans une seule transaction.
    /// Les ids invalides, inconnus, l'admin courant et le dernier admin
    /// sont ignorés avec une raison.
    pub async fn bulk_delete(
        db: &DatabaseConnection,
        storage: &FileStorage,
        admin: &users::Model,
        raw_ids: &[serde_json::Value],
        meta: &RequestMeta,
    ) -> Result<BulkDeleteReport, AppError> {
        let mut skipped_info = Vec::new();
        let mut user_ids = Vec::new();
        for raw in raw_ids {
            match parse_user_id(raw) {
                Some(id) => user_ids.push(id),
                None => {
                    tracing::warn!(raw = %raw, "bulk delete: invalid user id");
                    skipped_info.push(format!("Invalid User ID format: {}", display_raw_id(raw)));
                }
            }
        }

        if user_ids.is_empty() {
            if skipped_info.is_empty() {
                return Ok(BulkDeleteReport {
                    message: "No users selected for deletion.".to_string(),
                    deleted_count: 0,
                    skipped_count: 0,
                    skipped_info,
                });
            }
            return Err(AppError::BadRequest(format!(
                "No valid user IDs provided for deletion. Details: {}.",
                skipped_info.join("; ")
            )));
        }

        let txn = db.begin().await?;
        let mut admins_left = Self::count_admins(&txn).await?;
        let mut disk_files = UserFiles::default();
        let mut deleted_count = 0;

        for user_id in user_ids {
            if user_id == admin.id {
                skipped_info.push(format!("User ID {} (cannot delete self)", user_id));
                continue;
            }
            let Some(user) = users::Entity::find_by_id(user_id).one(&txn).await? else {
                skipped_info.push(format!("User ID {} (not found)", user_id));
                continue;
            };
            let was_admin = user.role.is_admin();
            if was_admin && admins_left <= 1 {
                tracing::warn!(user_id, "bulk delete: skipped last admin");
                skipped_info.push(format!("{} (cannot delete last admin)", user.username));
                continue;
            }

            disk_files.collect(&txn, &user).await?;
            let username = user.username.clone();
            user.delete(&txn).await?;
            if was_admin {
                admins_left -= 1;
            }
            ActivityService::record(
                &txn,
                admin.id,
                "admin_bulk_user_delete",
                Some(format!(
                    "Admin {} bulk deleted user: {} (ID: {})",
                    admin.username, username, user_id
                )),
                meta,
                None,
            )
            .await?;
            deleted_count += 1;
        }
        txn.commit().await?;
        disk_files.remove(storage).await;

        let skipped_count = skipped_info.len() as u32;
        let mut message = format!("Bulk delete completed. Successfully deleted: {} user(s).", deleted_count);
        if skipped_count > 0 {
            message.push_str(&format!(
                " Skipped: {} user(s). Details: {}.",
                skipped_count,
                skipped_info.join("; ")
            ));
        }
        tracing::info!(admin_id = admin.id, deleted_count, skipped_count, "bulk user delete");
        Ok(BulkDeleteReport {
            message,
            deleted_count,
            skipped_count,
            skipped_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::trade_service::TradeService;
    use crate::test_utils::{RecordingMailer, create_user, setup_test_db, test_config, test_storage, trade_request};
    use crate::models::trade::{self, Direction};
    use serde_json::json;

    fn update_request(user: &users::Model, role: UserRole) -> AdminUpdateUserRequest {
        AdminUpdateUserRequest {
            username: user.username.clone(),
            email: user.email.clone(),
            name: None,
            role,
            is_active: true,
            is_email_verified: None,
            new_password: None,
        }
    }

    #[actix_web::test]
    async fn last_admin_cannot_be_demoted_or_deleted() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let meta = RequestMeta::default();
        let root = create_user(&db, "root", UserRole::Admin).await;

        let demote = AdminService::update_user(&db, &root, root.id, update_request(&root, UserRole::User), &meta).await;
        assert!(matches!(demote, Err(AppError::BadRequest(_))));

        let second = create_user(&db, "second", UserRole::Admin).await;
        // deux admins: la suppression du second passe, puis root redevient le dernier
        AdminService::delete_user(&db, &storage, &root, second.id, &meta).await.unwrap();

        let self_delete = AdminService::delete_user(&db, &storage, &root, root.id, &meta).await;
        assert!(matches!(self_delete, Err(AppError::BadRequest(_))));
        assert_eq!(AdminService::counts(&db).await.unwrap().admin_users, 1);
    }

    #[actix_web::test]
    async fn deleting_a_user_cascades_to_trades() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let meta = RequestMeta::default();
        let root = create_user(&db, "root", UserRole::Admin).await;
        let trader = create_user(&db, "trader", UserRole::User).await;
        TradeService::create(&db, trader.id, trade_request(Direction::Long), &meta).await.unwrap();

        AdminService::delete_user(&db, &storage, &root, trader.id, &meta).await.unwrap();

        assert_eq!(trade::Entity::find().count(&db).await.unwrap(), 0);
        assert!(users::Entity::find_by_id(trader.id).one(&db).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn email_change_clears_verification_unless_set() {
        let db = setup_test_db().await;
        let meta = RequestMeta::default();
        let root = create_user(&db, "root", UserRole::Admin).await;
        let user = create_user(&db, "lena", UserRole::User).await;

        let mut request = update_request(&user, UserRole::Editor);
        request.email = "lena.new@example.com".to_string();
        let updated = AdminService::update_user(&db, &root, user.id, request, &meta).await.unwrap();
        assert!(!updated.is_email_verified);
        assert_eq!(updated.role, UserRole::Editor);

        let mut request = update_request(&updated, UserRole::Editor);
        request.email = "lena.other@example.com".to_string();
        request.is_email_verified = Some(true);
        request.new_password = Some("a-new-password".to_string());
        let updated = AdminService::update_user(&db, &root, user.id, request, &meta).await.unwrap();
        assert!(updated.is_email_verified);
        assert!(UserService::login(&db, "lena", "a-new-password", &meta).await.is_ok());
    }

    #[actix_web::test]
    async fn unverified_user_gets_a_verification_mail() {
        let db = setup_test_db().await;
        let config = test_config();
        let mailer = RecordingMailer::default();
        let root = create_user(&db, "root", UserRole::Admin).await;

        let request: AdminCreateUserRequest = serde_json::from_value(json!({
            "username": "newbie",
            "email": "newbie@example.com",
            "password": "password123",
            "role": "user"
        }))
        .unwrap();
        let created = AdminService::create_user(&db, &config, &mailer, &root, request, &RequestMeta::default())
            .await
            .unwrap();

        assert!(created.verification_sent);
        assert!(created.user.is_active);
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, "newbie@example.com");
    }

    #[actix_web::test]
    async fn bulk_delete_reports_skipped_ids() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let root = create_user(&db, "root", UserRole::Admin).await;
        let other_admin = create_user(&db, "boss", UserRole::Admin).await;
        let plain = create_user(&db, "plain", UserRole::User).await;

        let report = AdminService::bulk_delete(
            &db,
            &storage,
            &root,
            &[json!("abc"), json!(root.id), json!(9999), json!(plain.id), json!(other_admin.id.to_string())],
            &RequestMeta::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.deleted_count, 2);
        assert_eq!(report.skipped_count, 3);
        assert_eq!(AdminService::counts(&db).await.unwrap().total_users, 1);

        let only_invalid = AdminService::bulk_delete(&db, &storage, &root, &[json!(null)], &RequestMeta::default()).await;
        assert!(matches!(only_invalid, Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn bulk_delete_keeps_one_admin() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let root = create_user(&db, "root", UserRole::Admin).await;
        let a = create_user(&db, "a", UserRole::Admin).await;

        let report = AdminService::bulk_delete(&db, &storage, &a, &[json!(root.id)], &RequestMeta::default())
            .await
            .unwrap();
        assert_eq!(report.deleted_count, 1);

        // a est maintenant le dernier admin
        let report = AdminService::bulk_delete(&db, &storage, &root, &[json!(a.id)], &RequestMeta::default())
            .await
            .unwrap();
        assert_eq!(report.deleted_count, 0);
        assert_eq!(report.skipped_info, vec!["a (cannot delete last admin)".to_string()]);
    }

    #[actix_web::test]
    async fn user_list_pages_round_up() {
        let db = setup_test_db().await;
        for name in ["ann", "bob", "cid"] {
            create_user(&db, name, UserRole::User).await;
        }

        let listing = AdminService::list_users(&db, 2, 2).await.unwrap();
        assert_eq!(listing.page.total_items, 3);
        assert_eq!(listing.page.total_pages, 2);
        assert_eq!(listing.page.items.len(), 1);
        assert_eq!(listing.page.items[0].username, "cid");

        let single = AdminService::list_users(&db, 1, 25).await.unwrap();
        assert_eq!(single.page.total_pages, 1);
    }
}
