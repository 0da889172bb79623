// ============================================================================
// SERVICE : UTILISATEURS
// ============================================================================
//
// Description:
//   Inscription, connexion, vérification d'e-mail, réinitialisation du mot
//   de passe, profil, photo de profil et clés d'API.
//
// Points d'attention:
//   - Les e-mails sont stockés en minuscules
//   - resend_verification / forgot_password ne révèlent jamais si un
//     compte existe
//   - Les mails partent après le commit; un échec d'envoi est seulement loggé
//
// ============================================================================

use chrono::Duration;
use sea_orm::*;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::users::{self, UserRole};
use crate::models::{api_key, email_verification_tokens, password_reset_tokens};
use crate::services::activity_service::ActivityService;
use crate::services::mailer::{self, Mailer};
use crate::services::settings_service::SettingsService;
use crate::services::storage::{FileStorage, Folder, UploadKind};
use crate::utils::{password, tokens};

pub const API_KEY_DEFAULT_DAYS: i64 = 30;

/// Données d'un nouveau compte (inscription ou création par un admin)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub is_email_verified: bool,
}

/// Champs modifiables du profil
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: String,
    pub bio: Option<String>,
}

pub struct UserService;

impl UserService {
    pub async fn find_by_id<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<users::Model, AppError> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn find_by_username<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username.trim()))
            .one(db)
            .await
    }

    pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(db)
            .await
    }

    /// Conflit si le nom d'utilisateur ou l'e-mail est déjà pris par un autre compte
    pub async fn ensure_unique<C: ConnectionTrait>(
        db: &C,
        username: &str,
        email: &str,
        except_user: Option<i32>,
    ) -> Result<(), AppError> {
        if let Some(existing) = Self::find_by_username(db, username).await? {
            if Some(existing.id) != except_user {
                return Err(AppError::Conflict(
                    "That username is already taken. Please choose a different one.".to_string(),
                ));
            }
        }
        if let Some(existing) = Self::find_by_email(db, email).await? {
            if Some(existing.id) != except_user {
                return Err(AppError::Conflict(
                    "That email address is already registered. Please use a different one.".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Insère l'utilisateur et ses paramètres par défaut
    pub async fn insert_user<C: ConnectionTrait>(db: &C, new_user: NewUser) -> Result<users::Model, AppError> {
        let password_hash = password::hash_password(&new_user.password).map_err(AppError::Internal)?;
        let user = users::ActiveModel {
            username: Set(new_user.username.trim().to_string()),
            email: Set(new_user.email.trim().to_lowercase()),
            password_hash: Set(password_hash),
            name: Set(super::non_empty(new_user.name)),
            role: Set(new_user.role),
            created_at: Set(super::now()),
            is_active: Set(new_user.is_active),
            is_email_verified: Set(new_user.is_email_verified),
            ..Default::default()
        }
        .insert(db)
        .await?;

        SettingsService::defaults(user.id).insert(db).await?;
        Ok(user)
    }

    pub async fn create_verification_token<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        hours: i64,
    ) -> Result<String, DbErr> {
        let token = tokens::new_token();
        let now = super::now();
        email_verification_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(token.clone()),
            expires_at: Set(now + Duration::hours(hours)),
            used: Set(false),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(token)
    }

    pub async fn send_verification(
        config: &AppConfig,
        mailer: &dyn Mailer,
        user: &users::Model,
        token: &str,
    ) -> bool {
        let message = mailer::verification_mail(config, &user.email, &user.username, token);
        mailer::send_or_log(mailer, message).await
    }

    pub async fn register(
        db: &DatabaseConnection,
        config: &AppConfig,
        mailer: &dyn Mailer,
        username: &str,
        email: &str,
        password: &str,
        meta: &RequestMeta,
    ) -> Result<users::Model, AppError> {
        let txn = db.begin().await?;
        Self::ensure_unique(&txn, username, email, None).await?;

        let user = Self::insert_user(
            &txn,
            NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                name: None,
                role: UserRole::User,
                is_active: true,
                is_email_verified: false,
            },
        )
        .await?;
        let token = Self::create_verification_token(&txn, user.id, config.verification_token_hours).await?;
        ActivityService::record(&txn, user.id, "user_register", None, meta, None).await?;
        txn.commit().await?;

        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Self::send_verification(config, mailer, &user, &token).await;
        Ok(user)
    }

    /// Vérifie les identifiants et met à jour last_login
    pub async fn login(
        db: &DatabaseConnection,
        username: &str,
        password_input: &str,
        meta: &RequestMeta,
    ) -> Result<users::Model, AppError> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let Some(user) = Self::find_by_username(db, username).await? else {
            password::verify_dummy(password_input);
            tracing::warn!(username = %username, "failed login");
            return Err(invalid());
        };
        let matches = password::verify_password(password_input, &user.password_hash).unwrap_or_else(|e| {
            tracing::warn!(user_id = user.id, error = %e, "unreadable password hash");
            false
        });
        if !matches {
            tracing::warn!(username = %username, "failed login");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(AppError::Forbidden(
                "Your account is inactive. Please contact an administrator.".to_string(),
            ));
        }
        if !user.is_email_verified {
            return Err(AppError::Forbidden(
                "Your email address has not been verified. Please check your inbox.".to_string(),
            ));
        }

        let txn = db.begin().await?;
        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(super::now()));
        let user = active.update(&txn).await?;
        ActivityService::record(&txn, user.id, "user_login", None, meta, None).await?;
        txn.commit().await?;

        tracing::info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    pub async fn change_password(
        db: &DatabaseConnection,
        user_id: i32,
        current_password: &str,
        new_password: &str,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let user = Self::find_by_id(db, user_id).await?;
        if !password::verify_password(current_password, &user.password_hash).unwrap_or(false) {
            return Err(AppError::BadRequest("Current password is incorrect.".to_string()));
        }
        Self::set_password(db, user, new_password, "password_change", meta).await
    }

    async fn set_password(
        db: &DatabaseConnection,
        user: users::Model,
        new_password: &str,
        action: &str,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let hash = password::hash_password(new_password).map_err(AppError::Internal)?;
        let txn = db.begin().await?;
        let user_id = Self::store_password_hash(&txn, user, hash, action, meta).await?;
        txn.commit().await?;
        tracing::info!(user_id, "password changed");
        Ok(())
    }

    /// Écrit le hash et l'audit dans la transaction de l'appelant
    async fn store_password_hash<C: ConnectionTrait>(
        txn: &C,
        user: users::Model,
        hash: String,
        action: &str,
        meta: &RequestMeta,
    ) -> Result<i32, AppError> {
        let user_id = user.id;
        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(hash);
        active.updated_at = Set(Some(super::now()));
        active.update(txn).await?;
        ActivityService::record(txn, user_id, action, None, meta, None).await?;
        Ok(user_id)
    }

    pub async fn verify_email(db: &DatabaseConnection, token: &str, meta: &RequestMeta) -> Result<users::Model, AppError> {
        let invalid = || AppError::BadRequest("The verification link is invalid or has expired.".to_string());

        let record = email_verification_tokens::Entity::find()
            .filter(email_verification_tokens::Column::Token.eq(token))
            .one(db)
            .await?
            .ok_or_else(invalid)?;
        if !record.is_valid(super::now()) {
            return Err(invalid());
        }

        let txn = db.begin().await?;
        let user = Self::find_by_id(&txn, record.user_id).await?;
        let mut active_user: users::ActiveModel = user.into();
        active_user.is_email_verified = Set(true);
        let user = active_user.update(&txn).await?;

        let mut active_token: email_verification_tokens::ActiveModel = record.into();
        active_token.used = Set(true);
        active_token.update(&txn).await?;

        ActivityService::record(&txn, user.id, "email_verified", None, meta, None).await?;
        txn.commit().await?;

        tracing::info!(user_id = user.id, "email verified");
        Ok(user)
    }

    /// Ne signale jamais si l'adresse est inconnue
    pub async fn resend_verification(
        db: &DatabaseConnection,
        config: &AppConfig,
        mailer: &dyn Mailer,
        email: &str,
    ) -> Result<(), AppError> {
        let Some(user) = Self::find_by_email(db, email).await? else {
            tracing::debug!("verification resend for unknown email");
            return Ok(());
        };
        if user.is_email_verified {
            return Ok(());
        }
        let token = Self::create_verification_token(db, user.id, config.verification_token_hours).await?;
        Self::send_verification(config, mailer, &user, &token).await;
        Ok(())
    }

    pub async fn forgot_password(
        db: &DatabaseConnection,
        config: &AppConfig,
        mailer: &dyn Mailer,
        email: &str,
    ) -> Result<(), AppError> {
        let Some(user) = Self::find_by_email(db, email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = tokens::new_token();
        let now = super::now();
        password_reset_tokens::ActiveModel {
            user_id: Set(user.id),
            token: Set(token.clone()),
            expires_at: Set(now + Duration::hours(config.reset_token_hours)),
            used: Set(false),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let message = mailer::password_reset_mail(config, &user.email, &user.username, &token);
        mailer::send_or_log(mailer, message).await;
        Ok(())
    }

    /// Passe le token à `used` si personne ne l'a consommé avant.
    /// Sans commit de l'appelant, le token reste utilisable.
    async fn consume_reset_token<C: ConnectionTrait>(
        txn: &C,
        token: &str,
    ) -> Result<password_reset_tokens::Model, AppError> {
        let invalid = || AppError::BadRequest("That is an invalid or expired token.".to_string());

        let record = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .one(txn)
            .await?
            .ok_or_else(invalid)?;
        if !record.is_valid(super::now()) {
            return Err(invalid());
        }

        let consumed = password_reset_tokens::Entity::update_many()
            .col_expr(password_reset_tokens::Column::Used, sea_query::Expr::value(true))
            .filter(password_reset_tokens::Column::Id.eq(record.id))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .exec(txn)
            .await?;
        if consumed.rows_affected != 1 {
            tracing::warn!(user_id = record.user_id, "reset token already consumed");
            return Err(invalid());
        }
        Ok(record)
    }

    pub async fn reset_password(
        db: &DatabaseConnection,
        token: &str,
        new_password: &str,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let hash = password::hash_password(new_password).map_err(AppError::Internal)?;

        let txn = db.begin().await?;
        let record = Self::consume_reset_token(&txn, token).await?;
        let user = Self::find_by_id(&txn, record.user_id).await?;
        let user_id = Self::store_password_hash(&txn, user, hash, "password_reset", meta).await?;
        txn.commit().await?;

        tracing::info!(user_id, "password reset");
        Ok(())
    }

    /// Retourne le profil et un booléen indiquant si l'e-mail a changé
    pub async fn update_profile(
        db: &DatabaseConnection,
        config: &AppConfig,
        mailer: &dyn Mailer,
        user_id: i32,
        update: ProfileUpdate,
        meta: &RequestMeta,
    ) -> Result<(users::Model, bool), AppError> {
        let txn = db.begin().await?;
        let user = Self::find_by_id(&txn, user_id).await?;
        let email = update.email.trim().to_lowercase();
        let email_changed = email != user.email;
        if email_changed {
            Self::ensure_unique(&txn, &user.username, &email, Some(user_id)).await?;
        }

        let mut active: users::ActiveModel = user.into();
        active.name = Set(super::non_empty(update.name));
        active.bio = Set(super::non_empty(update.bio));
        active.updated_at = Set(Some(super::now()));
        let mut token = None;
        if email_changed {
            active.email = Set(email);
            active.is_email_verified = Set(false);
            token = Some(Self::create_verification_token(&txn, user_id, config.verification_token_hours).await?);
        }
        let user = active.update(&txn).await?;
        ActivityService::record(&txn, user_id, "profile_update", None, meta, None).await?;
        txn.commit().await?;

        if let Some(token) = token {
            Self::send_verification(config, mailer, &user, &token).await;
        }
        tracing::info!(user_id, email_changed, "profile updated");
        Ok((user, email_changed))
    }

    /// Remplace la photo de profil; l'ancienne est supprimée après le commit
    pub async fn set_profile_picture(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        filename: &str,
        content_base64: &str,
    ) -> Result<users::Model, AppError> {
        let user = Self::find_by_id(db, user_id).await?;
        let stored = storage
            .save_base64(Folder::ProfilePics, UploadKind::Image, filename, content_base64)
            .await?;

        let previous = user.profile_picture.clone();
        let mut active: users::ActiveModel = user.into();
        active.profile_picture = Set(Some(stored.stored_name.clone()));
        active.updated_at = Set(Some(super::now()));
        let user = match active.update(db).await {
            Ok(user) => user,
            Err(e) => {
                storage.remove(Folder::ProfilePics, &stored.stored_name).await;
                return Err(e.into());
            }
        };

        if let Some(previous) = previous {
            storage.remove(Folder::ProfilePics, &previous).await;
        }
        tracing::info!(user_id, "profile picture updated");
        Ok(user)
    }

    pub async fn list_api_keys(db: &DatabaseConnection, user_id: i32) -> Result<Vec<api_key::Model>, DbErr> {
        api_key::Entity::find()
            .filter(api_key::Column::UserId.eq(user_id))
            .order_by_desc(api_key::Column::CreatedAt)
            .all(db)
            .await
    }

    pub async fn create_api_key(
        db: &DatabaseConnection,
        user_id: i32,
        name: &str,
        expiration_days: Option<i64>,
        meta: &RequestMeta,
    ) -> Result<api_key::Model, AppError> {
        let now = super::now();
        let days = expiration_days.unwrap_or(API_KEY_DEFAULT_DAYS);
        let txn = db.begin().await?;
        let key = api_key::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.trim().to_string()),
            key: Set(tokens::new_token()),
            created_at: Set(now),
            expires_at: Set(Some(now + Duration::days(days))),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        ActivityService::record(&txn, user_id, "api_key_create", Some(key.name.clone()), meta, None).await?;
        txn.commit().await?;
        Ok(key)
    }

    pub async fn delete_api_key(
        db: &DatabaseConnection,
        user_id: i32,
        key_id: i32,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let txn = db.begin().await?;
        let key = api_key::Entity::find_by_id(key_id)
            .filter(api_key::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("API key"))?;
        let name = key.name.clone();
        key.delete(&txn).await?;
        ActivityService::record(&txn, user_id, "api_key_delete", Some(name), meta, None).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingMailer, create_user, setup_test_db, test_config, TEST_PASSWORD};

    #[actix_web::test]
    async fn register_sends_verification_and_blocks_login() {
        let db = setup_test_db().await;
        let config = test_config();
        let mailer = RecordingMailer::default();
        let meta = RequestMeta::default();

        let user = UserService::register(&db, &config, &mailer, "dave", "Dave@Example.com", "password123", &meta)
            .await
            .unwrap();
        assert_eq!(user.email, "dave@example.com");
        assert_eq!(user.role, UserRole::User);
        assert_eq!(mailer.sent().len(), 1);

        let login = UserService::login(&db, "dave", "password123", &meta).await;
        assert!(matches!(login, Err(AppError::Forbidden(_))));
    }

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let db = setup_test_db().await;
        let config = test_config();
        let mailer = RecordingMailer::default();
        let meta = RequestMeta::default();
        create_user(&db, "erin", UserRole::User).await;

        let again = UserService::register(&db, &config, &mailer, "other", "ERIN@example.com", "password123", &meta).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[actix_web::test]
    async fn verification_token_unlocks_login_once() {
        let db = setup_test_db().await;
        let config = test_config();
        let mailer = RecordingMailer::default();
        let meta = RequestMeta::default();
        let user = UserService::register(&db, &config, &mailer, "fred", "fred@example.com", "password123", &meta)
            .await
            .unwrap();

        let token = email_verification_tokens::Entity::find()
            .filter(email_verification_tokens::Column::UserId.eq(user.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .token;

        UserService::verify_email(&db, &token, &meta).await.unwrap();
        assert!(UserService::verify_email(&db, &token, &meta).await.is_err());

        let logged_in = UserService::login(&db, "fred", "password123", &meta).await.unwrap();
        assert!(logged_in.last_login.is_some());
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let db = setup_test_db().await;
        create_user(&db, "gina", UserRole::User).await;

        let result = UserService::login(&db, "gina", "not-the-password", &RequestMeta::default()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        let ok = UserService::login(&db, "gina", TEST_PASSWORD, &RequestMeta::default()).await;
        assert!(ok.is_ok());
    }

    #[actix_web::test]
    async fn unknown_user_gets_the_same_error_as_a_wrong_password() {
        let db = setup_test_db().await;
        create_user(&db, "gina", UserRole::User).await;
        let meta = RequestMeta::default();

        let unknown = UserService::login(&db, "ghost", TEST_PASSWORD, &meta).await;
        let wrong = UserService::login(&db, "gina", "not-the-password", &meta).await;
        match (unknown, wrong) {
            (Err(AppError::Unauthorized(a)), Err(AppError::Unauthorized(b))) => assert_eq!(a, b),
            other => panic!("unexpected login results: {:?}", other),
        }
    }

    #[actix_web::test]
    async fn password_reset_flow() {
        let db = setup_test_db().await;
        let config = test_config();
        let mailer = RecordingMailer::default();
        let meta = RequestMeta::default();
        let user = create_user(&db, "hank", UserRole::User).await;

        UserService::forgot_password(&db, &config, &mailer, "nobody@example.com").await.unwrap();
        assert!(mailer.sent().is_empty());

        UserService::forgot_password(&db, &config, &mailer, &user.email).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);

        let token = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::UserId.eq(user.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .token;
        UserService::reset_password(&db, &token, "brand-new-pass", &meta).await.unwrap();
        assert!(UserService::reset_password(&db, &token, "another-pass", &meta).await.is_err());

        assert!(UserService::login(&db, "hank", "brand-new-pass", &meta).await.is_ok());
    }

    #[actix_web::test]
    async fn reset_token_survives_a_rolled_back_reset() {
        let db = setup_test_db().await;
        let config = test_config();
        let mailer = RecordingMailer::default();
        let meta = RequestMeta::default();
        let user = create_user(&db, "iris", UserRole::User).await;
        UserService::forgot_password(&db, &config, &mailer, &user.email).await.unwrap();
        let token = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::UserId.eq(user.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .token;

        // consommé puis abandonné sans commit
        {
            let txn = db.begin().await.unwrap();
            UserService::consume_reset_token(&txn, &token).await.unwrap();
            assert!(UserService::consume_reset_token(&txn, &token).await.is_err());
            txn.rollback().await.unwrap();
        }
        assert!(UserService::login(&db, "iris", TEST_PASSWORD, &meta).await.is_ok());

        UserService::reset_password(&db, &token, "fresh-password", &meta).await.unwrap();
        assert!(UserService::login(&db, "iris", "fresh-password", &meta).await.is_ok());
        assert!(UserService::reset_password(&db, &token, "third-password", &meta).await.is_err());
        assert!(UserService::login(&db, "iris", "fresh-password", &meta).await.is_ok());
    }

    #[actix_web::test]
    async fn changing_email_clears_verification() {
        let db = setup_test_db().await;
        let config = test_config();
        let mailer = RecordingMailer::default();
        let user = create_user(&db, "ivy", UserRole::User).await;

        let (updated, changed) = UserService::update_profile(
            &db,
            &config,
            &mailer,
            user.id,
            ProfileUpdate {
                name: Some("Ivy".to_string()),
                email: "new-ivy@example.com".to_string(),
                bio: None,
            },
            &RequestMeta::default(),
        )
        .await
        .unwrap();

        assert!(changed);
        assert!(!updated.is_email_verified);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[actix_web::test]
    async fn api_keys_are_scoped_to_owner() {
        let db = setup_test_db().await;
        let meta = RequestMeta::default();
        let owner = create_user(&db, "jack", UserRole::User).await;
        let other = create_user(&db, "kate", UserRole::User).await;

        let key = UserService::create_api_key(&db, owner.id, "cli", None, &meta).await.unwrap();
        assert_eq!(key.key.len(), 32);
        assert!(key.is_valid(crate::services::now()));

        let foreign = UserService::delete_api_key(&db, other.id, key.id, &meta).await;
        assert!(matches!(foreign, Err(AppError::NotFound(_))));
        UserService::delete_api_key(&db, owner.id, key.id, &meta).await.unwrap();
        assert!(UserService::list_api_keys(&db, owner.id).await.unwrap().is_empty());
    }
}
