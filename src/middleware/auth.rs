use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::users::UserRole;
use crate::services::user_service::UserService;
use crate::utils::jwt;

/// Structure qui contient les infos de l'utilisateur authentifié
/// Utilisée comme extracteur dans les routes protégées
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
}

/// Extracteur réservé aux éditeurs (et admins)
#[derive(Debug, Clone)]
pub struct EditorUser(pub AuthUser);

/// Extracteur réservé aux admins
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Lit le header Bearer et renvoie l'id porté par le JWT
fn bearer_user_id(req: &HttpRequest) -> Result<i32, AppError> {
    // 1. Extraire le header Authorization
    let auth_header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".to_string()))?;

    // 2. Format: "Bearer <token>"
    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Invalid Authorization format (expected: Bearer <token>)".to_string())
    })?;

    // 3. Vérifier le token avec le secret de la config
    let config = req
        .app_data::<web::Data<AppConfig>>()
        .ok_or_else(|| AppError::Internal("AppConfig not registered".to_string()))?;

    let claims = jwt::verify_token(token, &config.jwt_secret).map_err(AppError::Unauthorized)?;
    Ok(claims.sub)
}

/// Le rôle et le statut viennent de la base, pas des claims :
/// un token émis avant une rétrogradation ne garde pas ses droits.
fn authenticate(req: &HttpRequest) -> LocalBoxFuture<'static, Result<AuthUser, AppError>> {
    let user_id = bearer_user_id(req);
    let db = req.app_data::<web::Data<DatabaseConnection>>().cloned();

    Box::pin(async move {
        let user_id = user_id?;
        let db = db.ok_or_else(|| AppError::Internal("Database not registered".to_string()))?;

        let user = match UserService::find_by_id(db.get_ref(), user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Unauthorized("User no longer exists".to_string()));
            }
            Err(e) => return Err(e),
        };
        if !user.is_active {
            tracing::warn!(user_id, "token presented for a deactivated account");
            return Err(AppError::Unauthorized("Account is deactivated".to_string()));
        }

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            role: user.role,
        })
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        authenticate(req)
    }
}

impl FromRequest for EditorUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = authenticate(req);
        let path = req.path().to_string();
        Box::pin(async move {
            let user = user.await?;
            if user.role.is_editor() {
                Ok(EditorUser(user))
            } else {
                tracing::warn!(user = %user.username, %path, "editor access denied");
                Err(AppError::Forbidden("Editor access required".to_string()))
            }
        })
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = authenticate(req);
        let path = req.path().to_string();
        Box::pin(async move {
            let user = user.await?;
            if user.role.is_admin() {
                Ok(AdminUser(user))
            } else {
                tracing::warn!(user = %user.username, %path, "admin access denied");
                Err(AppError::Forbidden("You do not have permission to access this page.".to_string()))
            }
        })
    }
}

/// IP et user agent du client, pour le journal d'audit
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_http(req: &HttpRequest) -> Self {
        RequestMeta {
            ip_address: req.connection_info().realip_remote_addr().map(str::to_string),
            user_agent: req
                .headers()
                .get("User-Agent")
                .and_then(|v| v.to_str().ok())
                .map(|ua| ua.chars().take(255).collect()),
        }
    }
}
