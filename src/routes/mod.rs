pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod file;
pub mod health;
pub mod journal;
pub mod news_event;
pub mod settings;
pub mod trade;
pub mod trading_model;

use actix_web::{HttpResponse, web};

use crate::config::AppConfig;
use crate::error::AppError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .service(dashboard::dashboard)
            .service(settings::get_settings)
            .service(settings::update_settings)
            .configure(auth::auth_routes)
            .configure(trade::trade_routes)
            .configure(trading_model::trading_model_routes)
            .configure(journal::journal_routes)
            .configure(admin::admin_routes)
            .configure(news_event::news_event_routes)
            .configure(file::file_routes)
            .default_service(web::to(not_found)),
    );
}

/// Réponse JSON pour toute route inconnue
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "Not Found" }))
}

/// Limite de taille et erreurs de parsing JSON renvoyées en 400 lisible
pub fn json_config(config: &AppConfig) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(config.json_body_limit())
        .error_handler(|err, req| {
            tracing::debug!(path = %req.path(), error = %err, "rejected JSON body");
            AppError::BadRequest(format!("Invalid request body: {}", err)).into()
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use sea_orm::DatabaseConnection;
    use serde_json::{Value, json};

    use super::*;
    use crate::middleware::RequestMeta;
    use crate::models::trade::Direction;
    use crate::models::users::{self, UserRole};
    use crate::services::mailer::Mailer;
    use crate::services::trade_service::TradeService;
    use crate::test_utils::{
        RecordingMailer, TEST_PASSWORD, create_user, setup_test_db, test_config, test_storage, trade_request,
    };
    use crate::utils::jwt;

    fn bearer(user: &users::Model) -> (&'static str, String) {
        let config = test_config();
        let token = jwt::generate_token(user.id, &user.username, user.role, &config.jwt_secret, 1)
            .expect("token");
        ("Authorization", format!("Bearer {}", token))
    }

    macro_rules! test_app {
        ($db:expr, $dir:expr, $mailer:expr) => {{
            let config = test_config();
            test::init_service(
                App::new()
                    .app_data(json_config(&config))
                    .app_data(web::Data::new($db.clone()))
                    .app_data(web::Data::new(config))
                    .app_data(web::Data::new(test_storage($dir)))
                    .app_data(web::Data::from($mailer.clone() as Arc<dyn Mailer>))
                    .configure(configure_routes),
            )
            .await
        }};
    }

    async fn fixture() -> (DatabaseConnection, tempfile::TempDir, Arc<RecordingMailer>) {
        (
            setup_test_db().await,
            tempfile::tempdir().expect("tempdir"),
            Arc::new(RecordingMailer::default()),
        )
    }

    #[actix_web::test]
    async fn health_reports_database_up() {
        let (db, dir, mailer) = fixture().await;
        let app = test_app!(db, dir.path(), mailer);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "up");
    }

    #[actix_web::test]
    async fn unknown_api_route_is_json_404() {
        let (db, dir, mailer) = fixture().await;
        let app = test_app!(db, dir.path(), mailer);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/nope").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Not Found");
    }

    #[actix_web::test]
    async fn protected_routes_need_a_valid_token() {
        let (db, dir, mailer) = fixture().await;
        let app = test_app!(db, dir.path(), mailer);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/trades").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/trades")
                .insert_header(("Authorization", "Bearer not-a-jwt"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn role_gates_on_admin_and_news_events() {
        let (db, dir, mailer) = fixture().await;
        let user = create_user(&db, "plain", UserRole::User).await;
        let editor = create_user(&db, "editor", UserRole::Editor).await;
        let admin = create_user(&db, "boss", UserRole::Admin).await;
        let app = test_app!(db, dir.path(), mailer);

        let req = test::TestRequest::get().uri("/api/admin/dashboard").insert_header(bearer(&user));
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get().uri("/api/admin/dashboard").insert_header(bearer(&admin));
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let counts: Value = test::read_body_json(resp).await;
        assert_eq!(counts["total_users"], 3);
        assert_eq!(counts["admin_users"], 1);

        let event = json!({ "name": "ECB Rate Decision", "default_release_time": "07:45" });
        let req = test::TestRequest::post()
            .uri("/api/news-events")
            .insert_header(bearer(&user))
            .set_json(&event);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/news-events")
            .insert_header(bearer(&editor))
            .set_json(&event);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/api/news-events").insert_header(bearer(&user));
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let events: Value = test::read_body_json(resp).await;
        assert!(events.as_array().expect("list").iter().any(|e| e["name"] == "ECB Rate Decision"));
    }

    #[actix_web::test]
    async fn stale_token_loses_rights_after_demotion() {
        let (db, dir, mailer) = fixture().await;
        let boss = create_user(&db, "boss", UserRole::Admin).await;
        let demoted = create_user(&db, "demoted", UserRole::Admin).await;
        let old_token = bearer(&demoted);
        let app = test_app!(db, dir.path(), mailer);

        let req = test::TestRequest::get().uri("/api/admin/users").insert_header(old_token.clone());
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::OK);

        // rétrogradé mais actif: 403 avec l'ancien token
        let update = json!({
            "username": "demoted",
            "email": "demoted@example.com",
            "role": "user",
            "is_active": true,
        });
        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/users/{}", demoted.id))
            .insert_header(bearer(&boss))
            .set_json(&update);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/admin/users").insert_header(old_token.clone());
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::FORBIDDEN);

        // désactivé: le token ne vaut plus rien
        let update = json!({
            "username": "demoted",
            "email": "demoted@example.com",
            "role": "user",
            "is_active": false,
        });
        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/users/{}", demoted.id))
            .insert_header(bearer(&boss))
            .set_json(&update);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/admin/users").insert_header(old_token.clone());
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::UNAUTHORIZED);
        let req = test::TestRequest::get().uri("/api/trades").insert_header(old_token);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn token_of_deleted_user_is_rejected() {
        let (db, dir, mailer) = fixture().await;
        let boss = create_user(&db, "boss", UserRole::Admin).await;
        let gone = create_user(&db, "gone", UserRole::Editor).await;
        let old_token = bearer(&gone);
        let app = test_app!(db, dir.path(), mailer);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/admin/users/{}", gone.id))
            .insert_header(bearer(&boss));
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get().uri("/api/auth/me").insert_header(old_token.clone());
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/news-events")
            .insert_header(old_token)
            .set_json(json!({ "name": "ECB Rate Decision", "default_release_time": "07:45" }));
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn registration_needs_verification_before_login() {
        let (db, dir, mailer) = fixture().await;
        let app = test_app!(db, dir.path(), mailer);

        let req = test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "newbie",
            "email": "newbie@example.com",
            "password": TEST_PASSWORD,
            "confirm_password": TEST_PASSWORD,
        }));
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::CREATED);
        assert_eq!(mailer.sent().len(), 1);

        let login = json!({ "username": "newbie", "password": TEST_PASSWORD });
        let req = test::TestRequest::post().uri("/api/auth/login").set_json(&login);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::FORBIDDEN);

        let bad = json!({ "username": "newbie", "password": "wrong-password" });
        let req = test::TestRequest::post().uri("/api/auth/login").set_json(&bad);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn malformed_json_is_a_bad_request() {
        let (db, dir, mailer) = fixture().await;
        let admin = create_user(&db, "boss", UserRole::Admin).await;
        let app = test_app!(db, dir.path(), mailer);

        let req = test::TestRequest::post()
            .uri("/api/admin/users/bulk-delete")
            .insert_header(bearer(&admin))
            .set_json(json!({ "user_ids": "1,2" }));
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().expect("message").starts_with("Invalid request body"));
    }

    #[actix_web::test]
    async fn daily_journal_upsert_over_http() {
        let (db, dir, mailer) = fixture().await;
        let user = create_user(&db, "journaler", UserRole::User).await;
        TradeService::create(&db, user.id, trade_request(Direction::Long), &RequestMeta::default())
            .await
            .expect("trade");
        let app = test_app!(db, dir.path(), mailer);

        let body = json!({ "key_events": "FOMC", "mental_feeling_rating": 4 });
        let req = test::TestRequest::put()
            .uri("/api/journal/daily/2024-03-04")
            .insert_header(bearer(&user))
            .set_json(&body);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::put()
            .uri("/api/journal/daily/2024-03-04")
            .insert_header(bearer(&user))
            .set_json(&body);
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/journal/daily/2024-03-04")
            .insert_header(bearer(&user));
        let resp = test::call_service(&app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: Value = test::read_body_json(resp).await;
        assert_eq!(view["journal"]["key_events"], "FOMC");
        assert_eq!(view["trades"].as_array().expect("trades").len(), 1);

        let req = test::TestRequest::put()
            .uri("/api/journal/daily/2024-03-04")
            .insert_header(bearer(&user))
            .set_json(json!({ "mental_feeling_rating": 9 }));
        assert_eq!(test::call_service(&app, req.to_request()).await.status(), StatusCode::BAD_REQUEST);
    }
}
