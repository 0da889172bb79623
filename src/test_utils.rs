// Outils partagés par les tests: base SQLite en mémoire, fixtures, mailer espion

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};
use serde_json::json;

use crate::config::AppConfig;
use crate::db;
use crate::error::AppError;
use crate::models::dto::{TradeRequest, TradingModelRequest};
use crate::models::trade::Direction;
use crate::models::trading_model;
use crate::models::users::{self, UserRole};
use crate::services::mailer::{MailMessage, Mailer};
use crate::services::storage::FileStorage;
use crate::services::user_service::{NewUser, UserService};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Base en mémoire avec le schéma complet et les valeurs par défaut
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db::create_schema(&db).await.expect("Failed to create schema");
    db::seed_defaults(&db).await.expect("Failed to seed defaults");
    db
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_ttl_hours: 1,
        upload_folder: PathBuf::from("instance/test-uploads"),
        profile_pics_folder: PathBuf::from("instance/test-profile-pics"),
        max_content_length: 1024 * 1024,
        allowed_extensions: ["pdf", "png", "jpg", "jpeg", "txt", "csv"]
            .into_iter()
            .map(String::from)
            .collect(),
        allowed_image_extensions: ["png", "jpg", "jpeg", "gif"].into_iter().map(String::from).collect(),
        items_per_page: 10,
        per_page_trades: 25,
        mail_default_sender: "noreply@example.com".to_string(),
        public_base_url: "http://localhost:8080".to_string(),
        verification_token_hours: 24,
        reset_token_hours: 1,
    }
}

/// Stockage dont les deux dossiers vivent sous `dir`
pub fn test_storage(dir: &Path) -> FileStorage {
    let mut config = test_config();
    config.upload_folder = dir.join("uploads");
    config.profile_pics_folder = dir.join("profile_pics");
    FileStorage::new(&config)
}

/// Compte actif et vérifié, e-mail `<username>@example.com`
pub async fn create_user(db: &DatabaseConnection, username: &str, role: UserRole) -> users::Model {
    UserService::insert_user(
        db,
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: TEST_PASSWORD.to_string(),
            name: None,
            role,
            is_active: true,
            is_email_verified: true,
        },
    )
    .await
    .expect("Failed to create test user")
}

/// Trade fermé: 2 contrats achetés à 100, revendus à 105, point value 20
pub fn trade_request(direction: Direction) -> TradeRequest {
    serde_json::from_value(json!({
        "instrument": "NQ",
        "trade_date": NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date"),
        "direction": direction,
        "point_value": 20.0,
        "initial_stop_loss": if direction == Direction::Long { 98.0 } else { 102.0 },
        "terminus_target": if direction == Direction::Long { 110.0 } else { 90.0 },
        "how_closed": "TP",
        "rules_rating": 4,
        "entries": [
            {"entry_time": "09:30:00", "contracts": 2, "entry_price": 100.0}
        ],
        "exits": [
            {"exit_time": "10:15:00", "contracts": 2, "exit_price": 105.0}
        ]
    }))
    .expect("valid trade request")
}

pub fn trading_model_request(name: &str) -> TradingModelRequest {
    serde_json::from_value(json!({
        "name": name,
        "entry_trigger_description": "Break of the opening range",
        "stop_loss_strategy": "Below the range low",
        "take_profit_strategy": "2R",
        "min_risk_reward_ratio": 2.0
    }))
    .expect("valid trading model request")
}

pub async fn create_trading_model(db: &DatabaseConnection, user_id: i32, name: &str) -> trading_model::Model {
    crate::services::trading_model_service::TradingModelService::create(
        db,
        user_id,
        trading_model_request(name),
        &crate::middleware::RequestMeta::default(),
    )
    .await
    .expect("Failed to create trading model")
}

/// Garde les messages au lieu de les envoyer
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().expect("mailer lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), AppError> {
        self.sent.lock().expect("mailer lock").push(message);
        Ok(())
    }
}
