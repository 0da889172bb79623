// Configuration lue depuis l'environnement (.env chargé dans main)

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const INSECURE_JWT_SECRET: &str = "default-insecure-key-change-this";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub upload_folder: PathBuf,
    pub profile_pics_folder: PathBuf,
    /// Taille max d'un fichier uploadé, en octets (après décodage base64)
    pub max_content_length: usize,
    pub allowed_extensions: HashSet<String>,
    pub allowed_image_extensions: HashSet<String>,
    pub items_per_page: u64,
    pub per_page_trades: u64,
    pub mail_default_sender: String,
    pub public_base_url: String,
    pub verification_token_hours: i64,
    pub reset_token_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not found in environment, using default (INSECURE)");
            INSECURE_JWT_SECRET.to_string()
        });

        AppConfig {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://instance/app.db?mode=rwc".to_string()),
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            jwt_secret,
            jwt_ttl_hours: env_or("JWT_TTL_HOURS", 24),
            upload_folder: PathBuf::from(
                env::var("UPLOAD_FOLDER").unwrap_or_else(|_| "instance/uploads".to_string()),
            ),
            profile_pics_folder: PathBuf::from(
                env::var("PROFILE_PICS_FOLDER").unwrap_or_else(|_| "instance/profile_pics".to_string()),
            ),
            max_content_length: env_or("MAX_CONTENT_LENGTH", 16 * 1024 * 1024),
            allowed_extensions: extension_set(
                &env::var("ALLOWED_EXTENSIONS")
                    .unwrap_or_else(|_| "pdf,png,jpg,jpeg,doc,docx,xls,xlsx,txt,csv".to_string()),
            ),
            allowed_image_extensions: extension_set("png,jpg,jpeg,gif"),
            items_per_page: env_or("ITEMS_PER_PAGE", 10),
            per_page_trades: env_or("PER_PAGE_TRADES", 25),
            mail_default_sender: env::var("MAIL_DEFAULT_SENDER")
                .unwrap_or_else(|_| "noreply@example.com".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),
            verification_token_hours: env_or("VERIFICATION_TOKEN_HOURS", 24),
            reset_token_hours: env_or("RESET_TOKEN_HOURS", 1),
        }
    }

    /// Limite de body JSON: le base64 grossit le contenu d'un tiers
    pub fn json_body_limit(&self) -> usize {
        self.max_content_length / 3 * 4 + 64 * 1024
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn extension_set(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
