// Structures d'entrée/sortie de l'API (trades, modèles, fichiers, pagination)
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::trade::{Direction, HOW_CLOSED_CHOICES};
use crate::models::{entry_point, exit_point, trade, trade_image};
use crate::services::trade_metrics::TradeMetrics;
use crate::utils::serde_time;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    /// Numéro de page à partir de 1
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

// ---------------------------------------------------------------------------
// Uploads (contenu encodé en base64 dans le JSON)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct UploadRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1, message = "No file selected."))]
    pub content_base64: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImageUploadRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1, message = "No file selected."))]
    pub content_base64: String,
    #[validate(length(max = 255))]
    pub caption: Option<String>,
    /// Uniquement pour les images de journal: 'pre_market' | 'eod_chart'
    pub image_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Plafond de contrats par fill
pub const MAX_CONTRACTS: i32 = 100_000;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EntryInput {
    /// Absent: nouvelle entrée. Présent: entrée existante à mettre à jour.
    pub id: Option<i32>,
    #[serde(deserialize_with = "serde_time::deserialize")]
    pub entry_time: NaiveTime,
    #[validate(range(min = 1, max = MAX_CONTRACTS, message = "Contracts must be between 1 and 100000."))]
    pub contracts: i32,
    pub entry_price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExitInput {
    pub id: Option<i32>,
    #[serde(default, deserialize_with = "serde_time::option::deserialize")]
    pub exit_time: Option<NaiveTime>,
    #[validate(range(min = 1, max = MAX_CONTRACTS, message = "Contracts must be between 1 and 100000."))]
    pub contracts: Option<i32>,
    pub exit_price: Option<f64>,
}

impl ExitInput {
    pub fn is_complete(&self) -> bool {
        self.exit_time.is_some() && self.contracts.is_some() && self.exit_price.is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.exit_time.is_none() && self.contracts.is_none() && self.exit_price.is_none()
    }
}

fn validate_how_closed(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || HOW_CLOSED_CHOICES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("how_closed").with_message("Not a valid choice.".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TradeRequest {
    #[validate(length(min = 1, max = 20, message = "Please select an instrument."))]
    pub instrument: String,
    pub trade_date: NaiveDate,
    pub direction: Direction,
    #[validate(range(min = 0.0))]
    pub point_value: Option<f64>,
    pub trading_model_id: Option<i32>,
    pub initial_stop_loss: Option<f64>,
    pub terminus_target: Option<f64>,
    #[serde(default)]
    pub is_dca: bool,
    pub mae: Option<f64>,
    pub mfe: Option<f64>,
    #[validate(custom(function = "validate_how_closed"))]
    pub how_closed: Option<String>,
    #[validate(length(max = 100))]
    pub news_event: Option<String>,

    #[validate(range(min = 1, max = 5))]
    pub rules_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub management_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub target_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub entry_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub preparation_rating: Option<i32>,

    pub trade_notes: Option<String>,
    pub psych_scored_highest: Option<String>,
    pub psych_scored_lowest: Option<String>,
    pub overall_analysis_notes: Option<String>,
    pub trade_management_notes: Option<String>,
    pub errors_notes: Option<String>,
    pub improvements_notes: Option<String>,
    #[validate(length(max = 255))]
    pub screenshot_link: Option<String>,
    #[validate(length(max = 255))]
    pub tags: Option<String>,

    #[validate(length(min = 1, message = "At least one entry is required."), nested)]
    pub entries: Vec<EntryInput>,
    #[serde(default)]
    #[validate(nested)]
    pub exits: Vec<ExitInput>,
}

/// Trade complet renvoyé par l'API: colonnes + fills + images + métriques
#[derive(Debug, Serialize)]
pub struct TradeResponse {
    #[serde(flatten)]
    pub trade: trade::Model,
    pub trading_model_name: Option<String>,
    pub entries: Vec<entry_point::Model>,
    pub exits: Vec<exit_point::Model>,
    pub images: Vec<trade_image::Model>,
    pub metrics: TradeMetrics,
}

// ---------------------------------------------------------------------------
// Trading models
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TradingModelRequest {
    #[validate(length(min = 1, max = 150, message = "Model name is required (max 150 characters)."))]
    pub name: String,
    #[validate(length(max = 50))]
    pub version: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,

    pub overview_logic: Option<String>,
    #[validate(length(max = 50))]
    pub primary_chart_tf: Option<String>,
    #[validate(length(max = 50))]
    pub execution_chart_tf: Option<String>,
    #[validate(length(max = 50))]
    pub context_chart_tf: Option<String>,

    pub technical_indicators_used: Option<String>,
    pub chart_patterns_used: Option<String>,
    pub price_action_signals: Option<String>,
    pub key_levels_identification: Option<String>,
    pub volume_analysis_notes: Option<String>,
    pub fundamental_analysis_notes: Option<String>,

    pub instrument_applicability: Option<String>,
    pub session_applicability: Option<String>,
    pub optimal_market_conditions: Option<String>,
    pub sub_optimal_market_conditions: Option<String>,

    #[validate(length(min = 1, message = "This field is required."))]
    pub entry_trigger_description: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub stop_loss_strategy: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub take_profit_strategy: String,
    #[validate(range(min = 0.0, message = "R:R must be a positive number or zero."))]
    pub min_risk_reward_ratio: Option<f64>,
    pub position_sizing_rules: Option<String>,
    pub scaling_in_out_rules: Option<String>,

    pub trade_management_breakeven_rules: Option<String>,
    pub trade_management_trailing_stop_rules: Option<String>,
    pub trade_management_partial_profit_rules: Option<String>,
    pub trade_management_adverse_price_action: Option<String>,

    #[validate(length(max = 100))]
    pub model_max_loss_per_trade: Option<String>,
    #[validate(length(max = 100))]
    pub model_max_daily_loss: Option<String>,
    #[validate(length(max = 100))]
    pub model_max_weekly_loss: Option<String>,
    #[validate(length(max = 100))]
    pub model_consecutive_loss_limit: Option<String>,
    pub model_action_on_max_drawdown: Option<String>,

    pub pre_trade_checklist: Option<String>,
    pub order_types_used: Option<String>,
    pub broker_platform_notes: Option<String>,
    pub execution_confirmation_notes: Option<String>,
    pub post_trade_routine_model: Option<String>,

    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub backtesting_forwardtesting_notes: Option<String>,
    pub refinements_learnings: Option<String>,
}
