// ============================================================================
// MODÈLE : DAILY JOURNAL
// ============================================================================
//
// Description:
//   Journal quotidien: préparation pré-market, lecture des sessions
//   (Asia, London, NY1, NY2), scénario P12 et revue de fin de journée.
//
// Points d'attention:
//   - (user_id, journal_date) est unique: un second enregistrement pour la
//     même date met à jour la ligne existante (upsert dans JournalService)
//   - Les images (pre_market / eod_chart) sont dans daily_journal_image
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_journal")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub user_id: i32,
    pub journal_date: Date,

    // Pré-market
    pub key_events: Option<String>,
    pub key_tasks: Option<String>,
    pub on_my_mind: Option<String>,
    pub important_focus: Option<String>,
    pub key_strengths: Option<String>,
    pub mental_feeling_rating: Option<i32>,
    pub mental_mind_rating: Option<i32>,
    pub mental_energy_rating: Option<i32>,
    pub mental_motivation_rating: Option<i32>,

    // Sessions
    pub asia_direction: String,
    pub asia_session_status: String,
    pub asia_model_status: String,
    pub asia_actual_range_points: Option<f64>,
    pub asia_actual_range_percentage: Option<f64>,
    pub asia_median_range_input_note: Option<String>,
    pub london_direction: String,
    pub london_session_status: String,
    pub london_model_status: String,
    pub london_actual_range_points: Option<f64>,
    pub london_actual_range_percentage: Option<f64>,
    pub london_median_range_input_note: Option<String>,
    pub ny1_direction: String,
    pub ny1_session_status: String,
    pub ny1_model_status: String,
    pub ny1_actual_range_points: Option<f64>,
    pub ny1_actual_range_percentage: Option<f64>,
    pub ny1_median_range_input_note: Option<String>,
    pub ny2_direction: String,
    pub ny2_session_status: String,
    pub ny2_model_status: String,
    pub ny2_actual_range_points: Option<f64>,
    pub ny2_actual_range_percentage: Option<f64>,
    pub ny2_median_range_input_note: Option<String>,

    // Range du jour
    pub adr_10_day_median_range_value: Option<f64>,
    pub todays_total_range_points: Option<f64>,
    pub todays_total_range_percentage: Option<f64>,

    // Scénario P12
    pub p12_scenario_selected: String,
    pub p12_expected_outcomes: Option<String>,
    pub realistic_expectance_notes: Option<String>,
    pub engagement_structure_notes: Option<String>,

    // Revue de fin de journée
    pub did_well_today: Option<String>,
    pub did_not_go_well_today: Option<String>,
    pub learned_today: Option<String>,
    pub improve_action_next_day: Option<String>,
    pub market_observations: Option<String>,
    pub self_observations: Option<String>,

    // Scorecard psy (1 à 5)
    pub review_psych_discipline_rating: Option<i32>,
    pub review_psych_motivation_rating: Option<i32>,
    pub review_psych_focus_rating: Option<i32>,
    pub review_psych_mastery_rating: Option<i32>,
    pub review_psych_composure_rating: Option<i32>,
    pub review_psych_resilience_rating: Option<i32>,
    pub review_psych_mind_rating: Option<i32>,
    pub review_psych_energy_rating: Option<i32>,
}

pub const PSYCH_LABELS: [&str; 8] = [
    "Discipline", "Motivation", "Focus", "Mastery", "Composure", "Resilience", "Mind", "Energy",
];

impl Model {
    /// Notes psy dans l'ordre de PSYCH_LABELS
    pub fn psych_ratings(&self) -> [Option<i32>; 8] {
        [
            self.review_psych_discipline_rating,
            self.review_psych_motivation_rating,
            self.review_psych_focus_rating,
            self.review_psych_mastery_rating,
            self.review_psych_composure_rating,
            self.review_psych_resilience_rating,
            self.review_psych_mind_rating,
            self.review_psych_energy_rating,
        ]
    }

    /// Moyenne des notes psy valides (1..=5), None si aucune
    pub fn average_review_psych_rating(&self) -> Option<f64> {
        let valid: Vec<i32> = self
            .psych_ratings()
            .into_iter()
            .flatten()
            .filter(|r| (1..=5).contains(r))
            .collect();
        if valid.is_empty() {
            return None;
        }
        Some(valid.iter().sum::<i32>() as f64 / valid.len() as f64)
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

    #[sea_orm(has_many = "super::daily_journal_image::Entity")]
    DailyJournalImage,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::daily_journal_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyJournalImage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
