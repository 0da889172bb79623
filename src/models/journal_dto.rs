// Structures d'entrée des journaux (quotidien, hebdo, mensuel, trimestriel, annuel)
use serde::Deserialize;
use validator::{Validate, ValidationError};

pub const NO_CHOICE: &str = "None";
pub const SESSION_DIRECTIONS: [&str; 3] = [NO_CHOICE, "Long", "Short"];
pub const SESSION_STATUSES: [&str; 3] = [NO_CHOICE, "True", "False"];
pub const SESSION_MODEL_STATUSES: [&str; 3] = [NO_CHOICE, "Valid", "Broken"];
pub const P12_SCENARIOS: [&str; 11] = [
    NO_CHOICE, "1A", "1B", "2A", "2B", "3A", "3B", "4A", "4B", "5A", "5B",
];

pub const P12_COMMON_TARGET_INFO: &str =
    "Once the confirmation is in you will target 0.5% with stop loss at 0.35%.";

/// Texte attendu pour un scénario P12 ("None" ou inconnu: None)
pub fn p12_outcome(scenario: &str) -> Option<&'static str> {
    let text = match scenario {
        "1A" | "3A" | "4A" => "Between 0600 – 0830 price starts in the upper half of the P12 box...",
        "1B" | "3B" | "4B" => "Between 0600 – 0830 price starts in the lower half of the P12 box...",
        "2A" => "Between 0600 – 0830 price starts in the lower half of the P12 box...",
        "2B" => "Between 0600 – 0830 price starts in the upper half of the P12 box...",
        "5A" => "Between 0600 – 0830 price is in a large range...",
        "5B" => "Between 0600 – 0830 price is in a small range...",
        _ => return None,
    };
    Some(text)
}

/// Texte complet injecté quand le scénario est choisi sans résultat attendu
pub fn p12_expected_outcome_text(scenario: &str) -> Option<String> {
    p12_outcome(scenario).map(|text| format!("{} {}", text, P12_COMMON_TARGET_INFO))
}

fn choice(value: &str, choices: &[&str]) -> Result<(), ValidationError> {
    if choices.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("choice").with_message("Not a valid choice.".into()))
    }
}

fn validate_session_direction(value: &str) -> Result<(), ValidationError> {
    choice(value, &SESSION_DIRECTIONS)
}

fn validate_session_status(value: &str) -> Result<(), ValidationError> {
    choice(value, &SESSION_STATUSES)
}

fn validate_model_status(value: &str) -> Result<(), ValidationError> {
    choice(value, &SESSION_MODEL_STATUSES)
}

fn validate_p12_scenario(value: &str) -> Result<(), ValidationError> {
    choice(value, &P12_SCENARIOS)
}

fn no_choice() -> String {
    NO_CHOICE.to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DailyJournalRequest {
    pub key_events: Option<String>,
    pub key_tasks: Option<String>,
    pub on_my_mind: Option<String>,
    pub important_focus: Option<String>,
    pub key_strengths: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub mental_feeling_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_mind_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_energy_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub mental_motivation_rating: Option<i32>,

    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_direction"))]
    pub asia_direction: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_status"))]
    pub asia_session_status: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_model_status"))]
    pub asia_model_status: String,
    pub asia_actual_range_points: Option<f64>,
    pub asia_actual_range_percentage: Option<f64>,
    #[validate(length(max = 255))]
    pub asia_median_range_input_note: Option<String>,

    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_direction"))]
    pub london_direction: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_status"))]
    pub london_session_status: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_model_status"))]
    pub london_model_status: String,
    pub london_actual_range_points: Option<f64>,
    pub london_actual_range_percentage: Option<f64>,
    #[validate(length(max = 255))]
    pub london_median_range_input_note: Option<String>,

    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_direction"))]
    pub ny1_direction: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_status"))]
    pub ny1_session_status: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_model_status"))]
    pub ny1_model_status: String,
    pub ny1_actual_range_points: Option<f64>,
    pub ny1_actual_range_percentage: Option<f64>,
    #[validate(length(max = 255))]
    pub ny1_median_range_input_note: Option<String>,

    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_direction"))]
    pub ny2_direction: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_session_status"))]
    pub ny2_session_status: String,
    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_model_status"))]
    pub ny2_model_status: String,
    pub ny2_actual_range_points: Option<f64>,
    pub ny2_actual_range_percentage: Option<f64>,
    #[validate(length(max = 255))]
    pub ny2_median_range_input_note: Option<String>,

    pub adr_10_day_median_range_value: Option<f64>,
    pub todays_total_range_points: Option<f64>,
    pub todays_total_range_percentage: Option<f64>,

    #[serde(default = "no_choice")]
    #[validate(custom(function = "validate_p12_scenario"))]
    pub p12_scenario_selected: String,
    pub p12_expected_outcomes: Option<String>,
    pub realistic_expectance_notes: Option<String>,
    pub engagement_structure_notes: Option<String>,

    pub did_well_today: Option<String>,
    pub did_not_go_well_today: Option<String>,
    pub learned_today: Option<String>,
    pub improve_action_next_day: Option<String>,
    pub market_observations: Option<String>,
    pub self_observations: Option<String>,

    #[validate(range(min = 1, max = 5))]
    pub review_psych_discipline_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub review_psych_motivation_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub review_psych_focus_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub review_psych_mastery_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub review_psych_composure_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub review_psych_resilience_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub review_psych_mind_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub review_psych_energy_rating: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeeklyJournalRequest {
    pub know_traded_well_if: Option<String>,
    pub key_actions_for_excellence: Option<String>,
    pub potential_challenge_and_response: Option<String>,
    pub improvement_area_and_approach: Option<String>,
    pub weekly_did_well_more_of: Option<String>,
    pub weekly_could_do_differently: Option<String>,
    pub weekly_challenge_overcame_learned: Option<String>,
    pub weekly_improve_action_next_week: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyJournalRequest {
    pub long_term_trading_goal: Option<String>,
    pub reason_for_trading: Option<String>,
    pub monthly_goals: Option<String>,
    pub monthly_actions_to_achieve_goals: Option<String>,
    pub coach_advice_for_month_ahead: Option<String>,
    pub monthly_did_well_more_of: Option<String>,
    pub monthly_could_do_differently: Option<String>,
    pub monthly_challenge_overcame_learned: Option<String>,
    pub monthly_action_taken_and_progress: Option<String>,
    pub coach_feedback_on_month: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuarterlyJournalRequest {
    pub key_goals_for_quarter: Option<String>,
    pub major_focus_areas_strategies: Option<String>,
    pub anticipated_challenges_mitigation: Option<String>,
    pub quarterly_achievements_progress: Option<String>,
    pub what_went_well_quarter: Option<String>,
    pub what_did_not_go_well_quarter: Option<String>,
    pub key_lessons_learned_quarter: Option<String>,
    pub adjustments_for_next_quarter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YearlyJournalRequest {
    pub yearly_long_term_vision: Option<String>,
    pub yearly_key_goals: Option<String>,
    pub yearly_major_focus_areas: Option<String>,
    pub yearly_coach_advice_for_year_ahead: Option<String>,
    pub yearly_achievements: Option<String>,
    pub yearly_challenges_overcome: Option<String>,
    pub yearly_lessons_learned: Option<String>,
    pub yearly_goals_for_next_year: Option<String>,
    pub yearly_coach_feedback_on_year: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omitted_session_fields_default_to_none_choice() {
        let request: DailyJournalRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.asia_direction, NO_CHOICE);
        assert_eq!(request.p12_scenario_selected, NO_CHOICE);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn invalid_session_choice_is_rejected() {
        let request: DailyJournalRequest =
            serde_json::from_value(json!({"london_model_status": "Maybe"})).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("london_model_status"));
    }

    #[test]
    fn p12_outcome_text_includes_target_info() {
        let text = p12_expected_outcome_text("5B").unwrap();
        assert!(text.starts_with("Between 0600 – 0830 price is in a small range..."));
        assert!(text.ends_with(P12_COMMON_TARGET_INFO));
        assert_eq!(p12_expected_outcome_text(NO_CHOICE), None);
    }
}
