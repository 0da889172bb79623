pub mod activity_service;
pub mod admin_service;
pub mod csv_service;
pub mod dashboard_service;
pub mod file_service;
pub mod journal_service;
pub mod mailer;
pub mod news_event_service;
pub mod settings_service;
pub mod storage;
pub mod trade_metrics;
pub mod trade_service;
pub mod trading_model_service;
pub mod user_service;

use chrono::{NaiveDateTime, Utc};

/// Horodatage UTC sans fuseau, comme stocké en base
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Chaîne optionnelle nettoyée: vide ou blanche devient None
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Nombre de pages pour un total donné (au moins 1)
pub fn total_pages(total_items: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 1;
    }
    total_items.div_ceil(per_page).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" NQ ".to_string())), Some("NQ".to_string()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 25), 1);
        assert_eq!(total_pages(25, 25), 1);
        assert_eq!(total_pages(26, 25), 2);
    }
}
