// ============================================================================
// SERVICE : TRADE METRICS
// ============================================================================
//
// Description:
//   Valeurs dérivées d'un trade à partir de ses entrées et sorties:
//   prix moyens pondérés, P&L brut, ratio R:R, risque en dollars,
//   P&L en R et durée de la position.
//
// Points d'attention:
//   - Calcul pur, aucune lecture BD: le service appelant charge les fills
//   - P&L brut = 0.0 (et non None) dès qu'une donnée manque
//
// ============================================================================

use chrono::NaiveTime;
use serde::Serialize;

use crate::models::trade::{self, Direction, STILL_OPEN};
use crate::models::{entry_point, exit_point};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeMetrics {
    pub total_contracts_entered: i64,
    pub total_contracts_exited: i64,
    pub average_entry_price: Option<f64>,
    pub average_exit_price: Option<f64>,
    pub first_entry_time: Option<NaiveTime>,
    pub last_exit_time: Option<NaiveTime>,
    pub gross_pnl: f64,
    pub risk_reward_ratio: Option<f64>,
    pub dollar_risk: Option<f64>,
    pub pnl_in_r: Option<f64>,
    pub time_in_trade: String,
}

impl TradeMetrics {
    pub fn compute(
        trade: &trade::Model,
        entries: &[entry_point::Model],
        exits: &[exit_point::Model],
    ) -> Self {
        // i64: une somme de contrats i32 peut déborder
        let total_contracts_entered: i64 = entries.iter().map(|e| i64::from(e.contracts)).sum();
        let total_contracts_exited: i64 = exits.iter().filter_map(|x| x.contracts).map(i64::from).sum();

        let average_entry_price = weighted_average(
            entries.iter().map(|e| (Some(e.contracts), Some(e.entry_price))),
            total_contracts_entered,
        );
        let average_exit_price = weighted_average(
            exits.iter().map(|x| (x.contracts, x.exit_price)),
            total_contracts_exited,
        );

        let first_entry_time = entries.iter().map(|e| e.entry_time).min();
        let last_exit_time = exits.iter().filter_map(|x| x.exit_time).max();

        let gross_pnl = gross_pnl(
            trade.direction,
            average_entry_price,
            average_exit_price,
            total_contracts_exited,
            trade.point_value,
        );
        let risk_reward_ratio = risk_reward_ratio(
            trade.direction,
            average_entry_price,
            trade.initial_stop_loss,
            trade.terminus_target,
        );
        let dollar_risk = dollar_risk(
            trade.direction,
            average_entry_price,
            trade.initial_stop_loss,
            total_contracts_entered,
            trade.point_value,
        );

        let is_closed = matches!(trade.how_closed.as_deref(), Some(how) if how != STILL_OPEN);
        let pnl_in_r = match dollar_risk {
            Some(risk) if risk > 0.0 && total_contracts_exited > 0 && is_closed => Some(gross_pnl / risk),
            _ => None,
        };

        TradeMetrics {
            total_contracts_entered,
            total_contracts_exited,
            average_entry_price,
            average_exit_price,
            first_entry_time,
            last_exit_time,
            gross_pnl,
            risk_reward_ratio,
            dollar_risk,
            pnl_in_r,
            time_in_trade: time_in_trade(first_entry_time, last_exit_time),
        }
    }
}

/// Moyenne pondérée par les contrats. Le dénominateur compte tous les
/// contrats, même ceux dont le prix manque.
fn weighted_average<I>(fills: I, total_contracts: i64) -> Option<f64>
where
    I: Iterator<Item = (Option<i32>, Option<f64>)>,
{
    if total_contracts == 0 {
        return None;
    }
    let total_value: f64 = fills
        .filter_map(|(contracts, price)| Some(contracts? as f64 * price?))
        .sum();
    Some(total_value / total_contracts as f64)
}

fn points_in_favour(direction: Direction, from: f64, to: f64) -> f64 {
    match direction {
        Direction::Long => to - from,
        Direction::Short => from - to,
    }
}

pub fn gross_pnl(
    direction: Direction,
    average_entry: Option<f64>,
    average_exit: Option<f64>,
    contracts_exited: i64,
    point_value: Option<f64>,
) -> f64 {
    match (average_entry, average_exit, point_value) {
        (Some(entry), Some(exit), Some(pv)) if contracts_exited != 0 && pv != 0.0 => {
            points_in_favour(direction, entry, exit) * contracts_exited as f64 * pv
        }
        _ => 0.0,
    }
}

pub fn risk_reward_ratio(
    direction: Direction,
    average_entry: Option<f64>,
    stop_loss: Option<f64>,
    target: Option<f64>,
) -> Option<f64> {
    let (entry, sl, tp) = (average_entry?, stop_loss?, target?);
    let (risk, reward) = match direction {
        Direction::Long => ((entry - sl).abs(), (tp - entry).abs()),
        Direction::Short => ((sl - entry).abs(), (entry - tp).abs()),
    };
    if risk > 0.0 && reward > 0.0 {
        Some(reward / risk)
    } else {
        None
    }
}

pub fn dollar_risk(
    direction: Direction,
    average_entry: Option<f64>,
    stop_loss: Option<f64>,
    contracts_entered: i64,
    point_value: Option<f64>,
) -> Option<f64> {
    let (entry, sl, pv) = (average_entry?, stop_loss?, point_value?);
    if contracts_entered == 0 || pv == 0.0 {
        return None;
    }
    // stop du mauvais côté de l'entrée: pas de risque mesurable
    let risk_points = points_in_favour(direction, sl, entry);
    if risk_points > 0.0 {
        Some(risk_points * contracts_entered as f64 * pv)
    } else {
        Some(0.0)
    }
}

/// "HH:MM" entre la première entrée et la dernière sortie (même journée)
pub fn time_in_trade(first_entry: Option<NaiveTime>, last_exit: Option<NaiveTime>) -> String {
    match (first_entry, last_exit) {
        (Some(entry), Some(exit)) if exit >= entry => {
            let minutes = (exit - entry).num_minutes();
            format!("{:02}:{:02}", minutes / 60, minutes % 60)
        }
        (Some(_), Some(_)) => "N/A".to_string(),
        _ => "Open".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(direction: Direction) -> trade::Model {
        trade::Model {
            id: 1,
            user_id: 1,
            trading_model_id: None,
            instrument: "NQ".to_string(),
            trade_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            direction,
            point_value: Some(20.0),
            initial_stop_loss: None,
            terminus_target: None,
            is_dca: false,
            mae: None,
            mfe: None,
            entry_model_legacy: None,
            how_closed: None,
            news_event: None,
            rules_rating: None,
            management_rating: None,
            target_rating: None,
            entry_rating: None,
            preparation_rating: None,
            trade_notes: None,
            psych_scored_highest: None,
            psych_scored_lowest: None,
            overall_analysis_notes: None,
            trade_management_notes: None,
            errors_notes: None,
            improvements_notes: None,
            screenshot_link: None,
            tags: None,
        }
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn entry(id: i32, at: NaiveTime, contracts: i32, price: f64) -> entry_point::Model {
        entry_point::Model { id, trade_id: 1, entry_time: at, contracts, entry_price: price }
    }

    fn exit(id: i32, at: Option<NaiveTime>, contracts: Option<i32>, price: Option<f64>) -> exit_point::Model {
        exit_point::Model { id, trade_id: 1, exit_time: at, contracts, exit_price: price }
    }

    #[test]
    fn average_entry_is_weighted_by_contracts() {
        let entries = vec![entry(1, time(9, 30), 2, 100.0), entry(2, time(9, 45), 3, 110.0)];
        let metrics = TradeMetrics::compute(&trade(Direction::Long), &entries, &[]);

        assert_eq!(metrics.total_contracts_entered, 5);
        assert!((metrics.average_entry_price.unwrap() - 106.0).abs() < 1e-9);
        assert_eq!(metrics.average_exit_price, None);
        assert_eq!(metrics.time_in_trade, "Open");
    }

    #[test]
    fn long_gross_pnl_uses_point_value() {
        let entries = vec![entry(1, time(9, 30), 2, 100.0)];
        let exits = vec![exit(1, Some(time(10, 5)), Some(2), Some(105.0))];
        let metrics = TradeMetrics::compute(&trade(Direction::Long), &entries, &exits);

        assert!((metrics.gross_pnl - 200.0).abs() < 1e-9);
        assert_eq!(metrics.time_in_trade, "00:35");
    }

    #[test]
    fn short_gross_pnl_is_reversed() {
        let entries = vec![entry(1, time(9, 30), 2, 100.0)];
        let exits = vec![exit(1, Some(time(11, 0)), Some(2), Some(105.0))];
        let metrics = TradeMetrics::compute(&trade(Direction::Short), &entries, &exits);

        assert!((metrics.gross_pnl + 200.0).abs() < 1e-9);
        assert_eq!(metrics.time_in_trade, "01:30");
    }

    #[test]
    fn gross_pnl_is_zero_without_point_value() {
        let mut t = trade(Direction::Long);
        t.point_value = None;
        let entries = vec![entry(1, time(9, 30), 1, 100.0)];
        let exits = vec![exit(1, Some(time(9, 40)), Some(1), Some(120.0))];

        assert_eq!(TradeMetrics::compute(&t, &entries, &exits).gross_pnl, 0.0);
    }

    #[test]
    fn risk_metrics_for_closed_long() {
        let mut t = trade(Direction::Long);
        t.initial_stop_loss = Some(95.0);
        t.terminus_target = Some(110.0);
        t.how_closed = Some("TP".to_string());
        let entries = vec![entry(1, time(9, 30), 2, 100.0)];
        let exits = vec![exit(1, Some(time(9, 50)), Some(2), Some(110.0))];
        let metrics = TradeMetrics::compute(&t, &entries, &exits);

        assert!((metrics.risk_reward_ratio.unwrap() - 2.0).abs() < 1e-9);
        assert!((metrics.dollar_risk.unwrap() - 200.0).abs() < 1e-9);
        assert!((metrics.pnl_in_r.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn still_open_trade_has_no_r_multiple() {
        let mut t = trade(Direction::Long);
        t.initial_stop_loss = Some(95.0);
        t.how_closed = Some(STILL_OPEN.to_string());
        let entries = vec![entry(1, time(9, 30), 2, 100.0)];
        let exits = vec![exit(1, Some(time(9, 50)), Some(1), Some(110.0))];

        assert_eq!(TradeMetrics::compute(&t, &entries, &exits).pnl_in_r, None);
    }

    #[test]
    fn stop_on_wrong_side_gives_zero_risk() {
        assert_eq!(dollar_risk(Direction::Short, Some(100.0), Some(95.0), 1, Some(20.0)), Some(0.0));
        assert_eq!(dollar_risk(Direction::Short, Some(100.0), None, 1, Some(20.0)), None);
    }

    #[test]
    fn exit_before_entry_is_not_applicable() {
        assert_eq!(time_in_trade(Some(time(10, 0)), Some(time(9, 0))), "N/A");
        assert_eq!(time_in_trade(Some(time(10, 0)), None), "Open");
    }

    #[test]
    fn exit_without_contracts_is_ignored() {
        let entries = vec![entry(1, time(9, 30), 1, 100.0)];
        let exits = vec![exit(1, Some(time(9, 40)), None, Some(101.0))];
        let metrics = TradeMetrics::compute(&trade(Direction::Long), &entries, &exits);

        assert_eq!(metrics.total_contracts_exited, 0);
        assert_eq!(metrics.average_exit_price, None);
        assert_eq!(metrics.gross_pnl, 0.0);
    }

    #[test]
    fn huge_contract_counts_do_not_overflow() {
        let entries = vec![entry(1, time(9, 30), i32::MAX, 100.0), entry(2, time(9, 31), 1, 100.0)];
        let exits = vec![
            exit(1, Some(time(10, 0)), Some(i32::MAX), Some(101.0)),
            exit(2, Some(time(10, 1)), Some(1), Some(101.0)),
        ];
        let metrics = TradeMetrics::compute(&trade(Direction::Long), &entries, &exits);

        assert_eq!(metrics.total_contracts_entered, i64::from(i32::MAX) + 1);
        assert_eq!(metrics.total_contracts_exited, i64::from(i32::MAX) + 1);
        assert!((metrics.average_entry_price.unwrap() - 100.0).abs() < 1e-9);
        assert!(metrics.gross_pnl > 0.0);
    }
}
