// ============================================================================
// SERVICE : IMPORT / EXPORT CSV DES TRADES
// ============================================================================
//
// Description:
//   Export de tous les trades d'un utilisateur avec un schéma de colonnes
//   fixe, et import d'un CSV au même format.
//
// Points d'attention:
//   - Une ligne importée crée UNE entrée consolidée (prix moyen) et, si
//     présente, UNE sortie consolidée
//   - gross_pnl est exporté mais ignoré à l'import
//   - Les lignes invalides sont ignorées et rapportées avec leur numéro
//
// ============================================================================

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::dto::MAX_CONTRACTS;
use crate::models::trade::{Direction, HOW_CLOSED_CHOICES};
use crate::models::{entry_point, exit_point, trade, trading_model};
use crate::services::activity_service::ActivityService;
use crate::services::trade_service::TradeService;
use crate::utils::serde_time::parse_time;

pub const CSV_COLUMNS: [&str; 26] = [
    "trade_date",
    "instrument",
    "direction",
    "point_value",
    "first_entry_time",
    "total_contracts_entered",
    "average_entry_price",
    "last_exit_time",
    "total_contracts_exited",
    "average_exit_price",
    "initial_stop_loss",
    "terminus_target",
    "is_dca",
    "mae",
    "mfe",
    "trading_model",
    "how_closed",
    "news_event",
    "rules_rating",
    "management_rating",
    "target_rating",
    "entry_rating",
    "preparation_rating",
    "tags",
    "trade_notes",
    "gross_pnl",
];

const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Serialize)]
pub struct RowError {
    pub line: u64,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<RowError>,
}

/// Ligne brute du CSV; tout est texte, la conversion est faite à la main
/// pour produire des messages d'erreur lisibles
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    trade_date: String,
    instrument: String,
    direction: String,
    point_value: String,
    first_entry_time: String,
    total_contracts_entered: String,
    average_entry_price: String,
    last_exit_time: String,
    total_contracts_exited: String,
    average_exit_price: String,
    initial_stop_loss: String,
    terminus_target: String,
    is_dca: String,
    mae: String,
    mfe: String,
    trading_model: String,
    how_closed: String,
    news_event: String,
    rules_rating: String,
    management_rating: String,
    target_rating: String,
    entry_rating: String,
    preparation_rating: String,
    tags: String,
    trade_notes: String,
}

struct ParsedRow {
    trade: trade::ActiveModel,
    entry_time: NaiveTime,
    contracts_entered: i32,
    average_entry_price: f64,
    exit: Option<(Option<NaiveTime>, i32, f64)>,
}

fn fmt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_i32(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_time(value: Option<NaiveTime>) -> String {
    value.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_default()
}

fn opt_text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

fn opt_f64(field: &str, raw: &str) -> Result<Option<f64>, String> {
    match opt_text(raw) {
        None => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{}: '{}' is not a number", field, v)),
    }
}

fn opt_i32(field: &str, raw: &str) -> Result<Option<i32>, String> {
    match opt_text(raw) {
        None => Ok(None),
        Some(v) => v
            .parse::<i32>()
            .map(Some)
            .map_err(|_| format!("{}: '{}' is not an integer", field, v)),
    }
}

fn opt_rating(field: &str, raw: &str) -> Result<Option<i32>, String> {
    match opt_i32(field, raw)? {
        Some(r) if !(1..=5).contains(&r) => Err(format!("{}: must be between 1 and 5", field)),
        other => Ok(other),
    }
}

fn opt_time(field: &str, raw: &str) -> Result<Option<NaiveTime>, String> {
    match opt_text(raw) {
        None => Ok(None),
        Some(v) => parse_time(&v)
            .map(Some)
            .ok_or_else(|| format!("{}: '{}' is not a time", field, v)),
    }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, String> {
    value.ok_or_else(|| format!("{} is required", field))
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

impl CsvRow {
    fn parse(self, user_id: i32, models: &HashMap<String, i32>) -> Result<ParsedRow, String> {
        let trade_date = NaiveDate::parse_from_str(self.trade_date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("trade_date: '{}' is not a YYYY-MM-DD date", self.trade_date.trim()))?;
        let instrument = required("instrument", opt_text(&self.instrument))?;
        let direction = match self.direction.trim() {
            "Long" | "long" => Direction::Long,
            "Short" | "short" => Direction::Short,
            other => return Err(format!("direction: '{}' must be Long or Short", other)),
        };

        let entry_time = required("first_entry_time", opt_time("first_entry_time", &self.first_entry_time)?)?;
        let contracts_entered = required(
            "total_contracts_entered",
            opt_i32("total_contracts_entered", &self.total_contracts_entered)?,
        )?;
        if !(1..=MAX_CONTRACTS).contains(&contracts_entered) {
            return Err(format!("total_contracts_entered: must be between 1 and {}", MAX_CONTRACTS));
        }
        let average_entry_price = required(
            "average_entry_price",
            opt_f64("average_entry_price", &self.average_entry_price)?,
        )?;

        let exit_time = opt_time("last_exit_time", &self.last_exit_time)?;
        let contracts_exited = opt_i32("total_contracts_exited", &self.total_contracts_exited)?;
        if contracts_exited.is_some_and(|c| c > MAX_CONTRACTS) {
            return Err(format!("total_contracts_exited: must be at most {}", MAX_CONTRACTS));
        }
        let average_exit_price = opt_f64("average_exit_price", &self.average_exit_price)?;
        let exit = match (contracts_exited, average_exit_price) {
            (Some(c), Some(p)) if c > 0 => Some((exit_time, c, p)),
            (None, None) if exit_time.is_none() => None,
            (Some(0), _) => None,
            _ => {
                return Err(
                    "exit: total_contracts_exited and average_exit_price must be given together".to_string(),
                );
            }
        };

        let how_closed = opt_text(&self.how_closed);
        if let Some(how) = &how_closed {
            if !HOW_CLOSED_CHOICES.contains(&how.as_str()) {
                return Err(format!("how_closed: '{}' is not a valid choice", how));
            }
        }

        // modèle inconnu: le trade est importé sans modèle
        let trading_model_id = opt_text(&self.trading_model).and_then(|name| models.get(&name).copied());

        let trade = trade::ActiveModel {
            user_id: Set(user_id),
            trading_model_id: Set(trading_model_id),
            instrument: Set(instrument),
            trade_date: Set(trade_date),
            direction: Set(direction),
            point_value: Set(opt_f64("point_value", &self.point_value)?),
            initial_stop_loss: Set(opt_f64("initial_stop_loss", &self.initial_stop_loss)?),
            terminus_target: Set(opt_f64("terminus_target", &self.terminus_target)?),
            is_dca: Set(parse_bool(&self.is_dca)),
            mae: Set(opt_f64("mae", &self.mae)?),
            mfe: Set(opt_f64("mfe", &self.mfe)?),
            how_closed: Set(how_closed),
            news_event: Set(opt_text(&self.news_event)),
            rules_rating: Set(opt_rating("rules_rating", &self.rules_rating)?),
            management_rating: Set(opt_rating("management_rating", &self.management_rating)?),
            target_rating: Set(opt_rating("target_rating", &self.target_rating)?),
            entry_rating: Set(opt_rating("entry_rating", &self.entry_rating)?),
            preparation_rating: Set(opt_rating("preparation_rating", &self.preparation_rating)?),
            tags: Set(opt_text(&self.tags)),
            trade_notes: Set(opt_text(&self.trade_notes)),
            ..Default::default()
        };

        Ok(ParsedRow {
            trade,
            entry_time,
            contracts_entered,
            average_entry_price,
            exit,
        })
    }
}

pub struct CsvService;

impl CsvService {
    /// Tous les trades de l'utilisateur, du plus ancien au plus récent
    pub async fn export(db: &DatabaseConnection, user_id: i32) -> Result<String, AppError> {
        let trades = trade::Entity::find()
            .filter(trade::Column::UserId.eq(user_id))
            .order_by_asc(trade::Column::TradeDate)
            .order_by_asc(trade::Column::Id)
            .all(db)
            .await?;
        let details = TradeService::with_details(db, trades).await?;

        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(CSV_COLUMNS)?;
        for detail in &details {
            let t = &detail.trade;
            let m = &detail.metrics;
            writer.write_record([
                t.trade_date.format("%Y-%m-%d").to_string(),
                t.instrument.clone(),
                t.direction.to_value(),
                fmt_f64(t.point_value),
                fmt_time(m.first_entry_time),
                m.total_contracts_entered.to_string(),
                fmt_f64(m.average_entry_price),
                fmt_time(m.last_exit_time),
                m.total_contracts_exited.to_string(),
                fmt_f64(m.average_exit_price),
                fmt_f64(t.initial_stop_loss),
                fmt_f64(t.terminus_target),
                t.is_dca.to_string(),
                fmt_f64(t.mae),
                fmt_f64(t.mfe),
                detail.trading_model_name.clone().unwrap_or_default(),
                t.how_closed.clone().unwrap_or_default(),
                t.news_event.clone().unwrap_or_default(),
                fmt_i32(t.rules_rating),
                fmt_i32(t.management_rating),
                fmt_i32(t.target_rating),
                fmt_i32(t.entry_rating),
                fmt_i32(t.preparation_rating),
                t.tags.clone().unwrap_or_default(),
                t.trade_notes.clone().unwrap_or_default(),
                m.gross_pnl.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV flush failed: {}", e)))?;
        tracing::info!(user_id, trades = details.len(), "trades exported");
        String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))
    }

    pub async fn import(
        db: &DatabaseConnection,
        user_id: i32,
        content: &str,
        meta: &RequestMeta,
    ) -> Result<ImportReport, AppError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();
        for column in ["trade_date", "instrument", "direction"] {
            if !headers.iter().any(|h| h == column) {
                return Err(AppError::BadRequest(format!("CSV is missing the '{}' column.", column)));
            }
        }

        let models: HashMap<String, i32> = trading_model::Entity::find()
            .filter(trading_model::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.name, m.id))
            .collect();

        let txn = db.begin().await?;
        let mut report = ImportReport { imported: 0, skipped: Vec::new() };

        let mut record = StringRecord::new();
        loop {
            let line = reader.position().line();
            match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(e) => {
                    report.skipped.push(RowError { line, error: e.to_string() });
                    continue;
                }
            }
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or(line);

            let parsed = record
                .deserialize::<CsvRow>(Some(&headers))
                .map_err(|e| e.to_string())
                .and_then(|row| row.parse(user_id, &models));
            match parsed {
                Ok(row) => {
                    Self::insert_row(&txn, row).await?;
                    report.imported += 1;
                }
                Err(error) => {
                    tracing::warn!(user_id, line, error = %error, "csv row skipped");
                    report.skipped.push(RowError { line, error });
                }
            }
        }

        ActivityService::record(
            &txn,
            user_id,
            "trades_imported",
            Some(format!("{} imported, {} skipped", report.imported, report.skipped.len())),
            meta,
            None,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(user_id, imported = report.imported, skipped = report.skipped.len(), "trades imported");
        Ok(report)
    }

    async fn insert_row<C: ConnectionTrait>(db: &C, row: ParsedRow) -> Result<(), DbErr> {
        let trade = row.trade.insert(db).await?;
        entry_point::ActiveModel {
            trade_id: Set(trade.id),
            entry_time: Set(row.entry_time),
            contracts: Set(row.contracts_entered),
            entry_price: Set(row.average_entry_price),
            ..Default::default()
        }
        .insert(db)
        .await?;

        if let Some((exit_time, contracts, price)) = row.exit {
            exit_point::ActiveModel {
                trade_id: Set(trade.id),
                exit_time: Set(exit_time),
                contracts: Set(Some(contracts)),
                exit_price: Set(Some(price)),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::EntryInput;
    use crate::models::users::UserRole;
    use crate::test_utils::{create_trading_model, create_user, setup_test_db, trade_request};

    fn rows(csv_text: &str) -> Vec<Vec<String>> {
        ReaderBuilder::new()
            .from_reader(csv_text.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn same_cell(a: &str, b: &str) -> bool {
        match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => (x - y).abs() < 1e-9,
            _ => a == b,
        }
    }

    #[actix_web::test]
    async fn export_then_import_round_trips() {
        let db = setup_test_db().await;
        let meta = RequestMeta::default();
        let source = create_user(&db, "exporter", UserRole::User).await;
        let target = create_user(&db, "importer", UserRole::User).await;
        let model = create_trading_model(&db, source.id, "Breakout").await;
        create_trading_model(&db, target.id, "Breakout").await;

        let mut long = trade_request(Direction::Long);
        long.trading_model_id = Some(model.id);
        long.entries.push(EntryInput {
            id: None,
            entry_time: NaiveTime::from_hms_opt(9, 45, 0).unwrap(),
            contracts: 1,
            entry_price: 103.0,
        });
        long.trade_notes = Some("notes, with a comma".to_string());
        TradeService::create(&db, source.id, long, &meta).await.unwrap();
        let mut open_short = trade_request(Direction::Short);
        open_short.exits.clear();
        open_short.how_closed = None;
        TradeService::create(&db, source.id, open_short, &meta).await.unwrap();

        let exported = CsvService::export(&db, source.id).await.unwrap();
        let report = CsvService::import(&db, target.id, &exported, &meta).await.unwrap();
        assert_eq!(report.imported, 2);
        assert!(report.skipped.is_empty());

        let reexported = CsvService::export(&db, target.id).await.unwrap();
        let (before, after) = (rows(&exported), rows(&reexported));
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.len(), CSV_COLUMNS.len());
            for (x, y) in a.iter().zip(b.iter()) {
                assert!(same_cell(x, y), "{} != {}", x, y);
            }
        }
    }

    #[actix_web::test]
    async fn invalid_rows_are_reported_with_line_numbers() {
        let db = setup_test_db().await;
        let user = create_user(&db, "badcsv", UserRole::User).await;
        let content = "\
trade_date,instrument,direction,first_entry_time,total_contracts_entered,average_entry_price
2024-03-01,NQ,Long,09:30:00,1,100.5
not-a-date,NQ,Long,09:30:00,1,100.5
2024-03-02,ES,Sideways,09:30:00,1,100.5
2024-03-03,ES,Short,09:31,2,4500
";

        let report = CsvService::import(&db, user.id, content, &RequestMeta::default())
            .await
            .unwrap();

        assert_eq!(report.imported, 2);
        let lines: Vec<u64> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4]);
    }

    #[actix_web::test]
    async fn oversized_contract_counts_are_skipped() {
        let db = setup_test_db().await;
        let user = create_user(&db, "bigcsv", UserRole::User).await;
        let content = "\
trade_date,instrument,direction,first_entry_time,total_contracts_entered,average_entry_price,total_contracts_exited,average_exit_price
2024-03-01,NQ,Long,09:30:00,2147483647,100.5,,
2024-03-01,NQ,Long,09:30:00,1,100.5,2147483647,101
2024-03-01,NQ,Long,09:30:00,100000,100.5,100000,101
";

        let report = CsvService::import(&db, user.id, content, &RequestMeta::default())
            .await
            .unwrap();

        assert_eq!(report.imported, 1);
        let lines: Vec<u64> = report.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[actix_web::test]
    async fn missing_required_column_is_rejected() {
        let db = setup_test_db().await;
        let user = create_user(&db, "nocol", UserRole::User).await;
        let result = CsvService::import(&db, user.id, "instrument,direction\nNQ,Long\n", &RequestMeta::default()).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
