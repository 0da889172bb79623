// ============================================================================
// SERVICE : TRADES
// ============================================================================
//
// Description:
//   Création, mise à jour, suppression des trades et de leurs fills
//   (entrées / sorties), images associées, et chargement des détails
//   (fills + images + métriques) pour l'API.
//
// Points d'attention:
//   - Une sortie partielle (heure, contrats ou prix manquant) est ignorée
//     avec un avertissement
//   - À la mise à jour, les fills sont réconciliés par id: ids listés mis
//     à jour, ids absents supprimés, fills sans id insérés
//   - Un id de fill qui n'appartient pas au trade => 400
//
// ============================================================================

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sea_orm::*;
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::dto::{ExitInput, ImageUploadRequest, Paginated, TradeRequest, TradeResponse};
use crate::models::{entry_point, exit_point, trade, trade_image, trading_model};
use crate::services::activity_service::{ActivityService, Resource};
use crate::services::storage::{FileStorage, Folder, UploadKind};
use crate::services::trade_metrics::TradeMetrics;

/// Résultat d'une écriture: le trade complet et les avertissements
#[derive(Debug, Serialize)]
pub struct TradeWrite {
    pub trade: TradeResponse,
    pub warnings: Vec<String>,
}

pub struct TradeService;

impl TradeService {
    pub async fn find_owned<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        trade_id: i32,
    ) -> Result<trade::Model, AppError> {
        trade::Entity::find_by_id(trade_id)
            .filter(trade::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Trade"))
    }

    /// Charge fills, images et nom du modèle pour une liste de trades
    pub async fn with_details<C: ConnectionTrait>(
        db: &C,
        trades: Vec<trade::Model>,
    ) -> Result<Vec<TradeResponse>, DbErr> {
        if trades.is_empty() {
            return Ok(Vec::new());
        }

        let entries = trades.load_many(entry_point::Entity, db).await?;
        let exits = trades.load_many(exit_point::Entity, db).await?;
        let images = trades.load_many(trade_image::Entity, db).await?;

        let model_ids: HashSet<i32> = trades.iter().filter_map(|t| t.trading_model_id).collect();
        let model_names: HashMap<i32, String> = if model_ids.is_empty() {
            HashMap::new()
        } else {
            trading_model::Entity::find()
                .filter(trading_model::Column::Id.is_in(model_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|m| (m.id, m.name))
                .collect()
        };

        let details = trades
            .into_iter()
            .zip(entries)
            .zip(exits)
            .zip(images)
            .map(|(((trade, mut entries), mut exits), mut images)| {
                entries.sort_by_key(|e| (e.entry_time, e.id));
                exits.sort_by_key(|x| (x.exit_time, x.id));
                images.sort_by_key(|i| i.id);
                let metrics = TradeMetrics::compute(&trade, &entries, &exits);
                TradeResponse {
                    trading_model_name: trade
                        .trading_model_id
                        .and_then(|id| model_names.get(&id).cloned()),
                    trade,
                    entries,
                    exits,
                    images,
                    metrics,
                }
            })
            .collect();
        Ok(details)
    }

    pub async fn get<C: ConnectionTrait>(db: &C, user_id: i32, trade_id: i32) -> Result<TradeResponse, AppError> {
        let trade = Self::find_owned(db, user_id, trade_id).await?;
        Self::with_details(db, vec![trade])
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("Trade"))
    }

    /// Page de trades, les plus récents d'abord
    pub async fn list(
        db: &DatabaseConnection,
        user_id: i32,
        page: u64,
        per_page: u64,
    ) -> Result<Paginated<TradeResponse>, DbErr> {
        let paginator = trade::Entity::find()
            .filter(trade::Column::UserId.eq(user_id))
            .order_by_desc(trade::Column::TradeDate)
            .order_by_desc(trade::Column::Id)
            .paginate(db, per_page);

        let totals = paginator.num_items_and_pages().await?;
        let trades = paginator.fetch_page(page - 1).await?;

        Ok(Paginated {
            items: Self::with_details(db, trades).await?,
            page,
            per_page,
            total_items: totals.number_of_items,
            total_pages: super::total_pages(totals.number_of_items, per_page),
        })
    }

    /// Tous les trades d'un jour, dans l'ordre de saisie
    pub async fn for_day<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        day: NaiveDate,
    ) -> Result<Vec<TradeResponse>, DbErr> {
        let trades = trade::Entity::find()
            .filter(trade::Column::UserId.eq(user_id))
            .filter(trade::Column::TradeDate.eq(day))
            .order_by_asc(trade::Column::Id)
            .all(db)
            .await?;
        Self::with_details(db, trades).await
    }

    async fn check_trading_model<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        trading_model_id: Option<i32>,
    ) -> Result<Option<i32>, AppError> {
        // 0 = "aucun modèle" côté formulaire
        let Some(id) = trading_model_id.filter(|id| *id > 0) else {
            return Ok(None);
        };
        let owned = trading_model::Entity::find_by_id(id)
            .filter(trading_model::Column::UserId.eq(user_id))
            .one(db)
            .await?;
        match owned {
            Some(_) => Ok(Some(id)),
            None => Err(AppError::BadRequest("Invalid trading model selected.".to_string())),
        }
    }

    fn apply_request(active: &mut trade::ActiveModel, request: &TradeRequest, trading_model_id: Option<i32>) {
        active.trading_model_id = Set(trading_model_id);
        active.instrument = Set(request.instrument.trim().to_string());
        active.trade_date = Set(request.trade_date);
        active.direction = Set(request.direction);
        active.point_value = Set(request.point_value);
        active.initial_stop_loss = Set(request.initial_stop_loss);
        active.terminus_target = Set(request.terminus_target);
        active.is_dca = Set(request.is_dca);
        active.mae = Set(request.mae);
        active.mfe = Set(request.mfe);
        active.how_closed = Set(super::non_empty(request.how_closed.clone()));
        active.news_event = Set(super::non_empty(request.news_event.clone()));
        active.rules_rating = Set(request.rules_rating);
        active.management_rating = Set(request.management_rating);
        active.target_rating = Set(request.target_rating);
        active.entry_rating = Set(request.entry_rating);
        active.preparation_rating = Set(request.preparation_rating);
        active.trade_notes = Set(super::non_empty(request.trade_notes.clone()));
        active.psych_scored_highest = Set(super::non_empty(request.psych_scored_highest.clone()));
        active.psych_scored_lowest = Set(super::non_empty(request.psych_scored_lowest.clone()));
        active.overall_analysis_notes = Set(super::non_empty(request.overall_analysis_notes.clone()));
        active.trade_management_notes = Set(super::non_empty(request.trade_management_notes.clone()));
        active.errors_notes = Set(super::non_empty(request.errors_notes.clone()));
        active.improvements_notes = Set(super::non_empty(request.improvements_notes.clone()));
        active.screenshot_link = Set(super::non_empty(request.screenshot_link.clone()));
        active.tags = Set(super::non_empty(request.tags.clone()));
    }

    fn exit_warning(index: usize) -> String {
        format!(
            "Exit #{} was skipped: time, contracts and price are all required.",
            index + 1
        )
    }

    async fn insert_exit<C: ConnectionTrait>(db: &C, trade_id: i32, exit: &ExitInput) -> Result<(), DbErr> {
        exit_point::ActiveModel {
            trade_id: Set(trade_id),
            exit_time: Set(exit.exit_time),
            contracts: Set(exit.contracts),
            exit_price: Set(exit.exit_price),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(())
    }

    pub async fn create(
        db: &DatabaseConnection,
        user_id: i32,
        request: TradeRequest,
        meta: &RequestMeta,
    ) -> Result<TradeWrite, AppError> {
        let txn = db.begin().await?;
        let trading_model_id = Self::check_trading_model(&txn, user_id, request.trading_model_id).await?;

        let mut active = trade::ActiveModel {
            user_id: Set(user_id),
            ..Default::default()
        };
        Self::apply_request(&mut active, &request, trading_model_id);
        let trade = active.insert(&txn).await?;

        for entry in &request.entries {
            entry_point::ActiveModel {
                trade_id: Set(trade.id),
                entry_time: Set(entry.entry_time),
                contracts: Set(entry.contracts),
                entry_price: Set(entry.entry_price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        let mut warnings = Vec::new();
        for (index, exit) in request.exits.iter().enumerate() {
            if exit.is_blank() {
                continue;
            }
            if !exit.is_complete() {
                warnings.push(Self::exit_warning(index));
                continue;
            }
            Self::insert_exit(&txn, trade.id, exit).await?;
        }

        ActivityService::record(
            &txn,
            user_id,
            "trade_logged",
            Some(format!("{} {} on {}", trade.instrument, trade.direction.to_value(), trade.trade_date)),
            meta,
            Some(Resource { id: trade.id, kind: "Trade" }),
        )
        .await?;

        let trade = Self::get(&txn, user_id, trade.id).await?;
        txn.commit().await?;

        tracing::info!(user_id, trade_id = trade.trade.id, skipped_exits = warnings.len(), "trade logged");
        Ok(TradeWrite { trade, warnings })
    }

    pub async fn update(
        db: &DatabaseConnection,
        user_id: i32,
        trade_id: i32,
        request: TradeRequest,
        meta: &RequestMeta,
    ) -> Result<TradeWrite, AppError> {
        let txn = db.begin().await?;
        let existing = Self::find_owned(&txn, user_id, trade_id).await?;
        let trading_model_id = Self::check_trading_model(&txn, user_id, request.trading_model_id).await?;

        let mut active: trade::ActiveModel = existing.into();
        Self::apply_request(&mut active, &request, trading_model_id);
        active.update(&txn).await?;

        Self::reconcile_entries(&txn, trade_id, &request).await?;
        let warnings = Self::reconcile_exits(&txn, trade_id, &request.exits).await?;

        ActivityService::record(
            &txn,
            user_id,
            "trade_updated",
            None,
            meta,
            Some(Resource { id: trade_id, kind: "Trade" }),
        )
        .await?;

        let trade = Self::get(&txn, user_id, trade_id).await?;
        txn.commit().await?;

        tracing::info!(user_id, trade_id, "trade updated");
        Ok(TradeWrite { trade, warnings })
    }

    async fn reconcile_entries<C: ConnectionTrait>(
        db: &C,
        trade_id: i32,
        request: &TradeRequest,
    ) -> Result<(), AppError> {
        let mut existing: HashMap<i32, entry_point::Model> = entry_point::Entity::find()
            .filter(entry_point::Column::TradeId.eq(trade_id))
            .all(db)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        for entry in &request.entries {
            match entry.id {
                Some(id) => {
                    let current = existing.remove(&id).ok_or_else(|| {
                        AppError::BadRequest(format!("Entry {} does not belong to this trade.", id))
                    })?;
                    let mut active: entry_point::ActiveModel = current.into();
                    active.entry_time = Set(entry.entry_time);
                    active.contracts = Set(entry.contracts);
                    active.entry_price = Set(entry.entry_price);
                    active.update(db).await?;
                }
                None => {
                    entry_point::ActiveModel {
                        trade_id: Set(trade_id),
                        entry_time: Set(entry.entry_time),
                        contracts: Set(entry.contracts),
                        entry_price: Set(entry.entry_price),
                        ..Default::default()
                    }
                    .insert(db)
                    .await?;
                }
            }
        }

        // ce qui reste n'a pas été listé
        if !existing.is_empty() {
            entry_point::Entity::delete_many()
                .filter(entry_point::Column::Id.is_in(existing.into_keys()))
                .exec(db)
                .await?;
        }
        Ok(())
    }

    async fn reconcile_exits<C: ConnectionTrait>(
        db: &C,
        trade_id: i32,
        exits: &[ExitInput],
    ) -> Result<Vec<String>, AppError> {
        let mut existing: HashMap<i32, exit_point::Model> = exit_point::Entity::find()
            .filter(exit_point::Column::TradeId.eq(trade_id))
            .all(db)
            .await?
            .into_iter()
            .map(|x| (x.id, x))
            .collect();

        let mut warnings = Vec::new();
        for (index, exit) in exits.iter().enumerate() {
            match exit.id {
                Some(id) => {
                    let current = existing.remove(&id).ok_or_else(|| {
                        AppError::BadRequest(format!("Exit {} does not belong to this trade.", id))
                    })?;
                    // une sortie existante incomplète est conservée telle quelle
                    if !exit.is_complete() {
                        warnings.push(Self::exit_warning(index));
                        continue;
                    }
                    let mut active: exit_point::ActiveModel = current.into();
                    active.exit_time = Set(exit.exit_time);
                    active.contracts = Set(exit.contracts);
                    active.exit_price = Set(exit.exit_price);
                    active.update(db).await?;
                }
                None if exit.is_blank() => {}
                None if !exit.is_complete() => warnings.push(Self::exit_warning(index)),
                None => Self::insert_exit(db, trade_id, exit).await?,
            }
        }

        if !existing.is_empty() {
            exit_point::Entity::delete_many()
                .filter(exit_point::Column::Id.is_in(existing.into_keys()))
                .exec(db)
                .await?;
        }
        Ok(warnings)
    }

    /// Supprime le trade, ses fills et ses images (BD puis disque)
    pub async fn delete(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        trade_id: i32,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let txn = db.begin().await?;
        let trade = Self::find_owned(&txn, user_id, trade_id).await?;

        let image_files: Vec<String> = trade_image::Entity::find()
            .filter(trade_image::Column::TradeId.eq(trade_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|i| i.filepath)
            .collect();

        entry_point::Entity::delete_many()
            .filter(entry_point::Column::TradeId.eq(trade_id))
            .exec(&txn)
            .await?;
        exit_point::Entity::delete_many()
            .filter(exit_point::Column::TradeId.eq(trade_id))
            .exec(&txn)
            .await?;
        trade_image::Entity::delete_many()
            .filter(trade_image::Column::TradeId.eq(trade_id))
            .exec(&txn)
            .await?;

        let details = format!("{} on {}", trade.instrument, trade.trade_date);
        trade.delete(&txn).await?;
        ActivityService::record(
            &txn,
            user_id,
            "trade_deleted",
            Some(details),
            meta,
            Some(Resource { id: trade_id, kind: "Trade" }),
        )
        .await?;
        txn.commit().await?;

        storage.remove_all(Folder::Uploads, &image_files).await;
        tracing::info!(user_id, trade_id, images = image_files.len(), "trade deleted");
        Ok(())
    }

    pub async fn add_image(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        trade_id: i32,
        request: &ImageUploadRequest,
    ) -> Result<trade_image::Model, AppError> {
        Self::find_owned(db, user_id, trade_id).await?;

        let stored = storage
            .save_base64(Folder::Uploads, UploadKind::Image, &request.filename, &request.content_base64)
            .await?;

        let inserted = trade_image::ActiveModel {
            trade_id: Set(trade_id),
            user_id: Set(user_id),
            filename: Set(stored.original_name.clone()),
            filepath: Set(stored.stored_name.clone()),
            filesize: Set(stored.size),
            mime_type: Set(Some(stored.mime_type.clone())),
            caption: Set(super::non_empty(request.caption.clone())),
            upload_date: Set(super::now()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(image) => {
                tracing::info!(user_id, trade_id, image_id = image.id, "trade image added");
                Ok(image)
            }
            Err(e) => {
                storage.remove(Folder::Uploads, &stored.stored_name).await;
                Err(e.into())
            }
        }
    }

    pub async fn delete_image(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        trade_id: i32,
        image_id: i32,
    ) -> Result<(), AppError> {
        Self::find_owned(db, user_id, trade_id).await?;
        let image = trade_image::Entity::find_by_id(image_id)
            .filter(trade_image::Column::TradeId.eq(trade_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Image"))?;

        let filepath = image.filepath.clone();
        image.delete(db).await?;
        storage.remove(Folder::Uploads, &filepath).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::EntryInput;
    use crate::models::trade::Direction;
    use crate::models::users::UserRole;
    use crate::test_utils::{create_user, setup_test_db, test_storage, trade_request};
    use chrono::NaiveTime;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[actix_web::test]
    async fn create_computes_weighted_average_entry() {
        let db = setup_test_db().await;
        let user = create_user(&db, "trader", UserRole::User).await;
        let mut request = trade_request(Direction::Long);
        request.entries = vec![
            EntryInput { id: None, entry_time: at(9, 30), contracts: 2, entry_price: 100.0 },
            EntryInput { id: None, entry_time: at(9, 40), contracts: 3, entry_price: 110.0 },
        ];
        request.exits.clear();

        let written = TradeService::create(&db, user.id, request, &RequestMeta::default()).await.unwrap();

        assert_eq!(written.trade.entries.len(), 2);
        assert!((written.trade.metrics.average_entry_price.unwrap() - 106.0).abs() < 1e-9);
    }

    #[actix_web::test]
    async fn long_and_short_pnl_signs() {
        let db = setup_test_db().await;
        let user = create_user(&db, "pnl", UserRole::User).await;

        let long = TradeService::create(&db, user.id, trade_request(Direction::Long), &RequestMeta::default())
            .await
            .unwrap();
        let short = TradeService::create(&db, user.id, trade_request(Direction::Short), &RequestMeta::default())
            .await
            .unwrap();

        // entrée 2 @ 100, sortie 2 @ 105, point value 20
        assert!((long.trade.metrics.gross_pnl - 200.0).abs() < 1e-9);
        assert!((short.trade.metrics.gross_pnl + 200.0).abs() < 1e-9);
    }

    #[actix_web::test]
    async fn partial_exit_is_skipped_with_warning() {
        let db = setup_test_db().await;
        let user = create_user(&db, "partial", UserRole::User).await;
        let mut request = trade_request(Direction::Long);
        request.exits.push(ExitInput { id: None, exit_time: Some(at(11, 0)), contracts: None, exit_price: None });

        let written = TradeService::create(&db, user.id, request, &RequestMeta::default()).await.unwrap();

        assert_eq!(written.trade.exits.len(), 1);
        assert_eq!(written.warnings.len(), 1);
    }

    #[actix_web::test]
    async fn update_reconciles_fills_by_id() {
        let db = setup_test_db().await;
        let user = create_user(&db, "recon", UserRole::User).await;
        let mut request = trade_request(Direction::Long);
        request.entries.push(EntryInput { id: None, entry_time: at(9, 45), contracts: 1, entry_price: 101.0 });
        let created = TradeService::create(&db, user.id, request.clone(), &RequestMeta::default())
            .await
            .unwrap()
            .trade;
        let kept_id = created.entries[0].id;
        let exit_id = created.exits[0].id;

        let mut update = request;
        update.entries = vec![
            EntryInput { id: Some(kept_id), entry_time: at(9, 30), contracts: 4, entry_price: 99.0 },
            EntryInput { id: None, entry_time: at(10, 0), contracts: 1, entry_price: 102.0 },
        ];
        update.exits = vec![];

        let updated = TradeService::update(&db, user.id, created.trade.id, update, &RequestMeta::default())
            .await
            .unwrap()
            .trade;

        assert_eq!(updated.entries.len(), 2);
        assert_eq!(updated.entries[0].id, kept_id);
        assert_eq!(updated.entries[0].contracts, 4);
        assert!(updated.exits.is_empty());
        assert!(exit_point::Entity::find_by_id(exit_id).one(&db).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn foreign_fill_id_is_rejected() {
        let db = setup_test_db().await;
        let user = create_user(&db, "foreign", UserRole::User).await;
        let first = TradeService::create(&db, user.id, trade_request(Direction::Long), &RequestMeta::default())
            .await
            .unwrap()
            .trade;
        let second = TradeService::create(&db, user.id, trade_request(Direction::Long), &RequestMeta::default())
            .await
            .unwrap()
            .trade;

        let mut update = trade_request(Direction::Long);
        update.entries[0].id = Some(first.entries[0].id);
        let result = TradeService::update(&db, user.id, second.trade.id, update, &RequestMeta::default()).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        // rollback: le second trade garde son entrée d'origine
        let unchanged = TradeService::get(&db, user.id, second.trade.id).await.unwrap();
        assert_eq!(unchanged.entries[0].id, second.entries[0].id);
    }

    #[actix_web::test]
    async fn other_users_trade_is_not_found() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner", UserRole::User).await;
        let other = create_user(&db, "other", UserRole::User).await;
        let created = TradeService::create(&db, owner.id, trade_request(Direction::Long), &RequestMeta::default())
            .await
            .unwrap()
            .trade;

        let result = TradeService::get(&db, other.id, created.trade.id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[actix_web::test]
    async fn foreign_trading_model_is_rejected() {
        let db = setup_test_db().await;
        let owner = create_user(&db, "modelowner", UserRole::User).await;
        let other = create_user(&db, "intruder", UserRole::User).await;
        let model = crate::test_utils::create_trading_model(&db, owner.id, "Breakout").await;

        let mut request = trade_request(Direction::Long);
        request.trading_model_id = Some(model.id);
        let result = TradeService::create(&db, other.id, request, &RequestMeta::default()).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[actix_web::test]
    async fn delete_removes_fills_and_image_files() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = test_storage(dir.path());
        let user = create_user(&db, "deleter", UserRole::User).await;
        let created = TradeService::create(&db, user.id, trade_request(Direction::Long), &RequestMeta::default())
            .await
            .unwrap()
            .trade;

        let image = TradeService::add_image(
            &db,
            &storage,
            user.id,
            created.trade.id,
            &ImageUploadRequest {
                filename: "chart.png".to_string(),
                content_base64: "iVBORw0KGgo=".to_string(),
                caption: Some("entry".to_string()),
                image_type: None,
            },
        )
        .await
        .unwrap();
        let image_path = storage.path_of(Folder::Uploads, &image.filepath);
        assert!(image_path.exists());

        TradeService::delete(&db, &storage, user.id, created.trade.id, &RequestMeta::default())
            .await
            .unwrap();

        assert!(!image_path.exists());
        let remaining = entry_point::Entity::find()
            .filter(entry_point::Column::TradeId.eq(created.trade.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[actix_web::test]
    async fn list_counts_pages_from_item_total() {
        let db = setup_test_db().await;
        let user = create_user(&db, "pager", UserRole::User).await;

        let empty = TradeService::list(&db, user.id, 1, 2).await.unwrap();
        assert_eq!(empty.total_items, 0);
        assert_eq!(empty.total_pages, 1);

        for _ in 0..3 {
            TradeService::create(&db, user.id, trade_request(Direction::Long), &RequestMeta::default())
                .await
                .unwrap();
        }
        let last = TradeService::list(&db, user.id, 2, 2).await.unwrap();
        assert_eq!(last.total_items, 3);
        assert_eq!(last.total_pages, 2);
        assert_eq!(last.items.len(), 1);
    }
}
