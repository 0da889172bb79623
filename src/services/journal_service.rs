// ============================================================================
// SERVICE : JOURNAUX
// ============================================================================
//
// Description:
//   Journal quotidien (upsert par date, images, vue du jour avec trades et
//   P&L cumulé) et journaux hebdomadaire / mensuel / trimestriel / annuel.
//
// Points d'attention:
//   - Un seul journal par (utilisateur, période): enregistrer deux fois la
//     même période met à jour la ligne existante
//   - Choisir un scénario P12 sans résultat attendu remplit le texte type
//
// ============================================================================

use chrono::{Days, NaiveDate};
use sea_orm::*;
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::RequestMeta;
use crate::models::dto::{ImageUploadRequest, TradeResponse};
use crate::models::journal_dto::{
    DailyJournalRequest, MonthlyJournalRequest, QuarterlyJournalRequest, WeeklyJournalRequest,
    YearlyJournalRequest, NO_CHOICE, p12_expected_outcome_text,
};
use crate::models::{
    daily_journal, daily_journal_image, monthly_journal, quarterly_journal, weekly_journal,
    yearly_journal,
};
use crate::services::activity_service::{ActivityService, Resource};
use crate::services::non_empty as ne;
use crate::services::storage::{FileStorage, Folder, UploadKind};
use crate::services::trade_service::TradeService;

#[derive(Debug, Serialize)]
pub struct DailyJournalView {
    pub journal_date: NaiveDate,
    pub journal: Option<daily_journal::Model>,
    pub images: Vec<daily_journal_image::Model>,
    pub trades: Vec<TradeResponse>,
    pub cumulative_daily_pnl: f64,
    pub psych_labels: [&'static str; 8],
    pub psych_values: [Option<i32>; 8],
    pub average_psych_rating: Option<f64>,
    pub prev_day: Option<NaiveDate>,
    pub next_day: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyJournalView {
    pub year: i32,
    pub week_number: u32,
    pub week_start_date: NaiveDate,
    pub journal: Option<weekly_journal::Model>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyJournalView {
    pub year: i32,
    pub month: u32,
    pub display: String,
    pub journal: Option<monthly_journal::Model>,
}

#[derive(Debug, Serialize)]
pub struct QuarterlyJournalView {
    pub year: i32,
    pub quarter: u32,
    pub display: &'static str,
    pub journal: Option<quarterly_journal::Model>,
}

#[derive(Debug, Serialize)]
pub struct YearlyJournalView {
    pub year: i32,
    pub journal: Option<yearly_journal::Model>,
}

/// Résultat d'un upsert: la ligne et si elle vient d'être créée
#[derive(Debug, Serialize)]
pub struct Saved<T> {
    pub journal: T,
    pub created: bool,
}

fn check_year(year: i32) -> Result<(), AppError> {
    if (1900..=2200).contains(&year) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid year: {}", year)))
    }
}

fn week_start(year: i32, week: u32) -> Result<NaiveDate, AppError> {
    check_year(year)?;
    weekly_journal::week_start_date(year, week)
        .ok_or_else(|| AppError::BadRequest(format!("Week {} does not exist in {}", week, year)))
}

fn month_display(year: i32, month: u32) -> Result<String, AppError> {
    check_year(year)?;
    monthly_journal::month_year_display(year, month)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month: {}", month)))
}

fn quarter_display(year: i32, quarter: u32) -> Result<&'static str, AppError> {
    check_year(year)?;
    quarterly_journal::quarter_display_name(quarter)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid quarter: {}", quarter)))
}

/// Violation d'unicité (deux enregistrements simultanés de la même période)
fn conflict_or_db(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("This journal was saved concurrently, please retry.".to_string())
        }
        _ => AppError::Database(e),
    }
}

pub struct JournalService;

impl JournalService {
    // ------------------------------------------------------------------
    // Journal quotidien
    // ------------------------------------------------------------------

    pub async fn find_daily<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        date: NaiveDate,
    ) -> Result<Option<daily_journal::Model>, DbErr> {
        daily_journal::Entity::find()
            .filter(daily_journal::Column::UserId.eq(user_id))
            .filter(daily_journal::Column::JournalDate.eq(date))
            .one(db)
            .await
    }

    pub async fn daily_view(
        db: &DatabaseConnection,
        user_id: i32,
        date: NaiveDate,
    ) -> Result<DailyJournalView, AppError> {
        let journal = Self::find_daily(db, user_id, date).await?;
        let images = match &journal {
            Some(j) => {
                daily_journal_image::Entity::find()
                    .filter(daily_journal_image::Column::DailyJournalId.eq(j.id))
                    .order_by_asc(daily_journal_image::Column::Id)
                    .all(db)
                    .await?
            }
            None => Vec::new(),
        };
        let trades = TradeService::for_day(db, user_id, date).await?;
        let cumulative_daily_pnl = trades.iter().map(|t| t.metrics.gross_pnl).sum();

        Ok(DailyJournalView {
            journal_date: date,
            psych_labels: daily_journal::PSYCH_LABELS,
            psych_values: journal.as_ref().map(|j| j.psych_ratings()).unwrap_or([None; 8]),
            average_psych_rating: journal.as_ref().and_then(|j| j.average_review_psych_rating()),
            journal,
            images,
            trades,
            cumulative_daily_pnl,
            prev_day: date.checked_sub_days(Days::new(1)),
            next_day: date.checked_add_days(Days::new(1)),
        })
    }

    fn apply_daily(active: &mut daily_journal::ActiveModel, r: DailyJournalRequest) {
        let p12_expected_outcomes = match ne(r.p12_expected_outcomes) {
            None if r.p12_scenario_selected != NO_CHOICE => p12_expected_outcome_text(&r.p12_scenario_selected),
            other => other,
        };

        active.key_events = Set(ne(r.key_events));
        active.key_tasks = Set(ne(r.key_tasks));
        active.on_my_mind = Set(ne(r.on_my_mind));
        active.important_focus = Set(ne(r.important_focus));
        active.key_strengths = Set(ne(r.key_strengths));
        active.mental_feeling_rating = Set(r.mental_feeling_rating);
        active.mental_mind_rating = Set(r.mental_mind_rating);
        active.mental_energy_rating = Set(r.mental_energy_rating);
        active.mental_motivation_rating = Set(r.mental_motivation_rating);

        active.asia_direction = Set(r.asia_direction);
        active.asia_session_status = Set(r.asia_session_status);
        active.asia_model_status = Set(r.asia_model_status);
        active.asia_actual_range_points = Set(r.asia_actual_range_points);
        active.asia_actual_range_percentage = Set(r.asia_actual_range_percentage);
        active.asia_median_range_input_note = Set(ne(r.asia_median_range_input_note));
        active.london_direction = Set(r.london_direction);
        active.london_session_status = Set(r.london_session_status);
        active.london_model_status = Set(r.london_model_status);
        active.london_actual_range_points = Set(r.london_actual_range_points);
        active.london_actual_range_percentage = Set(r.london_actual_range_percentage);
        active.london_median_range_input_note = Set(ne(r.london_median_range_input_note));
        active.ny1_direction = Set(r.ny1_direction);
        active.ny1_session_status = Set(r.ny1_session_status);
        active.ny1_model_status = Set(r.ny1_model_status);
        active.ny1_actual_range_points = Set(r.ny1_actual_range_points);
        active.ny1_actual_range_percentage = Set(r.ny1_actual_range_percentage);
        active.ny1_median_range_input_note = Set(ne(r.ny1_median_range_input_note));
        active.ny2_direction = Set(r.ny2_direction);
        active.ny2_session_status = Set(r.ny2_session_status);
        active.ny2_model_status = Set(r.ny2_model_status);
        active.ny2_actual_range_points = Set(r.ny2_actual_range_points);
        active.ny2_actual_range_percentage = Set(r.ny2_actual_range_percentage);
        active.ny2_median_range_input_note = Set(ne(r.ny2_median_range_input_note));

        active.adr_10_day_median_range_value = Set(r.adr_10_day_median_range_value);
        active.todays_total_range_points = Set(r.todays_total_range_points);
        active.todays_total_range_percentage = Set(r.todays_total_range_percentage);

        active.p12_scenario_selected = Set(r.p12_scenario_selected);
        active.p12_expected_outcomes = Set(p12_expected_outcomes);
        active.realistic_expectance_notes = Set(ne(r.realistic_expectance_notes));
        active.engagement_structure_notes = Set(ne(r.engagement_structure_notes));

        active.did_well_today = Set(ne(r.did_well_today));
        active.did_not_go_well_today = Set(ne(r.did_not_go_well_today));
        active.learned_today = Set(ne(r.learned_today));
        active.improve_action_next_day = Set(ne(r.improve_action_next_day));
        active.market_observations = Set(ne(r.market_observations));
        active.self_observations = Set(ne(r.self_observations));

        active.review_psych_discipline_rating = Set(r.review_psych_discipline_rating);
        active.review_psych_motivation_rating = Set(r.review_psych_motivation_rating);
        active.review_psych_focus_rating = Set(r.review_psych_focus_rating);
        active.review_psych_mastery_rating = Set(r.review_psych_mastery_rating);
        active.review_psych_composure_rating = Set(r.review_psych_composure_rating);
        active.review_psych_resilience_rating = Set(r.review_psych_resilience_rating);
        active.review_psych_mind_rating = Set(r.review_psych_mind_rating);
        active.review_psych_energy_rating = Set(r.review_psych_energy_rating);
    }

    pub async fn save_daily(
        db: &DatabaseConnection,
        user_id: i32,
        date: NaiveDate,
        request: DailyJournalRequest,
        meta: &RequestMeta,
    ) -> Result<Saved<daily_journal::Model>, AppError> {
        let txn = db.begin().await?;
        let existing = Self::find_daily(&txn, user_id, date).await?;
        let created = existing.is_none();

        let mut active = match existing {
            Some(j) => j.into(),
            None => daily_journal::ActiveModel {
                user_id: Set(user_id),
                journal_date: Set(date),
                ..Default::default()
            },
        };
        Self::apply_daily(&mut active, request);
        let journal = active.save(&txn).await.map_err(conflict_or_db)?;
        let journal = journal.try_into_model()?;

        let action = if created { "created" } else { "updated" };
        ActivityService::record(
            &txn,
            user_id,
            "daily_journal_save",
            Some(format!("Daily journal for {} {}.", date.format("%Y-%m-%d"), action)),
            meta,
            Some(Resource { id: journal.id, kind: "DailyJournal" }),
        )
        .await?;
        txn.commit().await?;

        tracing::info!(user_id, %date, created, "daily journal saved");
        Ok(Saved { journal, created })
    }

    pub async fn delete_daily(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        date: NaiveDate,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let txn = db.begin().await?;
        let journal = Self::find_daily(&txn, user_id, date)
            .await?
            .ok_or_else(|| AppError::not_found("Daily journal"))?;

        let images = daily_journal_image::Entity::find()
            .filter(daily_journal_image::Column::DailyJournalId.eq(journal.id))
            .all(&txn)
            .await?;
        daily_journal_image::Entity::delete_many()
            .filter(daily_journal_image::Column::DailyJournalId.eq(journal.id))
            .exec(&txn)
            .await?;
        let journal_id = journal.id;
        journal.delete(&txn).await?;
        ActivityService::record(
            &txn,
            user_id,
            "daily_journal_delete",
            Some(format!("Daily journal for {} deleted.", date.format("%Y-%m-%d"))),
            meta,
            Some(Resource { id: journal_id, kind: "DailyJournal" }),
        )
        .await?;
        txn.commit().await?;

        storage
            .remove_all(Folder::Uploads, images.iter().map(|i| i.filepath.as_str()))
            .await;
        tracing::info!(user_id, %date, "daily journal deleted");
        Ok(())
    }

    pub async fn add_daily_image(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        date: NaiveDate,
        request: &ImageUploadRequest,
    ) -> Result<daily_journal_image::Model, AppError> {
        let image_type = request.image_type.as_deref().unwrap_or_default();
        if !daily_journal_image::IMAGE_TYPES.contains(&image_type) {
            return Err(AppError::BadRequest(
                "image_type must be 'pre_market' or 'eod_chart'.".to_string(),
            ));
        }
        let journal = Self::find_daily(db, user_id, date)
            .await?
            .ok_or_else(|| AppError::NotFound("Save the daily journal before adding images.".to_string()))?;

        let stored = storage
            .save_base64(Folder::Uploads, UploadKind::Image, &request.filename, &request.content_base64)
            .await?;
        let inserted = daily_journal_image::ActiveModel {
            daily_journal_id: Set(journal.id),
            user_id: Set(user_id),
            filename: Set(stored.original_name.clone()),
            filepath: Set(stored.stored_name.clone()),
            filesize: Set(stored.size),
            mime_type: Set(Some(stored.mime_type.clone())),
            image_type: Set(image_type.to_string()),
            upload_date: Set(super::now()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(image) => {
                tracing::info!(user_id, %date, image_id = image.id, "daily journal image added");
                Ok(image)
            }
            Err(e) => {
                storage.remove(Folder::Uploads, &stored.stored_name).await;
                Err(e.into())
            }
        }
    }

    pub async fn delete_daily_image(
        db: &DatabaseConnection,
        storage: &FileStorage,
        user_id: i32,
        date: NaiveDate,
        image_id: i32,
    ) -> Result<(), AppError> {
        let journal = Self::find_daily(db, user_id, date)
            .await?
            .ok_or_else(|| AppError::not_found("Daily journal"))?;
        let image = daily_journal_image::Entity::find_by_id(image_id)
            .filter(daily_journal_image::Column::DailyJournalId.eq(journal.id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found("Image"))?;

        let filepath = image.filepath.clone();
        image.delete(db).await?;
        storage.remove(Folder::Uploads, &filepath).await;
        Ok(())
    }

    pub async fn list_daily(db: &DatabaseConnection, user_id: i32) -> Result<Vec<daily_journal::Model>, DbErr> {
        daily_journal::Entity::find()
            .filter(daily_journal::Column::UserId.eq(user_id))
            .order_by_desc(daily_journal::Column::JournalDate)
            .all(db)
            .await
    }

    // ------------------------------------------------------------------
    // Journal hebdomadaire
    // ------------------------------------------------------------------

    async fn find_weekly<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        year: i32,
        week: u32,
    ) -> Result<Option<weekly_journal::Model>, DbErr> {
        weekly_journal::Entity::find()
            .filter(weekly_journal::Column::UserId.eq(user_id))
            .filter(weekly_journal::Column::Year.eq(year))
            .filter(weekly_journal::Column::WeekNumber.eq(week as i32))
            .one(db)
            .await
    }

    pub async fn weekly_view(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        week: u32,
    ) -> Result<WeeklyJournalView, AppError> {
        let week_start_date = week_start(year, week)?;
        Ok(WeeklyJournalView {
            year,
            week_number: week,
            week_start_date,
            journal: Self::find_weekly(db, user_id, year, week).await?,
        })
    }

    pub async fn save_weekly(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        week: u32,
        r: WeeklyJournalRequest,
        meta: &RequestMeta,
    ) -> Result<Saved<weekly_journal::Model>, AppError> {
        week_start(year, week)?;
        let txn = db.begin().await?;
        let existing = Self::find_weekly(&txn, user_id, year, week).await?;
        let created = existing.is_none();
        let mut active = match existing {
            Some(j) => j.into(),
            None => weekly_journal::ActiveModel {
                user_id: Set(user_id),
                year: Set(year),
                week_number: Set(week as i32),
                ..Default::default()
            },
        };
        active.know_traded_well_if = Set(ne(r.know_traded_well_if));
        active.key_actions_for_excellence = Set(ne(r.key_actions_for_excellence));
        active.potential_challenge_and_response = Set(ne(r.potential_challenge_and_response));
        active.improvement_area_and_approach = Set(ne(r.improvement_area_and_approach));
        active.weekly_did_well_more_of = Set(ne(r.weekly_did_well_more_of));
        active.weekly_could_do_differently = Set(ne(r.weekly_could_do_differently));
        active.weekly_challenge_overcame_learned = Set(ne(r.weekly_challenge_overcame_learned));
        active.weekly_improve_action_next_week = Set(ne(r.weekly_improve_action_next_week));
        let journal = active.save(&txn).await.map_err(conflict_or_db)?.try_into_model()?;

        ActivityService::record(
            &txn,
            user_id,
            "weekly_journal_save",
            Some(format!("Weekly journal {}-W{:02} saved.", year, week)),
            meta,
            Some(Resource { id: journal.id, kind: "WeeklyJournal" }),
        )
        .await?;
        txn.commit().await?;
        tracing::info!(user_id, year, week, created, "weekly journal saved");
        Ok(Saved { journal, created })
    }

    pub async fn delete_weekly(db: &DatabaseConnection, user_id: i32, year: i32, week: u32) -> Result<(), AppError> {
        week_start(year, week)?;
        let journal = Self::find_weekly(db, user_id, year, week)
            .await?
            .ok_or_else(|| AppError::not_found("Weekly journal"))?;
        journal.delete(db).await?;
        tracing::info!(user_id, year, week, "weekly journal deleted");
        Ok(())
    }

    pub async fn list_weekly(db: &DatabaseConnection, user_id: i32) -> Result<Vec<weekly_journal::Model>, DbErr> {
        weekly_journal::Entity::find()
            .filter(weekly_journal::Column::UserId.eq(user_id))
            .order_by_desc(weekly_journal::Column::Year)
            .order_by_desc(weekly_journal::Column::WeekNumber)
            .all(db)
            .await
    }

    // ------------------------------------------------------------------
    // Journal mensuel
    // ------------------------------------------------------------------

    async fn find_monthly<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        year: i32,
        month: u32,
    ) -> Result<Option<monthly_journal::Model>, DbErr> {
        monthly_journal::Entity::find()
            .filter(monthly_journal::Column::UserId.eq(user_id))
            .filter(monthly_journal::Column::Year.eq(year))
            .filter(monthly_journal::Column::Month.eq(month as i32))
            .one(db)
            .await
    }

    pub async fn monthly_view(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        month: u32,
    ) -> Result<MonthlyJournalView, AppError> {
        let display = month_display(year, month)?;
        Ok(MonthlyJournalView {
            year,
            month,
            display,
            journal: Self::find_monthly(db, user_id, year, month).await?,
        })
    }

    pub async fn save_monthly(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        month: u32,
        r: MonthlyJournalRequest,
        meta: &RequestMeta,
    ) -> Result<Saved<monthly_journal::Model>, AppError> {
        let display = month_display(year, month)?;
        let txn = db.begin().await?;
        let existing = Self::find_monthly(&txn, user_id, year, month).await?;
        let created = existing.is_none();
        let mut active = match existing {
            Some(j) => j.into(),
            None => monthly_journal::ActiveModel {
                user_id: Set(user_id),
                year: Set(year),
                month: Set(month as i32),
                ..Default::default()
            },
        };
        active.long_term_trading_goal = Set(ne(r.long_term_trading_goal));
        active.reason_for_trading = Set(ne(r.reason_for_trading));
        active.monthly_goals = Set(ne(r.monthly_goals));
        active.monthly_actions_to_achieve_goals = Set(ne(r.monthly_actions_to_achieve_goals));
        active.coach_advice_for_month_ahead = Set(ne(r.coach_advice_for_month_ahead));
        active.monthly_did_well_more_of = Set(ne(r.monthly_did_well_more_of));
        active.monthly_could_do_differently = Set(ne(r.monthly_could_do_differently));
        active.monthly_challenge_overcame_learned = Set(ne(r.monthly_challenge_overcame_learned));
        active.monthly_action_taken_and_progress = Set(ne(r.monthly_action_taken_and_progress));
        active.coach_feedback_on_month = Set(ne(r.coach_feedback_on_month));
        let journal = active.save(&txn).await.map_err(conflict_or_db)?.try_into_model()?;

        ActivityService::record(
            &txn,
            user_id,
            "monthly_journal_save",
            Some(format!("Monthly journal {} saved.", display)),
            meta,
            Some(Resource { id: journal.id, kind: "MonthlyJournal" }),
        )
        .await?;
        txn.commit().await?;
        tracing::info!(user_id, year, month, created, "monthly journal saved");
        Ok(Saved { journal, created })
    }

    pub async fn delete_monthly(db: &DatabaseConnection, user_id: i32, year: i32, month: u32) -> Result<(), AppError> {
        month_display(year, month)?;
        let journal = Self::find_monthly(db, user_id, year, month)
            .await?
            .ok_or_else(|| AppError::not_found("Monthly journal"))?;
        journal.delete(db).await?;
        tracing::info!(user_id, year, month, "monthly journal deleted");
        Ok(())
    }

    pub async fn list_monthly(db: &DatabaseConnection, user_id: i32) -> Result<Vec<monthly_journal::Model>, DbErr> {
        monthly_journal::Entity::find()
            .filter(monthly_journal::Column::UserId.eq(user_id))
            .order_by_desc(monthly_journal::Column::Year)
            .order_by_desc(monthly_journal::Column::Month)
            .all(db)
            .await
    }

    // ------------------------------------------------------------------
    // Journal trimestriel
    // ------------------------------------------------------------------

    async fn find_quarterly<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        year: i32,
        quarter: u32,
    ) -> Result<Option<quarterly_journal::Model>, DbErr> {
        quarterly_journal::Entity::find()
            .filter(quarterly_journal::Column::UserId.eq(user_id))
            .filter(quarterly_journal::Column::Year.eq(year))
            .filter(quarterly_journal::Column::Quarter.eq(quarter as i32))
            .one(db)
            .await
    }

    pub async fn quarterly_view(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        quarter: u32,
    ) -> Result<QuarterlyJournalView, AppError> {
        let display = quarter_display(year, quarter)?;
        Ok(QuarterlyJournalView {
            year,
            quarter,
            display,
            journal: Self::find_quarterly(db, user_id, year, quarter).await?,
        })
    }

    pub async fn save_quarterly(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        quarter: u32,
        r: QuarterlyJournalRequest,
        meta: &RequestMeta,
    ) -> Result<Saved<quarterly_journal::Model>, AppError> {
        let display = quarter_display(year, quarter)?;
        let txn = db.begin().await?;
        let existing = Self::find_quarterly(&txn, user_id, year, quarter).await?;
        let created = existing.is_none();
        let mut active = match existing {
            Some(j) => j.into(),
            None => quarterly_journal::ActiveModel {
                user_id: Set(user_id),
                year: Set(year),
                quarter: Set(quarter as i32),
                ..Default::default()
            },
        };
        active.key_goals_for_quarter = Set(ne(r.key_goals_for_quarter));
        active.major_focus_areas_strategies = Set(ne(r.major_focus_areas_strategies));
        active.anticipated_challenges_mitigation = Set(ne(r.anticipated_challenges_mitigation));
        active.quarterly_achievements_progress = Set(ne(r.quarterly_achievements_progress));
        active.what_went_well_quarter = Set(ne(r.what_went_well_quarter));
        active.what_did_not_go_well_quarter = Set(ne(r.what_did_not_go_well_quarter));
        active.key_lessons_learned_quarter = Set(ne(r.key_lessons_learned_quarter));
        active.adjustments_for_next_quarter = Set(ne(r.adjustments_for_next_quarter));
        let journal = active.save(&txn).await.map_err(conflict_or_db)?.try_into_model()?;

        ActivityService::record(
            &txn,
            user_id,
            "quarterly_journal_save",
            Some(format!("Quarterly journal {} {} saved.", year, display)),
            meta,
            Some(Resource { id: journal.id, kind: "QuarterlyJournal" }),
        )
        .await?;
        txn.commit().await?;
        tracing::info!(user_id, year, quarter, created, "quarterly journal saved");
        Ok(Saved { journal, created })
    }

    pub async fn delete_quarterly(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        quarter: u32,
    ) -> Result<(), AppError> {
        quarter_display(year, quarter)?;
        let journal = Self::find_quarterly(db, user_id, year, quarter)
            .await?
            .ok_or_else(|| AppError::not_found("Quarterly journal"))?;
        journal.delete(db).await?;
        tracing::info!(user_id, year, quarter, "quarterly journal deleted");
        Ok(())
    }

    pub async fn list_quarterly(db: &DatabaseConnection, user_id: i32) -> Result<Vec<quarterly_journal::Model>, DbErr> {
        quarterly_journal::Entity::find()
            .filter(quarterly_journal::Column::UserId.eq(user_id))
            .order_by_desc(quarterly_journal::Column::Year)
            .order_by_desc(quarterly_journal::Column::Quarter)
            .all(db)
            .await
    }

    // ------------------------------------------------------------------
    // Journal annuel
    // ------------------------------------------------------------------

    async fn find_yearly<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        year: i32,
    ) -> Result<Option<yearly_journal::Model>, DbErr> {
        yearly_journal::Entity::find()
            .filter(yearly_journal::Column::UserId.eq(user_id))
            .filter(yearly_journal::Column::Year.eq(year))
            .one(db)
            .await
    }

    pub async fn yearly_view(db: &DatabaseConnection, user_id: i32, year: i32) -> Result<YearlyJournalView, AppError> {
        check_year(year)?;
        Ok(YearlyJournalView {
            year,
            journal: Self::find_yearly(db, user_id, year).await?,
        })
    }

    pub async fn save_yearly(
        db: &DatabaseConnection,
        user_id: i32,
        year: i32,
        r: YearlyJournalRequest,
        meta: &RequestMeta,
    ) -> Result<Saved<yearly_journal::Model>, AppError> {
        check_year(year)?;
        let txn = db.begin().await?;
        let existing = Self::find_yearly(&txn, user_id, year).await?;
        let created = existing.is_none();
        let mut active = match existing {
            Some(j) => j.into(),
            None => yearly_journal::ActiveModel {
                user_id: Set(user_id),
                year: Set(year),
                ..Default::default()
            },
        };
        active.yearly_long_term_vision = Set(ne(r.yearly_long_term_vision));
        active.yearly_key_goals = Set(ne(r.yearly_key_goals));
        active.yearly_major_focus_areas = Set(ne(r.yearly_major_focus_areas));
        active.yearly_coach_advice_for_year_ahead = Set(ne(r.yearly_coach_advice_for_year_ahead));
        active.yearly_achievements = Set(ne(r.yearly_achievements));
        active.yearly_challenges_overcome = Set(ne(r.yearly_challenges_overcome));
        active.yearly_lessons_learned = Set(ne(r.yearly_lessons_learned));
        active.yearly_goals_for_next_year = Set(ne(r.yearly_goals_for_next_year));
        active.yearly_coach_feedback_on_year = Set(ne(r.yearly_coach_feedback_on_year));
        let journal = active.save(&txn).await.map_err(conflict_or_db)?.try_into_model()?;

        ActivityService::record(
            &txn,
            user_id,
            "yearly_journal_save",
            Some(format!("Yearly journal {} saved.", year)),
            meta,
            Some(Resource { id: journal.id, kind: "YearlyJournal" }),
        )
        .await?;
        txn.commit().await?;
        tracing::info!(user_id, year, created, "yearly journal saved");
        Ok(Saved { journal, created })
    }

    pub async fn delete_yearly(db: &DatabaseConnection, user_id: i32, year: i32) -> Result<(), AppError> {
        check_year(year)?;
        let journal = Self::find_yearly(db, user_id, year)
            .await?
            .ok_or_else(|| AppError::not_found("Yearly journal"))?;
        journal.delete(db).await?;
        tracing::info!(user_id, year, "yearly journal deleted");
        Ok(())
    }

    pub async fn list_yearly(db: &DatabaseConnection, user_id: i32) -> Result<Vec<yearly_journal::Model>, DbErr> {
        yearly_journal::Entity::find()
            .filter(yearly_journal::Column::UserId.eq(user_id))
            .order_by_desc(yearly_journal::Column::Year)
            .all(db)
            .await
    }
}
