// connexion BD, création du schéma et données initiales

use chrono::NaiveTime;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, Schema, Set,
};

use crate::models::{
    account_setting, activity, api_key, daily_journal, daily_journal_image,
    email_verification_tokens, entry_point, exit_point, file, monthly_journal, news_event_item,
    password_reset_tokens, quarterly_journal, settings, trade, trade_image, trading_model, users,
    weekly_journal, yearly_journal,
};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Crée une table (IF NOT EXISTS) et ses index à partir de l'entité
async fn create_entity_table<E, C>(db: &C, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }
    Ok(())
}

fn unique_index<E, C>(name: &str, entity: E, columns: &[C]) -> IndexCreateStatement
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let mut index = Index::create();
    index.name(name).table(entity).unique().if_not_exists();
    for column in columns {
        index.col(*column);
    }
    index.to_owned()
}

/// Crée toutes les tables. Les parents avant les enfants pour les FK.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_entity_table(db, &schema, users::Entity).await?;
    create_entity_table(db, &schema, activity::Entity).await?;
    create_entity_table(db, &schema, file::Entity).await?;
    create_entity_table(db, &schema, settings::Entity).await?;
    create_entity_table(db, &schema, api_key::Entity).await?;
    create_entity_table(db, &schema, password_reset_tokens::Entity).await?;
    create_entity_table(db, &schema, email_verification_tokens::Entity).await?;
    create_entity_table(db, &schema, trading_model::Entity).await?;
    create_entity_table(db, &schema, trade::Entity).await?;
    create_entity_table(db, &schema, entry_point::Entity).await?;
    create_entity_table(db, &schema, exit_point::Entity).await?;
    create_entity_table(db, &schema, trade_image::Entity).await?;
    create_entity_table(db, &schema, daily_journal::Entity).await?;
    create_entity_table(db, &schema, daily_journal_image::Entity).await?;
    create_entity_table(db, &schema, weekly_journal::Entity).await?;
    create_entity_table(db, &schema, monthly_journal::Entity).await?;
    create_entity_table(db, &schema, quarterly_journal::Entity).await?;
    create_entity_table(db, &schema, yearly_journal::Entity).await?;
    create_entity_table(db, &schema, news_event_item::Entity).await?;
    create_entity_table(db, &schema, account_setting::Entity).await?;

    let backend = db.get_database_backend();
    let composite_uniques = [
        unique_index(
            "uq_user_tradingmodel_name",
            trading_model::Entity,
            &[trading_model::Column::UserId, trading_model::Column::Name],
        ),
        unique_index(
            "uq_user_journal_date",
            daily_journal::Entity,
            &[daily_journal::Column::UserId, daily_journal::Column::JournalDate],
        ),
        unique_index(
            "uq_user_year_week",
            weekly_journal::Entity,
            &[weekly_journal::Column::UserId, weekly_journal::Column::Year, weekly_journal::Column::WeekNumber],
        ),
        unique_index(
            "uq_user_year_month",
            monthly_journal::Entity,
            &[monthly_journal::Column::UserId, monthly_journal::Column::Year, monthly_journal::Column::Month],
        ),
        unique_index(
            "uq_user_year_quarter",
            quarterly_journal::Entity,
            &[quarterly_journal::Column::UserId, quarterly_journal::Column::Year, quarterly_journal::Column::Quarter],
        ),
        unique_index(
            "uq_user_year",
            yearly_journal::Entity,
            &[yearly_journal::Column::UserId, yearly_journal::Column::Year],
        ),
    ];
    for index in composite_uniques.iter() {
        db.execute(backend.build(index)).await?;
    }

    Ok(())
}

/// Données de référence: taille du compte et événements macro par défaut
pub async fn seed_defaults<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let account_size = account_setting::Entity::find()
        .filter(account_setting::Column::SettingName.eq(account_setting::CURRENT_ACCOUNT_SIZE))
        .one(db)
        .await?;

    if account_size.is_none() {
        account_setting::ActiveModel {
            setting_name: Set(account_setting::CURRENT_ACCOUNT_SIZE.to_string()),
            value_str: Set(Some("100000".to_string())),
            description: Set(Some("Current trading account size in dollars".to_string())),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    if news_event_item::Entity::find().count(db).await? == 0 {
        let defaults = [
            ("FOMC Statement", NaiveTime::from_hms_opt(14, 0, 0)),
            ("CPI", NaiveTime::from_hms_opt(8, 30, 0)),
            ("NFP", NaiveTime::from_hms_opt(8, 30, 0)),
            ("Other", None),
        ];
        for (name, release_time) in defaults {
            news_event_item::ActiveModel {
                name: Set(name.to_string()),
                default_release_time: Set(release_time),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    Ok(())
}
