// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque entité correspond à une table avec SeaORM.
//
// Liste des modules:
//   - users : Comptes (rôle user/editor/admin, vérification email)
//   - activity : Journal d'audit par utilisateur
//   - file : Documents uploadés
//   - settings : Préférences utilisateur (thème, pagination)
//   - api_key : Clés d'API personnelles
//   - password_reset_tokens : Tokens de reset password
//   - email_verification_tokens : Tokens de vérification email
//   - trading_model : Playbooks de stratégie
//   - trade, entry_point, exit_point, trade_image : Trades et leurs fills
//   - daily_journal, daily_journal_image : Journal quotidien
//   - weekly_journal, monthly_journal, quarterly_journal, yearly_journal
//   - news_event_item, account_setting : Tables de référence
//   - dto, journal_dto : Objets de requête/réponse de l'API
//   - health : Health check
//
// Points d'attention:
//   - Toutes les tables appartenant à un user ont une FK ON DELETE CASCADE
//   - Les contraintes d'unicité composites sont créées dans db::create_schema
//
// ============================================================================

pub mod health;
pub mod dto;
pub mod journal_dto;
pub mod users;
pub mod activity;
pub mod file;
pub mod settings;
pub mod api_key;
pub mod password_reset_tokens;
pub mod email_verification_tokens;
pub mod trading_model;
pub mod trade;
pub mod entry_point;
pub mod exit_point;
pub mod trade_image;
pub mod daily_journal;
pub mod daily_journal_image;
pub mod weekly_journal;
pub mod monthly_journal;
pub mod quarterly_journal;
pub mod yearly_journal;
pub mod news_event_item;
pub mod account_setting;
