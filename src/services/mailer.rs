// Envoi des e-mails (vérification, réinitialisation du mot de passe).
// L'implémentation par défaut écrit le message dans les logs.

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), AppError>;
}

#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), AppError> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "mail sent:\n{}",
            message.body
        );
        Ok(())
    }
}

pub fn verification_mail(config: &AppConfig, to: &str, username: &str, token: &str) -> MailMessage {
    let link = format!(
        "{}/api/auth/verify-email?token={}",
        config.public_base_url.trim_end_matches('/'),
        token
    );
    MailMessage {
        from: config.mail_default_sender.clone(),
        to: to.to_string(),
        subject: "Please Verify Your Email Address".to_string(),
        body: format!(
            "Hello {},\n\nPlease confirm your email address by visiting:\n{}\n\n\
             This link expires in {} hours.\n",
            username, link, config.verification_token_hours
        ),
    }
}

pub fn password_reset_mail(config: &AppConfig, to: &str, username: &str, token: &str) -> MailMessage {
    let link = format!(
        "{}/reset-password?token={}",
        config.public_base_url.trim_end_matches('/'),
        token
    );
    MailMessage {
        from: config.mail_default_sender.clone(),
        to: to.to_string(),
        subject: "Password Reset Request".to_string(),
        body: format!(
            "Hello {},\n\nTo reset your password, visit the following link:\n{}\n\n\
             If you did not make this request, simply ignore this email.\n",
            username, link
        ),
    }
}

/// Un échec d'envoi ne doit pas annuler l'opération déjà commitée
pub async fn send_or_log(mailer: &dyn Mailer, message: MailMessage) -> bool {
    let to = message.to.clone();
    match mailer.send(message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(to = %to, error = %e, "failed to send mail");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_config;

    #[test]
    fn verification_link_carries_token() {
        let mut config = test_config();
        config.public_base_url = "https://journal.example/".to_string();
        let mail = verification_mail(&config, "a@b.c", "alice", "abc123");

        assert_eq!(mail.to, "a@b.c");
        assert!(mail.body.contains("https://journal.example/api/auth/verify-email?token=abc123"));
    }
}
