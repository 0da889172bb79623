use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};

use crate::models::users::UserRole;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub username: String,
    pub role: UserRole,
    pub exp: i64,        // expiration timestamp
}

/// Génère un JWT pour un utilisateur, valable `ttl_hours` heures
pub fn generate_token(
    user_id: i32,
    username: &str,
    role: UserRole,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
        .map_err(|e| format!("Failed to generate token: {}", e))
}

/// Vérifie et décode un JWT
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_generate_and_verify_token() {
        let token = generate_token(123, "testuser", UserRole::Editor, SECRET, 1).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();

        assert_eq!(claims.sub, 123);
        assert_eq!(claims.username, "testuser");
        assert_eq!(claims.role, UserRole::Editor);
    }

    #[test]
    fn test_invalid_token() {
        assert!(verify_token("invalid.token.here", SECRET).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let token = generate_token(1, "a", UserRole::User, SECRET, 1).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token() {
        // bien au-delà de la marge de 60s de jsonwebtoken
        let token = generate_token(1, "a", UserRole::User, SECRET, -2).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }
}
