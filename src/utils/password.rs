use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::{Rng, distributions::Alphanumeric};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const METHOD: &str = "pbkdf2:sha256";
#[cfg(not(test))]
const ITERATIONS: u32 = 600_000;
// les tests hashent beaucoup de mots de passe
#[cfg(test)]
const ITERATIONS: u32 = 1_000;
const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;
const DUMMY_SALT: &str = "0000000000000000";

/// Hash un mot de passe au format Werkzeug (compatible avec la base Flask)
/// Format: pbkdf2:sha256:iterations$salt$hexdigest
/// Le salt est une chaîne alphanumérique utilisée telle quelle (octets UTF-8)
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();

    let digest = derive(password, &salt, ITERATIONS, KEY_LENGTH)?;
    Ok(format!("{}:{}${}${}", METHOD, ITERATIONS, salt, hex::encode(digest)))
}

/// Vérifie un mot de passe contre un hash Werkzeug
/// Seule la méthode pbkdf2:sha256 est supportée
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    let mut parts = stored_hash.splitn(3, '$');
    let (header, salt, expected_hex) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(s), Some(d)) => (h, s, d),
        _ => return Err("Invalid hash format".to_string()),
    };

    // pbkdf2:sha256 ou pbkdf2:sha256:iterations
    let header_parts: Vec<&str> = header.split(':').collect();
    let iterations = match header_parts.as_slice() {
        ["pbkdf2", "sha256"] => 260_000,
        ["pbkdf2", "sha256", iterations] => iterations
            .parse::<u32>()
            .map_err(|_| "Invalid iterations".to_string())?,
        _ => return Err(format!("Unsupported hash method: {}", header)),
    };

    let expected = hex::decode(expected_hex).map_err(|_| "Invalid digest encoding".to_string())?;
    if expected.is_empty() {
        return Err("Empty digest".to_string());
    }

    let computed = derive(password, salt, iterations, expected.len())?;
    Ok(constant_time_eq(&computed, &expected))
}

fn derive(password: &str, salt: &str, iterations: u32, length: usize) -> Result<Vec<u8>, String> {
    let mut key = vec![0u8; length];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut key)
        .map_err(|e| format!("PBKDF2 failed: {}", e))?;
    Ok(key)
}

/// Dérive une clé pour rien: un login sur un compte inconnu coûte
/// autant qu'un mauvais mot de passe. Renvoie toujours false.
pub fn verify_dummy(password: &str) -> bool {
    let _ = derive(password, DUMMY_SALT, ITERATIONS, KEY_LENGTH);
    false
}

// XOR accumulé sur toute la longueur, sans sortie au premier octet différent.
// Les longueurs ne sont pas secrètes (KEY_LENGTH ou celle du hash stocké).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with(&format!("pbkdf2:sha256:{}$", ITERATIONS)));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verifies_werkzeug_hash_with_low_iterations() {
        // hash construit avec les mêmes paramètres que generate_password_hash
        let digest = derive("secret", "abcdefgh", 1000, 32).unwrap();
        let stored = format!("pbkdf2:sha256:1000$abcdefgh${}", hex::encode(digest));
        assert!(verify_password("secret", &stored).unwrap());
        assert!(!verify_password("Secret", &stored).unwrap());
    }

    #[test]
    fn test_dummy_verification_never_matches() {
        assert!(!verify_dummy(""));
        assert!(!verify_dummy("correct horse"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_invalid_formats() {
        assert!(verify_password("x", "not-a-hash").is_err());
        assert!(verify_password("x", "scrypt:32768:8:1$salt$abcd").is_err());
        assert!(verify_password("x", "pbkdf2:sha256:abc$salt$abcd").is_err());
    }
}
