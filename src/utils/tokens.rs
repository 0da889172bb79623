use uuid::Uuid;

/// Identifiant aléatoire de 32 caractères hex (UUID v4 sans tirets)
/// Utilisé pour les tokens de reset/vérification et les clés d'API
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_hex_and_unique() {
        let a = new_token();
        let b = new_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
