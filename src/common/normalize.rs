// Normalização das chaves que chegam de fora (formulários, app, Stripe).

/// Códigos são digitados à mão no app: ignora espaços e caixa.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// E-mail é o identificador da parte indicada (finder fees, promos).
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_code("  team-ab2c-dd3e-ff4g \n"), "TEAM-AB2C-DD3E-FF4G");
    }

    #[test]
    fn emails_are_lowercased() {
        assert_eq!(normalize_email(" Director@Club.ORG "), "director@club.org");
    }
}
