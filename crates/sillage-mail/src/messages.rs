//! Transactional message templates.

/// Compose the password-reset message. Returns `(subject, body)`.
///
/// The link points at the frontend reset page; the token expires after an
/// hour, which the body states.
pub fn password_reset_email(username: &str, reset_link: &str) -> (String, String) {
    let subject = "Réinitialisation de votre mot de passe".to_string();
    let body = format!(
        "Bonjour {username},\n\n\
         Une réinitialisation de mot de passe a été demandée pour votre compte.\n\
         Pour choisir un nouveau mot de passe, suivez ce lien (valable 1 heure) :\n\n\
         {reset_link}\n\n\
         Si vous n'êtes pas à l'origine de cette demande, ignorez ce message.\n"
    );
    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_email_contains_link_and_name() {
        let (subject, body) =
            password_reset_email("alice", "https://sillage.app/reset-password?token=abc");
        assert!(subject.contains("mot de passe"));
        assert!(body.contains("alice"));
        assert!(body.contains("https://sillage.app/reset-password?token=abc"));
    }
}
