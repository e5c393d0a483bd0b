use std::fmt;

use serde::Serialize;

/// Gemini API key. Debug output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Blank input yields `None`.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First and last few characters, for logs.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "***".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    Stored,
    UserSupplied,
}

/// Stored secret wins unless the session asked to use a different key.
pub fn resolve(
    stored: Option<&str>,
    override_requested: bool,
    typed: Option<&str>,
) -> Option<(Credential, CredentialSource)> {
    if !override_requested {
        if let Some(credential) = stored.and_then(Credential::new) {
            return Some((credential, CredentialSource::Stored));
        }
    }
    typed
        .and_then(Credential::new)
        .map(|credential| (credential, CredentialSource::UserSupplied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stored_secret_wins_without_override() {
        let (credential, source) = resolve(Some("stored-key"), false, Some("typed-key")).unwrap();
        assert_eq!(credential.expose(), "stored-key");
        assert_eq!(source, CredentialSource::Stored);
    }

    #[test]
    fn override_always_uses_typed_value() {
        let (credential, source) = resolve(Some("stored-key"), true, Some("typed-key")).unwrap();
        assert_eq!(credential.expose(), "typed-key");
        assert_eq!(source, CredentialSource::UserSupplied);
    }

    #[test]
    fn override_without_typed_value_is_absent() {
        assert!(resolve(Some("stored-key"), true, None).is_none());
        assert!(resolve(Some("stored-key"), true, Some("  ")).is_none());
    }

    #[test]
    fn falls_back_to_typed_when_nothing_stored() {
        let (credential, source) = resolve(None, false, Some(" typed ")).unwrap();
        assert_eq!(credential.expose(), "typed");
        assert_eq!(source, CredentialSource::UserSupplied);
        assert!(resolve(Some(""), false, None).is_none());
    }

    #[test]
    fn debug_hides_the_secret() {
        let credential = Credential::new("AIzaSyA-very-secret-1234").unwrap();
        let shown = format!("{credential:?}");
        assert_eq!(shown, "Credential(AIza...1234)");
        assert_eq!(Credential::new("short").unwrap().masked(), "***");
    }
}
