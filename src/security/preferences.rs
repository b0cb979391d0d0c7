//! Typed accessors for the preference keys the client keeps.

use std::fmt;
use std::str::FromStr;

use super::storage::SafeStorage;

/// Storage keys.
pub mod keys {
    /// Cookie banner choice.
    pub const COOKIES_ACCEPTED: &str = "cookies.accepted";
    /// Data processing consent.
    pub const CONSENT: &str = "consent";
    /// Sidebar collapsed state.
    pub const SIDEBAR_COLLAPSED: &str = "ui.sidebar.collapsed";
    /// Session the chat client resumes.
    pub const LAST_SESSION: &str = "chat.last_session";
}

/// Value stored for a key was not one of the known variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Which cookies the user accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CookieChoice {
    /// Every category.
    All,
    /// Only those required to run.
    Essential,
}

impl CookieChoice {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Essential => "essential",
        }
    }
}

impl FromStr for CookieChoice {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "essential" => Ok(Self::Essential),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Answer to the consent prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Consent {
    /// User agreed.
    Granted,
    /// User declined.
    Denied,
}

impl Consent {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

impl FromStr for Consent {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "granted" => Ok(Self::Granted),
            "denied" => Ok(Self::Denied),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Preference cache on top of [`SafeStorage`].
///
/// Unreadable or unrecognized values read as "not chosen yet".
#[derive(Clone, Debug)]
pub struct Preferences {
    storage: SafeStorage,
}

impl Preferences {
    /// Wrap a storage handle.
    #[must_use]
    pub const fn new(storage: SafeStorage) -> Self {
        Self { storage }
    }

    /// Cookie banner choice, if made.
    #[must_use]
    pub fn cookie_choice(&self) -> Option<CookieChoice> {
        self.parsed(keys::COOKIES_ACCEPTED)
    }

    /// Record the cookie banner choice.
    pub fn set_cookie_choice(&self, choice: CookieChoice) {
        self.storage.set(keys::COOKIES_ACCEPTED, choice.as_str());
    }

    /// Consent answer, if given.
    #[must_use]
    pub fn consent(&self) -> Option<Consent> {
        self.parsed(keys::CONSENT)
    }

    /// Record the consent answer.
    pub fn set_consent(&self, consent: Consent) {
        self.storage.set(keys::CONSENT, consent.as_str());
    }

    /// Whether the sidebar is collapsed; expanded when unknown.
    #[must_use]
    pub fn sidebar_collapsed(&self) -> bool {
        self.storage.get(keys::SIDEBAR_COLLAPSED).as_deref() == Some("true")
    }

    /// Record the sidebar state.
    pub fn set_sidebar_collapsed(&self, collapsed: bool) {
        let value = if collapsed { "true" } else { "false" };
        self.storage.set(keys::SIDEBAR_COLLAPSED, value);
    }

    /// Session to resume, if any.
    #[must_use]
    pub fn last_session(&self) -> Option<String> {
        self.storage
            .get(keys::LAST_SESSION)
            .filter(|id| !id.trim().is_empty())
    }

    /// Remember the session to resume.
    pub fn set_last_session(&self, session_id: &str) {
        self.storage.set(keys::LAST_SESSION, session_id);
    }

    /// Forget the session to resume.
    pub fn clear_last_session(&self) {
        self.storage.remove(keys::LAST_SESSION);
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.storage.get(key).and_then(|raw| raw.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_stored() {
        let prefs = Preferences::new(SafeStorage::memory());
        assert_eq!(prefs.cookie_choice(), None);
        assert_eq!(prefs.consent(), None);
        assert!(!prefs.sidebar_collapsed());
        assert_eq!(prefs.last_session(), None);
    }

    #[test]
    fn test_choices_round_trip_through_storage() {
        let storage = SafeStorage::memory();
        let prefs = Preferences::new(storage.clone());

        prefs.set_cookie_choice(CookieChoice::Essential);
        prefs.set_consent(Consent::Granted);
        prefs.set_sidebar_collapsed(true);
        prefs.set_last_session("abc");

        assert_eq!(storage.get(keys::COOKIES_ACCEPTED).as_deref(), Some("essential"));
        assert_eq!(prefs.cookie_choice(), Some(CookieChoice::Essential));
        assert_eq!(prefs.consent(), Some(Consent::Granted));
        assert!(prefs.sidebar_collapsed());
        assert_eq!(prefs.last_session().as_deref(), Some("abc"));

        prefs.clear_last_session();
        assert_eq!(prefs.last_session(), None);
    }

    #[test]
    fn test_unknown_values_read_as_unset() {
        let storage = SafeStorage::memory();
        storage.set(keys::CONSENT, "maybe");
        let prefs = Preferences::new(storage);
        assert_eq!(prefs.consent(), None);
    }

    #[test]
    fn test_disabled_storage_never_panics() {
        let prefs = Preferences::new(SafeStorage::disabled());
        prefs.set_consent(Consent::Denied);
        prefs.set_sidebar_collapsed(true);
        assert_eq!(prefs.consent(), None);
        assert!(!prefs.sidebar_collapsed());
    }
}
