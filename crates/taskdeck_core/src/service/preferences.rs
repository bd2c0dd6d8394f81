//! UI preferences stored beside the catalog.

use crate::repo::kv_repo::{KeyValueStore, RepoResult};
use log::warn;
use std::fmt::{Display, Formatter};

/// Storage key for the theme preference.
pub const THEME_STORAGE_KEY: &str = "todoApp.theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads the stored theme, falling back to `Light` when absent or unknown.
pub fn load_theme(store: &impl KeyValueStore) -> Theme {
    match store.get(THEME_STORAGE_KEY) {
        Ok(Some(value)) => Theme::parse(&value).unwrap_or_else(|| {
            warn!("event=theme_load module=preferences status=fallback reason=unknown_value");
            Theme::default()
        }),
        Ok(None) => Theme::default(),
        Err(err) => {
            warn!("event=theme_load module=preferences status=error error={err}");
            Theme::default()
        }
    }
}

pub fn save_theme(store: &mut impl KeyValueStore, theme: Theme) -> RepoResult<()> {
    store.set(THEME_STORAGE_KEY, theme.as_str())
}

/// Forgets the stored theme so the next load falls back to the default.
///
/// Returns whether a stored value was removed.
pub fn reset_theme(store: &mut impl KeyValueStore) -> RepoResult<bool> {
    store.remove(THEME_STORAGE_KEY)
}

#[cfg(test)]
mod tests {
    use super::{load_theme, reset_theme, save_theme, Theme, THEME_STORAGE_KEY};
    use crate::repo::kv_repo::{KeyValueStore, MemoryKeyValueStore};

    #[test]
    fn missing_or_unknown_theme_falls_back_to_light() {
        let mut store = MemoryKeyValueStore::new();
        assert_eq!(load_theme(&store), Theme::Light);

        store.set(THEME_STORAGE_KEY, "sepia").unwrap();
        assert_eq!(load_theme(&store), Theme::Light);
    }

    #[test]
    fn saved_theme_is_read_back() {
        let mut store = MemoryKeyValueStore::new();
        save_theme(&mut store, Theme::Light.toggled()).unwrap();
        assert_eq!(load_theme(&store), Theme::Dark);
        assert_eq!(store.get(THEME_STORAGE_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn reset_restores_default_theme() {
        let mut store = MemoryKeyValueStore::new();
        assert!(!reset_theme(&mut store).unwrap());

        save_theme(&mut store, Theme::Dark).unwrap();
        assert!(reset_theme(&mut store).unwrap());
        assert_eq!(load_theme(&store), Theme::Light);
        assert_eq!(store.get(THEME_STORAGE_KEY).unwrap(), None);
    }
}
