use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PortfolioError;

/// Symbolic identifier for every sound effect the site knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundName {
    ProjectorStart,
    ProjectorLoop,
    FilmFlicker,
    ReelLoad,
    Whoosh,
    Click,
    Hover,
}

impl SoundName {
    pub const ALL: [SoundName; 7] = [
        SoundName::ProjectorStart,
        SoundName::ProjectorLoop,
        SoundName::FilmFlicker,
        SoundName::ReelLoad,
        SoundName::Whoosh,
        SoundName::Click,
        SoundName::Hover,
    ];

    /// Key used by page code and config files.
    pub fn key(self) -> &'static str {
        match self {
            SoundName::ProjectorStart => "projectorStart",
            SoundName::ProjectorLoop => "projectorLoop",
            SoundName::FilmFlicker => "filmFlicker",
            SoundName::ReelLoad => "reelLoad",
            SoundName::Whoosh => "whoosh",
            SoundName::Click => "click",
            SoundName::Hover => "hover",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            SoundName::ProjectorStart => "projector-start",
            SoundName::ProjectorLoop => "projector-loop",
            SoundName::FilmFlicker => "film-flicker",
            SoundName::ReelLoad => "reel-load",
            SoundName::Whoosh => "whoosh",
            SoundName::Click => "click",
            SoundName::Hover => "hover",
        }
    }
}

impl fmt::Display for SoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SoundName {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundName::ALL
            .into_iter()
            .find(|name| name.key() == s)
            .ok_or_else(|| PortfolioError::UnknownSound(s.to_string()))
    }
}

/// Static table from [`SoundName`] to the locator of its audio asset.
#[derive(Debug, Clone, Default)]
pub struct SoundRegistry {
    locators: BTreeMap<SoundName, String>,
}

impl SoundRegistry {
    /// Empty registry; every lookup misses until something is registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing all seven sounds under `/sounds`.
    pub fn builtin() -> Self {
        Self::with_root("/sounds")
    }

    /// Registry containing all seven sounds as `<root>/<stem>.mp3`.
    pub fn with_root(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        let mut registry = Self::new();
        for name in SoundName::ALL {
            registry.register(name, format!("{root}/{}.mp3", name.file_stem()));
        }
        registry
    }

    pub fn register(&mut self, name: SoundName, locator: impl Into<String>) {
        self.locators.insert(name, locator.into());
    }

    pub fn locator(&self, name: SoundName) -> Option<&str> {
        self.locators.get(&name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SoundName, &str)> + '_ {
        self.locators
            .iter()
            .map(|(name, locator)| (*name, locator.as_str()))
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_every_sound() {
        let registry = SoundRegistry::builtin();
        assert_eq!(registry.len(), SoundName::ALL.len());
        assert_eq!(
            registry.locator(SoundName::ProjectorStart),
            Some("/sounds/projector-start.mp3")
        );
        assert_eq!(registry.locator(SoundName::Hover), Some("/sounds/hover.mp3"));
    }

    #[test]
    fn custom_root_drops_trailing_slash() {
        let registry = SoundRegistry::with_root("assets/sfx/");
        assert_eq!(
            registry.locator(SoundName::ReelLoad),
            Some("assets/sfx/reel-load.mp3")
        );
    }

    #[test]
    fn parses_known_keys_and_rejects_unknown() {
        assert_eq!("filmFlicker".parse::<SoundName>().unwrap(), SoundName::FilmFlicker);
        let err = "airhorn".parse::<SoundName>().unwrap_err();
        assert!(format!("{err}").contains("airhorn"));
    }
}
