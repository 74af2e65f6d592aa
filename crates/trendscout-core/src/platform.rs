use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Source identifier for trend data.
///
/// The set is open: any lowercase kebab-case tag is a valid platform. The
/// associated constants name the platforms that ship with a built-in
/// collector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    pub const GOOGLE_TRENDS: &'static str = "google-trends";
    pub const HACKER_NEWS: &'static str = "hacker-news";
    pub const PRODUCT_HUNT: &'static str = "product-hunt";
    pub const REDDIT: &'static str = "reddit";
    pub const INSTAGRAM: &'static str = "instagram";
    pub const TIKTOK: &'static str = "tiktok";
    pub const TWITTER: &'static str = "twitter";
    pub const LINKEDIN: &'static str = "linkedin";
    pub const MEDIUM: &'static str = "medium";
    pub const SUBSTACK: &'static str = "substack";
    pub const GLASSDOOR: &'static str = "glassdoor";
    pub const TRUSTPILOT: &'static str = "trustpilot";
    pub const G2: &'static str = "g2";
    pub const CAPTERRA: &'static str = "capterra";
    pub const SOUNDCLOUD: &'static str = "soundcloud";
    pub const MASTODON: &'static str = "mastodon";
    pub const NEXTDOOR: &'static str = "nextdoor";

    /// Builds a platform tag, normalizing case, underscores and spaces.
    ///
    /// `"Hacker_News"` and `"hacker news"` both become `hacker-news`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPlatform`] if the tag is empty after
    /// trimming or contains characters other than ASCII alphanumerics and `-`.
    pub fn new(tag: impl AsRef<str>) -> Result<Self, ConfigError> {
        let raw = tag.as_ref();
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();

        if normalized.is_empty()
            || normalized.starts_with('-')
            || normalized.ends_with('-')
            || !normalized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ConfigError::InvalidPlatform(raw.to_string()));
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platforms with a built-in collector, in display order.
    #[must_use]
    pub fn builtin() -> Vec<Platform> {
        [
            Self::GOOGLE_TRENDS,
            Self::HACKER_NEWS,
            Self::PRODUCT_HUNT,
            Self::REDDIT,
            Self::INSTAGRAM,
            Self::TIKTOK,
            Self::TWITTER,
            Self::LINKEDIN,
            Self::MEDIUM,
            Self::SUBSTACK,
            Self::GLASSDOOR,
            Self::TRUSTPILOT,
            Self::G2,
            Self::CAPTERRA,
            Self::SOUNDCLOUD,
            Self::MASTODON,
            Self::NEXTDOOR,
        ]
        .into_iter()
        .map(|tag| Platform(tag.to_string()))
        .collect()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Platform {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.0
    }
}

impl PartialEq<&str> for Platform {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
