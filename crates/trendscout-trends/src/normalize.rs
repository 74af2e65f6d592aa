//! Maps raw per-platform records onto [`TrendItem`].
//!
//! Each platform is described by a static [`FieldMap`]: which source fields
//! feed the title, body, url and tags, which counters are preserved, and how
//! engagement is computed. Adding a platform means adding a table entry.
//! Normalization is pure: the capture timestamp is an input and the item id is
//! a hash of its content.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use trendscout_core::Platform;

use crate::types::{ContentKind, ItemSource, RawItem, TrendItem};

const MAX_TITLE_CHARS: usize = 100;
const UNTITLED: &str = "Untitled";

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?|\.[0-9]+)\s*([kKmMbB])?").expect("valid count regex")
});

/// How engagement is derived from a record's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementFormula {
    /// `primary + secondary`.
    Sum {
        primary: &'static str,
        secondary: Option<&'static str>,
    },
    /// `(likes + comments) / max(followers, 1)`.
    PerFollower {
        likes: &'static str,
        comments: &'static str,
        followers: &'static str,
    },
}

impl EngagementFormula {
    /// Always finite and non-negative.
    #[must_use]
    pub fn apply(&self, raw: &RawItem) -> f64 {
        let count = |field: &str| raw.get(field).map_or(0.0, parse_count);
        let value = match *self {
            Self::Sum { primary, secondary } => count(primary) + secondary.map_or(0.0, count),
            Self::PerFollower {
                likes,
                comments,
                followers,
            } => (count(likes) + count(comments)) / count(followers).max(1.0),
        };
        sanitize(value)
    }
}

/// Declarative description of one platform's record shape.
///
/// Candidate lists are tried in order; the first non-empty value wins.
#[derive(Debug)]
pub struct FieldMap {
    pub kind: ContentKind,
    pub title: &'static [&'static str],
    /// Appended to a title taken from `title`, e.g. `"Acme"` becomes
    /// `"Acme Review"`.
    pub title_suffix: &'static str,
    pub body: &'static [&'static str],
    pub url: &'static [&'static str],
    pub tags: &'static [&'static str],
    pub metrics: &'static [&'static str],
    pub engagement: EngagementFormula,
}

static INSTAGRAM: FieldMap = FieldMap {
    kind: ContentKind::Image,
    title: &["title", "description", "caption"],
    title_suffix: "",
    body: &["description", "caption"],
    url: &["url", "post_url"],
    tags: &["hashtags", "tags"],
    metrics: &["likes", "num_comments", "followers", "views"],
    engagement: EngagementFormula::PerFollower {
        likes: "likes",
        comments: "num_comments",
        followers: "followers",
    },
};

static TIKTOK: FieldMap = FieldMap {
    kind: ContentKind::Video,
    title: &["title", "description", "desc"],
    title_suffix: "",
    body: &["description", "desc"],
    url: &["url", "video_url"],
    tags: &["hashtags", "tags"],
    metrics: &["views", "likes", "comments", "shares"],
    engagement: EngagementFormula::Sum {
        primary: "views",
        secondary: Some("likes"),
    },
};

static TWITTER: FieldMap = FieldMap {
    kind: ContentKind::TrendTopic,
    title: &["name", "hashtag", "text"],
    title_suffix: "",
    body: &["text", "description"],
    url: &["url"],
    tags: &["hashtags", "tags"],
    metrics: &["tweet_volume", "retweets", "likes"],
    engagement: EngagementFormula::Sum {
        primary: "tweet_volume",
        secondary: None,
    },
};

static LINKEDIN: FieldMap = FieldMap {
    kind: ContentKind::Post,
    title: &["title", "headline", "post_text", "text"],
    title_suffix: "",
    body: &["post_text", "text", "content"],
    url: &["url", "post_url"],
    tags: &["hashtags", "tags"],
    metrics: &["num_likes", "num_comments", "num_shares"],
    engagement: EngagementFormula::Sum {
        primary: "num_likes",
        secondary: Some("num_comments"),
    },
};

static REDDIT: FieldMap = FieldMap {
    kind: ContentKind::Post,
    title: &["title"],
    title_suffix: "",
    body: &["selftext", "body"],
    url: &["url", "permalink"],
    tags: &["subreddit", "flair"],
    metrics: &["score", "comments"],
    engagement: EngagementFormula::Sum {
        primary: "score",
        secondary: Some("comments"),
    },
};

static HACKER_NEWS: FieldMap = FieldMap {
    kind: ContentKind::Article,
    title: &["title"],
    title_suffix: "",
    body: &["text"],
    url: &["url"],
    tags: &["site"],
    metrics: &["points", "comments", "rank"],
    engagement: EngagementFormula::Sum {
        primary: "points",
        secondary: Some("comments"),
    },
};

static PRODUCT_HUNT: FieldMap = FieldMap {
    kind: ContentKind::Post,
    title: &["name", "title"],
    title_suffix: "",
    body: &["tagline", "description"],
    url: &["url"],
    tags: &["topics", "tags"],
    metrics: &["votes", "comments"],
    engagement: EngagementFormula::Sum {
        primary: "votes",
        secondary: Some("comments"),
    },
};

static GOOGLE_TRENDS: FieldMap = FieldMap {
    kind: ContentKind::TrendTopic,
    title: &["query", "title"],
    title_suffix: "",
    body: &["snippet", "description"],
    url: &["url"],
    tags: &["related_queries", "tags"],
    metrics: &["searches"],
    engagement: EngagementFormula::Sum {
        primary: "searches",
        secondary: None,
    },
};

static MEDIUM: FieldMap = FieldMap {
    kind: ContentKind::Article,
    title: &["title"],
    title_suffix: "",
    body: &["subtitle", "content"],
    url: &["url"],
    tags: &["tags"],
    metrics: &["claps", "responses", "reading_time"],
    engagement: EngagementFormula::Sum {
        primary: "claps",
        secondary: Some("responses"),
    },
};

static SUBSTACK: FieldMap = FieldMap {
    kind: ContentKind::Newsletter,
    title: &["title"],
    title_suffix: "",
    body: &["description", "preview_text"],
    url: &["url"],
    tags: &["topics"],
    metrics: &["likes", "comments", "subscriber_count"],
    engagement: EngagementFormula::Sum {
        primary: "likes",
        secondary: Some("comments"),
    },
};

static GLASSDOOR: FieldMap = FieldMap {
    kind: ContentKind::Review,
    title: &["company_name"],
    title_suffix: " Review",
    body: &["review_text"],
    url: &["company_url"],
    tags: &["job_title", "location"],
    metrics: &["overall_rating", "helpful_count", "work_life_balance_rating"],
    engagement: EngagementFormula::Sum {
        primary: "helpful_count",
        secondary: None,
    },
};

static TRUSTPILOT: FieldMap = FieldMap {
    kind: ContentKind::Review,
    title: &["company_name"],
    title_suffix: " Customer Review",
    body: &["review_text"],
    url: &["company_url"],
    tags: &["service_category"],
    metrics: &["stars", "likes", "verified_purchase"],
    engagement: EngagementFormula::Sum {
        primary: "likes",
        secondary: None,
    },
};

static G2: FieldMap = FieldMap {
    kind: ContentKind::Review,
    title: &["product_name"],
    title_suffix: " G2 Review",
    body: &["review_text"],
    url: &["product_url"],
    tags: &["category", "company_size"],
    metrics: &["overall_rating", "helpful_count", "ease_of_use_rating"],
    engagement: EngagementFormula::Sum {
        primary: "helpful_count",
        secondary: None,
    },
};

static CAPTERRA: FieldMap = FieldMap {
    kind: ContentKind::Review,
    title: &["software_name"],
    title_suffix: " Business Review",
    body: &["review_text"],
    url: &["software_url"],
    tags: &["category", "deployment_type"],
    metrics: &["overall_rating", "helpful_votes", "value_rating"],
    engagement: EngagementFormula::Sum {
        primary: "helpful_votes",
        secondary: None,
    },
};

static SOUNDCLOUD: FieldMap = FieldMap {
    kind: ContentKind::Track,
    title: &["title"],
    title_suffix: "",
    body: &["description"],
    url: &["permalink_url", "url"],
    tags: &["tag_list", "tags"],
    metrics: &["plays", "likes", "comment_count"],
    engagement: EngagementFormula::Sum {
        primary: "plays",
        secondary: Some("likes"),
    },
};

// Mastodon posts have no title; the status text doubles as one.
static MASTODON: FieldMap = FieldMap {
    kind: ContentKind::Post,
    title: &["content"],
    title_suffix: "",
    body: &["content"],
    url: &["url"],
    tags: &["tags"],
    metrics: &["favourites_count", "reblogs_count", "replies_count"],
    engagement: EngagementFormula::Sum {
        primary: "favourites_count",
        secondary: Some("reblogs_count"),
    },
};

static NEXTDOOR: FieldMap = FieldMap {
    kind: ContentKind::Post,
    title: &["subject"],
    title_suffix: "",
    body: &["body"],
    url: &["url"],
    tags: &["category", "neighborhood"],
    metrics: &["likes", "comments", "reach"],
    engagement: EngagementFormula::Sum {
        primary: "likes",
        secondary: Some("comments"),
    },
};

static GENERIC: FieldMap = FieldMap {
    kind: ContentKind::Post,
    title: &["title", "name", "text", "description"],
    title_suffix: "",
    body: &["body", "text", "description", "content"],
    url: &["url", "link"],
    tags: &["tags", "hashtags"],
    metrics: &["likes", "comments", "views", "shares"],
    engagement: EngagementFormula::Sum {
        primary: "likes",
        secondary: Some("comments"),
    },
};

/// The field map for `platform`; unknown platforms get the generic map.
#[must_use]
pub fn field_map(platform: &Platform) -> &'static FieldMap {
    match platform.as_str() {
        Platform::INSTAGRAM => &INSTAGRAM,
        Platform::TIKTOK => &TIKTOK,
        Platform::TWITTER => &TWITTER,
        Platform::LINKEDIN => &LINKEDIN,
        Platform::REDDIT => &REDDIT,
        Platform::HACKER_NEWS => &HACKER_NEWS,
        Platform::PRODUCT_HUNT => &PRODUCT_HUNT,
        Platform::GOOGLE_TRENDS => &GOOGLE_TRENDS,
        Platform::MEDIUM => &MEDIUM,
        Platform::SUBSTACK => &SUBSTACK,
        Platform::GLASSDOOR => &GLASSDOOR,
        Platform::TRUSTPILOT => &TRUSTPILOT,
        Platform::G2 => &G2,
        Platform::CAPTERRA => &CAPTERRA,
        Platform::SOUNDCLOUD => &SOUNDCLOUD,
        Platform::MASTODON => &MASTODON,
        Platform::NEXTDOOR => &NEXTDOOR,
        _ => &GENERIC,
    }
}

/// Normalize one raw record. Items come out tagged [`ItemSource::Live`].
#[must_use]
pub fn normalize(platform: &Platform, raw: &RawItem, captured_at: DateTime<Utc>) -> TrendItem {
    let map = field_map(platform);

    let body = first_text(raw, map.body).unwrap_or_default();
    let title = first_text(raw, map.title)
        .map(|t| format!("{t}{}", map.title_suffix))
        .or_else(|| (!body.is_empty()).then(|| body.clone()))
        .map_or_else(|| UNTITLED.to_string(), |t| truncate_chars(&t, MAX_TITLE_CHARS));
    let url = first_text(raw, map.url);

    let tags = map
        .tags
        .iter()
        .filter_map(|field| raw.get(*field))
        .flat_map(tag_values)
        .collect::<BTreeSet<_>>();

    let raw_metrics = map
        .metrics
        .iter()
        .filter_map(|field| raw.get(*field).map(|v| ((*field).to_string(), v.clone())))
        .collect::<BTreeMap<_, _>>();

    TrendItem {
        id: item_id(platform, url.as_deref(), &title),
        platform: platform.clone(),
        kind: map.kind,
        title,
        body,
        url,
        engagement: map.engagement.apply(raw),
        tags,
        captured_at,
        raw_metrics,
        source: ItemSource::Live,
    }
}

#[must_use]
pub fn normalize_all(
    platform: &Platform,
    raws: &[RawItem],
    captured_at: DateTime<Utc>,
) -> Vec<TrendItem> {
    raws.iter()
        .map(|raw| normalize(platform, raw, captured_at))
        .collect()
}

/// Parse a counter from a JSON number or a display string.
///
/// Accepts `1234`, `"1,234"`, `"12.5K"`, `"3M"`, `"200K+"` and
/// `"245 points"`. Anything unparseable, negative or non-finite is `0`.
#[must_use]
pub fn parse_count(value: &Value) -> f64 {
    match value {
        Value::Number(n) => sanitize(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => parse_count_str(s),
        _ => 0.0,
    }
}

fn parse_count_str(s: &str) -> f64 {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    let Some(caps) = COUNT_RE.captures(&cleaned) else {
        return 0.0;
    };
    let Ok(base) = caps[1].parse::<f64>() else {
        return 0.0;
    };
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(suffix) if suffix == "k" => 1_000.0,
        Some(suffix) if suffix == "m" => 1_000_000.0,
        Some(suffix) if suffix == "b" => 1_000_000_000.0,
        _ => 1.0,
    };
    sanitize(base * multiplier)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn first_text(raw: &RawItem, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match raw.get(*field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Tags from an array of strings or `{name}` objects, or a comma/space
/// separated string.
fn tag_values(value: &Value) -> Vec<String> {
    let pieces: Vec<&str> = match value {
        Value::String(s) => s.split([',', ' ']).collect(),
        Value::Array(values) => values
            .iter()
            .filter_map(|v| v.as_str().or_else(|| v.get("name").and_then(Value::as_str)))
            .collect(),
        _ => Vec::new(),
    };
    pieces.into_iter().filter_map(clean_tag).collect()
}

fn clean_tag(tag: &str) -> Option<String> {
    let cleaned = tag.trim().trim_start_matches('#').trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect::<String>().trim_end().to_string()
}

/// First 16 hex chars of `sha256(platform|url|title)`.
fn item_id(platform: &Platform, url: Option<&str>, title: &str) -> String {
    let input = format!("{}|{}|{}", platform, url.unwrap_or_default(), title);
    let mut hex = format!("{:x}", Sha256::digest(input.as_bytes()));
    hex.truncate(16);
    hex
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
