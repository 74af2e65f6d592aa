//! Synthetic trend data used when a platform cannot be collected live.
//!
//! Samples are raw records in each platform's native shape, so they go
//! through the same normalizer as live data and satisfy the same invariants.
//! Every generated item is tagged [`ItemSource::Fallback`].

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use trendscout_core::Platform;

use crate::normalize::normalize;
use crate::types::{ItemSource, RawItem, TrendItem};

fn samples(platform: &Platform) -> Vec<Value> {
    match platform.as_str() {
        Platform::INSTAGRAM => vec![json!({
            "description": "AI Revolution in Business Strategy",
            "caption": "How artificial intelligence is transforming strategic decision-making",
            "hashtags": ["#AI", "#Strategy", "#Business"],
            "likes": 1050,
            "num_comments": 200,
        })],
        Platform::TWITTER => vec![json!({
            "name": "#TechStrategy",
            "text": "Strategic technology adoption is key to competitive advantage",
            "hashtags": ["#TechStrategy"],
            "tweet_volume": 45600,
        })],
        Platform::TIKTOK => vec![json!({
            "description": "AI tools that every strategist needs in 2025",
            "hashtags": ["#AItools", "#strategy", "#productivity"],
            "views": 125_000,
            "likes": 8900,
            "comments": 340,
        })],
        Platform::LINKEDIN => vec![json!({
            "headline": "The Future of Strategic Leadership",
            "post_text": "Exploring how modern leaders navigate uncertainty and drive innovation",
            "hashtags": ["leadership", "strategy", "innovation"],
            "num_likes": 456,
            "num_comments": 38,
        })],
        Platform::PRODUCT_HUNT => vec![json!({
            "name": "Strategic Intelligence Platform",
            "tagline": "AI-powered platform for strategic content analysis and business insights",
            "topics": ["ai", "strategy", "saas"],
            "votes": 1420,
            "comments": 160,
        })],
        Platform::HACKER_NEWS => vec![json!({
            "title": "Show HN: Open-source toolkit for tracking market signals",
            "site": "github.com",
            "points": 312,
            "comments": 97,
        })],
        Platform::REDDIT => vec![json!({
            "title": "What emerging technologies are you watching this year?",
            "subreddit": "technology",
            "score": 2150,
            "comments": 486,
        })],
        Platform::GOOGLE_TRENDS => vec![json!({
            "query": "AI regulation",
            "snippet": "Lawmakers debate new rules for artificial intelligence",
            "related_queries": ["ai act", "ai policy"],
            "searches": "200K+",
        })],
        Platform::MEDIUM => vec![json!({
            "title": "The Future of Strategic Leadership",
            "subtitle": "Exploring how modern leaders navigate uncertainty and drive innovation",
            "tags": ["leadership", "strategy", "innovation"],
            "claps": 2650,
            "responses": 190,
            "reading_time": 8,
        })],
        Platform::SUBSTACK => vec![json!({
            "title": "The Operator's Weekly: pricing in a downturn",
            "description": "How subscription businesses are rethinking discounts",
            "topics": ["business", "strategy"],
            "likes": 640,
            "comments": 85,
            "subscriber_count": 42_000,
        })],
        Platform::GLASSDOOR => vec![json!({
            "company_name": "Northwind Analytics",
            "review_text": "Strong engineering culture, leadership still finding its strategy",
            "job_title": "Engineer",
            "location": "Remote",
            "overall_rating": 4.2,
            "helpful_count": 58,
        })],
        Platform::TRUSTPILOT => vec![json!({
            "company_name": "CloudDesk",
            "review_text": "Onboarding took minutes and support answered within the hour",
            "service_category": "saas",
            "stars": 5,
            "likes": 34,
        })],
        Platform::G2 => vec![json!({
            "product_name": "PipelinePro CRM",
            "review_text": "Forecasting views finally match how our sales team works",
            "category": "crm",
            "company_size": "mid-market",
            "overall_rating": 4.6,
            "helpful_count": 71,
        })],
        Platform::CAPTERRA => vec![json!({
            "software_name": "TaskHarbor",
            "review_text": "Good value for small teams juggling many client projects",
            "category": "project-management",
            "deployment_type": "cloud",
            "overall_rating": 4.4,
            "helpful_votes": 26,
        })],
        Platform::SOUNDCLOUD => vec![json!({
            "title": "Midnight Signals (Extended Mix)",
            "description": "Weekly electronic chart climber",
            "tag_list": ["electronic", "house"],
            "plays": 84_000,
            "likes": 3200,
            "comment_count": 140,
        })],
        Platform::MASTODON => vec![json!({
            "content": "Open standards keep winning: more teams are moving community updates to the fediverse",
            "tags": [{ "name": "fediverse" }, { "name": "opensource" }],
            "favourites_count": 310,
            "reblogs_count": 95,
            "replies_count": 22,
        })],
        Platform::NEXTDOOR => vec![json!({
            "subject": "New co-working space opening downtown",
            "body": "Neighbors are asking about memberships and community events",
            "category": "local-business",
            "neighborhood": "downtown",
            "likes": 48,
            "comments": 19,
        })],
        other => vec![json!({
            "title": format!("Trending on {other}"),
            "description": format!("Sample trending content for {other}"),
            "likes": 100,
            "comments": 10,
        })],
    }
}

/// Synthetic items for `platform`. Never empty; identical for identical
/// inputs.
#[must_use]
pub fn generate(platform: &Platform, captured_at: DateTime<Utc>) -> Vec<TrendItem> {
    samples(platform)
        .into_iter()
        .filter_map(|sample| match sample {
            Value::Object(raw) => Some(raw),
            _ => None,
        })
        .map(|raw: RawItem| {
            let mut item = normalize(platform, &raw, captured_at);
            item.source = ItemSource::Fallback;
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn every_known_platform_has_tagged_items() {
        for platform in Platform::builtin() {
            let items = generate(&platform, at());
            assert!(!items.is_empty(), "{platform} has no fallback data");
            for item in &items {
                assert_eq!(item.source, ItemSource::Fallback);
                assert_eq!(item.platform, platform);
                assert_eq!(item.captured_at, at());
                assert!(item.engagement.is_finite() && item.engagement >= 0.0);
                assert!(!item.title.is_empty());
            }
        }
    }

    #[test]
    fn unknown_platform_gets_a_generic_item() {
        let platform = Platform::new("bluesky").unwrap();
        let items = generate(&platform, at());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Trending on bluesky");
        assert!((items[0].engagement - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn output_is_deterministic() {
        let platform = Platform::new(Platform::TWITTER).unwrap();
        assert_eq!(generate(&platform, at()), generate(&platform, at()));
    }

    #[test]
    fn samples_use_platform_formulas() {
        let instagram = generate(&Platform::new(Platform::INSTAGRAM).unwrap(), at());
        assert!((instagram[0].engagement - 1250.0).abs() < f64::EPSILON);
        assert!(instagram[0].tags.contains("AI"));

        let tiktok = generate(&Platform::new(Platform::TIKTOK).unwrap(), at());
        assert!((tiktok[0].engagement - 133_900.0).abs() < f64::EPSILON);

        let trends = generate(&Platform::new(Platform::GOOGLE_TRENDS).unwrap(), at());
        assert!((trends[0].engagement - 200_000.0).abs() < f64::EPSILON);

        let medium = generate(&Platform::new(Platform::MEDIUM).unwrap(), at());
        assert_eq!(medium[0].title, "The Future of Strategic Leadership");
        assert!((medium[0].engagement - 2840.0).abs() < f64::EPSILON);

        let g2 = generate(&Platform::new(Platform::G2).unwrap(), at());
        assert_eq!(g2[0].title, "PipelinePro CRM G2 Review");
        assert!((g2[0].engagement - 71.0).abs() < f64::EPSILON);
    }

    #[test]
    fn builtin_platforms_have_their_own_samples() {
        for platform in Platform::builtin() {
            let items = generate(&platform, at());
            assert!(
                items.iter().all(|i| !i.title.starts_with("Trending on")),
                "{platform} uses the generic sample"
            );
        }
    }
}
