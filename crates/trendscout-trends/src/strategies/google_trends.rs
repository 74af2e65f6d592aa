use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use trendscout_core::Platform;

use super::{absolute_url, attr_of, insert_opt, text_of, ExtractionStrategy, Target};
use crate::types::{CollectParams, RawItem};

const ORIGIN: &str = "https://trends.google.com";
const DEFAULT_GEO: &str = "US";
const ITEM_CSS: &str =
    r#".feed-item, .trend-item, .trending-search-item, [data-testid*="trend"], tr[data-row-id]"#;

static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse(ITEM_CSS).expect("valid selector"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#".title a, .title, .query, [data-testid*="title"]"#).expect("valid selector")
});
static SEARCHES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#".search-count-title, .searches, [class*="search-count"], [data-testid*="volume"]"#)
        .expect("valid selector")
});
static RELATED: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".related-queries a, .recently-trending-related a").expect("valid selector")
});
static SNIPPET: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".summary-text, .snippet, .image-text").expect("valid selector")
});
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Daily trending searches for one region.
pub struct GoogleTrends;

/// Two-letter region code from the roster params, `US` otherwise.
fn geo(params: &CollectParams) -> String {
    params
        .extra
        .as_ref()
        .and_then(|extra| extra.get("geo"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|g| !g.is_empty() && g.chars().all(|c| c.is_ascii_alphabetic()))
        .map_or_else(|| DEFAULT_GEO.to_string(), str::to_ascii_uppercase)
}

/// The item's own leading text when it has no title element.
fn leading_text(el: ElementRef<'_>) -> Option<String> {
    el.text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

impl ExtractionStrategy for GoogleTrends {
    fn platform(&self) -> &'static str {
        Platform::GOOGLE_TRENDS
    }

    fn targets(&self, params: &CollectParams) -> Vec<Target> {
        vec![Target::page(format!(
            "{ORIGIN}/trends/trendingsearches/daily?geo={}",
            geo(params)
        ))]
    }

    fn ready_selector(&self) -> &'static str {
        ITEM_CSS
    }

    fn parse(&self, html: &str, _target: &Target, limit: usize) -> Vec<RawItem> {
        let doc = Html::parse_document(html);
        let mut seen = HashSet::new();

        doc.select(&ITEM)
            .filter_map(|item| {
                let query = text_of(item, &TITLE).or_else(|| leading_text(item))?;
                if !seen.insert(query.to_lowercase()) {
                    return None;
                }

                let related: Vec<Value> = item
                    .select(&RELATED)
                    .map(|a| a.text().collect::<String>().trim().to_string())
                    .filter(|t| !t.is_empty())
                    .map(Value::String)
                    .collect();

                let mut raw = RawItem::new();
                raw.insert("query".into(), Value::String(query));
                insert_opt(&mut raw, "searches", text_of(item, &SEARCHES));
                insert_opt(&mut raw, "snippet", text_of(item, &SNIPPET));
                insert_opt(
                    &mut raw,
                    "url",
                    attr_of(item, &LINK, "href").map(|href| absolute_url(ORIGIN, &href)),
                );
                if !related.is_empty() {
                    raw.insert("related_queries".into(), Value::Array(related));
                }
                Some(raw)
            })
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::normalize::parse_count;

    const DAILY: &str = r#"
<html><body><div class="feed-list-wrapper">
  <div class="feed-item">
    <div class="index">1</div>
    <div class="details-top"><div class="title"><a href="/trends/explore?q=ai+regulation&geo=US">AI regulation</a></div></div>
    <div class="search-count-title">200K+</div>
    <div class="summary-text">Lawmakers debate new rules</div>
    <div class="recently-trending-related"><a>ai act</a><a>eu ai</a></div>
  </div>
  <div class="feed-item">
    <div class="title"><a href="/trends/explore?q=solar">Solar eclipse</a></div>
    <div class="search-count-title">50K+</div>
  </div>
  <div class="feed-item">
    <div class="title"><a href="/trends/explore?q=solar">solar eclipse</a></div>
  </div>
  <div class="trend-item">Quantum chips</div>
</div></body></html>"#;

    #[test]
    fn parses_daily_trending_searches() {
        let items = GoogleTrends.parse(DAILY, &Target::page(ORIGIN), 20);
        assert_eq!(items.len(), 3, "case-insensitive duplicates are dropped");

        let first = &items[0];
        assert_eq!(first["query"], "AI regulation");
        assert_eq!(parse_count(&first["searches"]), 200_000.0);
        assert_eq!(first["snippet"], "Lawmakers debate new rules");
        assert_eq!(
            first["url"],
            "https://trends.google.com/trends/explore?q=ai+regulation&geo=US"
        );
        assert_eq!(first["related_queries"], json!(["ai act", "eu ai"]));
    }

    #[test]
    fn bare_items_use_their_text() {
        let items = GoogleTrends.parse(DAILY, &Target::page(ORIGIN), 20);
        assert_eq!(items[2]["query"], "Quantum chips");
        assert!(!items[2].contains_key("searches"));
    }

    #[test]
    fn region_comes_from_params() {
        let params = CollectParams {
            extra: Some(json!({ "geo": "gb" })),
            ..CollectParams::default()
        };
        let targets = GoogleTrends.targets(&params);
        assert_eq!(
            targets[0].url,
            "https://trends.google.com/trends/trendingsearches/daily?geo=GB"
        );
        assert!(GoogleTrends.targets(&CollectParams::default())[0].url.ends_with("geo=US"));
    }
}
