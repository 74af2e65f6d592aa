use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;
use trendscout_core::Platform;

use super::{absolute_url, attr_of, insert_opt, text_of, ExtractionStrategy, Target};
use crate::types::{CollectParams, RawItem};

const ORIGIN: &str = "https://www.producthunt.com";
const CARD_CSS: &str = r#"[data-test^="post-item"], [data-test*="product-item"]"#;

static CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse(CARD_CSS).expect("valid selector"));
static NAME: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-test^="post-name"], h3, h2, h4"#).expect("valid selector")
});
static TAGLINE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-test="tagline"], [data-test^="post-tagline"], p"#)
        .expect("valid selector")
});
static VOTES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-test="vote-button"], button[data-test*="vote"]"#)
        .expect("valid selector")
});
static COMMENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r##"[data-test*="comment"], a[href*="#comments"]"##).expect("valid selector")
});
static LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href^="/posts/"], a[href^="/products/"]"#).expect("valid selector")
});
static TOPIC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="/topics/"]"#).expect("valid selector"));

/// Today's launches on the Product Hunt homepage.
pub struct ProductHunt;

impl ExtractionStrategy for ProductHunt {
    fn platform(&self) -> &'static str {
        Platform::PRODUCT_HUNT
    }

    fn targets(&self, _params: &CollectParams) -> Vec<Target> {
        vec![Target::page(format!("{ORIGIN}/"))]
    }

    fn ready_selector(&self) -> &'static str {
        CARD_CSS
    }

    fn parse(&self, html: &str, _target: &Target, limit: usize) -> Vec<RawItem> {
        let doc = Html::parse_document(html);
        let mut seen = HashSet::new();

        doc.select(&CARD)
            .filter_map(|card| {
                let name = text_of(card, &NAME)?;
                if !seen.insert(name.clone()) {
                    return None;
                }

                let topics: Vec<Value> = card
                    .select(&TOPIC)
                    .map(|t| t.text().collect::<String>().trim().to_string())
                    .filter(|t| !t.is_empty())
                    .map(Value::String)
                    .collect();

                let mut raw = RawItem::new();
                raw.insert("name".into(), Value::String(name));
                insert_opt(&mut raw, "tagline", text_of(card, &TAGLINE));
                insert_opt(&mut raw, "votes", text_of(card, &VOTES));
                insert_opt(&mut raw, "comments", text_of(card, &COMMENTS));
                insert_opt(
                    &mut raw,
                    "url",
                    attr_of(card, &LINK, "href").map(|href| absolute_url(ORIGIN, &href)),
                );
                if !topics.is_empty() {
                    raw.insert("topics".into(), Value::Array(topics));
                }
                Some(raw)
            })
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_count;

    const HOMEPAGE: &str = r##"
<html><body><main>
  <section data-test="post-item-101">
    <a href="/posts/strategic-intelligence"><div data-test="post-name-101">Strategic Intelligence Platform</div></a>
    <a href="/posts/strategic-intelligence"><p>AI-powered market insights</p></a>
    <a href="/topics/artificial-intelligence">Artificial Intelligence</a>
    <a href="/topics/marketing">Marketing</a>
    <a href="/posts/strategic-intelligence#comments"><span>160</span></a>
    <button data-test="vote-button"><div>1,420</div></button>
  </section>
  <section data-test="post-item-102">
    <h3>Trend Radar</h3>
    <button data-test="vote-button">980</button>
  </section>
  <section data-test="post-item-103">
    <h3>Trend Radar</h3>
  </section>
  <section data-test="post-item-104"><img src="x.png"></section>
</main></body></html>"##;

    #[test]
    fn parses_product_cards() {
        let items = ProductHunt.parse(HOMEPAGE, &Target::page(ORIGIN), 20);
        assert_eq!(items.len(), 2, "duplicate and nameless cards are skipped");

        let first = &items[0];
        assert_eq!(first["name"], "Strategic Intelligence Platform");
        assert_eq!(first["tagline"], "AI-powered market insights");
        assert_eq!(first["url"], "https://www.producthunt.com/posts/strategic-intelligence");
        assert_eq!(parse_count(&first["votes"]), 1420.0);
        assert_eq!(parse_count(&first["comments"]), 160.0);
        assert_eq!(first["topics"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn missing_fields_are_omitted() {
        let items = ProductHunt.parse(HOMEPAGE, &Target::page(ORIGIN), 20);
        let second = &items[1];
        assert_eq!(second["name"], "Trend Radar");
        assert!(!second.contains_key("url"));
        assert!(!second.contains_key("comments"));
    }
}
