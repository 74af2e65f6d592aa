use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;
use trendscout_core::Platform;

use super::{absolute_url, insert_opt, text_of, ExtractionStrategy, Target};
use crate::types::{CollectParams, RawItem};

const ORIGIN: &str = "https://old.reddit.com";
const DEFAULT_SUBREDDIT: &str = "popular";

static THING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.thing").expect("valid selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.title").expect("valid selector"));

/// Hot listings on old.reddit.com, one page per subreddit keyword.
pub struct Reddit;

/// `r/Technology ` -> `Technology`; anything outside `[A-Za-z0-9_]` is dropped.
fn subreddit_name(keyword: &str) -> Option<String> {
    let trimmed = keyword.trim();
    let trimmed = trimmed
        .strip_prefix("/r/")
        .or_else(|| trimmed.strip_prefix("r/"))
        .unwrap_or(trimmed);
    let name: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

impl ExtractionStrategy for Reddit {
    fn platform(&self) -> &'static str {
        Platform::REDDIT
    }

    fn targets(&self, params: &CollectParams) -> Vec<Target> {
        let targets: Vec<Target> = params
            .keywords
            .iter()
            .filter_map(|kw| {
                subreddit_name(kw).map(|name| Target {
                    url: format!("{ORIGIN}/r/{name}/hot/"),
                    keyword: Some(kw.clone()),
                })
            })
            .collect();

        if targets.is_empty() {
            vec![Target::page(format!("{ORIGIN}/r/{DEFAULT_SUBREDDIT}/"))]
        } else {
            targets
        }
    }

    fn ready_selector(&self) -> &'static str {
        "div.thing"
    }

    fn parse(&self, html: &str, _target: &Target, limit: usize) -> Vec<RawItem> {
        let doc = Html::parse_document(html);

        doc.select(&THING)
            .filter(|thing| thing.value().attr("data-promoted") != Some("true"))
            .filter_map(|thing| {
                let el = thing.value();
                let title = text_of(thing, &TITLE)?;
                let permalink = el.attr("data-permalink").map(|p| absolute_url(ORIGIN, p));
                let url = el
                    .attr("data-url")
                    .map(|u| absolute_url(ORIGIN, u))
                    .or_else(|| permalink.clone());

                let mut raw = RawItem::new();
                raw.insert("title".into(), Value::String(title));
                insert_opt(&mut raw, "url", url);
                insert_opt(&mut raw, "permalink", permalink);
                insert_opt(&mut raw, "subreddit", el.attr("data-subreddit").map(str::to_string));
                insert_opt(&mut raw, "score", el.attr("data-score").map(str::to_string));
                insert_opt(
                    &mut raw,
                    "comments",
                    el.attr("data-comments-count").map(str::to_string),
                );
                insert_opt(&mut raw, "author", el.attr("data-author").map(str::to_string));
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

    const LISTING: &str = r#"
<html><body><div id="siteTable">
  <div class="thing promoted" data-promoted="true" data-score="1" data-subreddit="ads">
    <p class="title"><a class="title" href="https://ads.example.com">Buy now</a></p>
  </div>
  <div class="thing link" data-fullname="t3_abc" data-subreddit="technology" data-score="1520"
       data-comments-count="342" data-permalink="/r/technology/comments/abc/big_news/"
       data-url="https://example.com/article" data-author="alice" data-promoted="false">
    <p class="title"><a class="title may-blank" href="https://example.com/article">Big tech news</a></p>
  </div>
  <div class="thing link self" data-subreddit="technology" data-score="88"
       data-comments-count="12" data-permalink="/r/technology/comments/def/question/"
       data-url="/r/technology/comments/def/question/">
    <p class="title"><a class="title" href="/r/technology/comments/def/question/">A question</a></p>
  </div>
</div></body></html>"#;

    #[test]
    fn one_target_per_keyword_in_order() {
        let params = CollectParams {
            keywords: vec!["technology".into(), "r/marketing".into(), "!!".into()],
            ..CollectParams::default()
        };
        let urls: Vec<String> = Reddit.targets(&params).into_iter().map(|t| t.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://old.reddit.com/r/technology/hot/",
                "https://old.reddit.com/r/marketing/hot/",
            ]
        );
    }

    #[test]
    fn no_keywords_means_popular() {
        let targets = Reddit.targets(&CollectParams::default());
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].url, "https://old.reddit.com/r/popular/");
    }

    #[test]
    fn parses_listing_and_skips_promoted() {
        let items = Reddit.parse(LISTING, &Target::page(ORIGIN), 30);
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first["title"], "Big tech news");
        assert_eq!(first["url"], "https://example.com/article");
        assert_eq!(
            first["permalink"],
            "https://old.reddit.com/r/technology/comments/abc/big_news/"
        );
        assert_eq!(first["subreddit"], "technology");
        assert_eq!(parse_count(&first["score"]), 1520.0);
        assert_eq!(parse_count(&first["comments"]), 342.0);
    }

    #[test]
    fn self_post_url_is_absolute() {
        let items = Reddit.parse(LISTING, &Target::page(ORIGIN), 30);
        assert_eq!(
            items[1]["url"],
            "https://old.reddit.com/r/technology/comments/def/question/"
        );
    }

    #[test]
    fn respects_limit() {
        assert_eq!(Reddit.parse(LISTING, &Target::page(ORIGIN), 1).len(), 1);
    }
}
