use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;
use trendscout_core::Platform;

use super::{absolute_url, attr_of, insert_opt, text_of, ExtractionStrategy, Target};
use crate::types::{CollectParams, RawItem};

const ORIGIN: &str = "https://news.ycombinator.com";

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr.athing").expect("valid selector"));
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.titleline > a").expect("valid selector"));
static RANK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.rank").expect("valid selector"));
static SITE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.sitestr").expect("valid selector"));
static SCORE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.score").expect("valid selector"));
static SUBTEXT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.subtext a").expect("valid selector"));

/// Front page of Hacker News.
pub struct HackerNews;

impl ExtractionStrategy for HackerNews {
    fn platform(&self) -> &'static str {
        Platform::HACKER_NEWS
    }

    fn targets(&self, _params: &CollectParams) -> Vec<Target> {
        vec![Target::page(format!("{ORIGIN}/"))]
    }

    fn ready_selector(&self) -> &'static str {
        "tr.athing"
    }

    fn parse(&self, html: &str, _target: &Target, limit: usize) -> Vec<RawItem> {
        let doc = Html::parse_document(html);

        // Points and comment links live in the row after each story, keyed by story id.
        let points: HashMap<String, String> = doc
            .select(&SCORE)
            .filter_map(|el| {
                let id = el.value().attr("id")?.strip_prefix("score_")?.to_string();
                Some((id, el.text().collect::<String>().trim().to_string()))
            })
            .collect();

        let comments: HashMap<String, String> = doc
            .select(&SUBTEXT_LINK)
            .filter_map(|el| {
                let id = el.value().attr("href")?.strip_prefix("item?id=")?.to_string();
                let text = el.text().collect::<String>().replace('\u{a0}', " ");
                text.contains("comment").then(|| (id, text.trim().to_string()))
            })
            .collect();

        doc.select(&ROW)
            .filter_map(|row| {
                let id = row.value().attr("id")?.to_string();
                let title = text_of(row, &TITLE_LINK)?;
                let href = attr_of(row, &TITLE_LINK, "href")?;

                let mut raw = RawItem::new();
                raw.insert("title".into(), Value::String(title));
                raw.insert("url".into(), Value::String(absolute_url(ORIGIN, &href)));
                raw.insert("hn_id".into(), Value::String(id.clone()));
                insert_opt(&mut raw, "rank", text_of(row, &RANK));
                insert_opt(&mut raw, "site", text_of(row, &SITE));
                insert_opt(&mut raw, "points", points.get(&id).cloned());
                insert_opt(&mut raw, "comments", comments.get(&id).cloned());
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

    const FRONT_PAGE: &str = r#"
<html><body><table>
<tr class="athing submission" id="42000001">
  <td class="title"><span class="rank">1.</span></td>
  <td class="title"><span class="titleline"><a href="https://example.com/db">Show HN: A tiny database</a>
    <span class="sitebit comhead"> (<a href="from?site=example.com"><span class="sitestr">example.com</span></a>)</span></span></td>
</tr>
<tr><td colspan="2"></td><td class="subtext"><span class="subline">
  <span class="score" id="score_42000001">245 points</span> by <a class="hnuser" href="user?id=a">a</a>
  | <a href="hide?id=42000001">hide</a> | <a href="item?id=42000001">87&nbsp;comments</a>
</span></td></tr>
<tr class="athing submission" id="42000002">
  <td class="title"><span class="rank">2.</span></td>
  <td class="title"><span class="titleline"><a href="item?id=42000002">Ask HN: How do you track trends?</a></span></td>
</tr>
<tr><td colspan="2"></td><td class="subtext"><span class="subline">
  <span class="score" id="score_42000002">12 points</span> | <a href="item?id=42000002">discuss</a>
</span></td></tr>
<tr class="athing submission" id="42000003">
  <td class="title"><span class="rank">3.</span></td>
  <td class="title"><span class="titleline"><a href="https://example.org/jobs">Acme is hiring</a></span></td>
</tr>
</table></body></html>"#;

    #[test]
    fn parses_front_page_rows() {
        let items = HackerNews.parse(FRONT_PAGE, &Target::page(ORIGIN), 30);
        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(first["title"], "Show HN: A tiny database");
        assert_eq!(first["url"], "https://example.com/db");
        assert_eq!(first["site"], "example.com");
        assert_eq!(first["rank"], "1.");
        assert_eq!(parse_count(&first["points"]), 245.0);
        assert_eq!(parse_count(&first["comments"]), 87.0);
    }

    #[test]
    fn self_posts_get_absolute_urls_and_no_comment_count() {
        let items = HackerNews.parse(FRONT_PAGE, &Target::page(ORIGIN), 30);
        let ask = &items[1];
        assert_eq!(ask["url"], "https://news.ycombinator.com/item?id=42000002");
        assert!(!ask.contains_key("comments"));
    }

    #[test]
    fn job_posts_have_no_points() {
        let items = HackerNews.parse(FRONT_PAGE, &Target::page(ORIGIN), 30);
        assert!(!items[2].contains_key("points"));
    }

    #[test]
    fn respects_limit() {
        let items = HackerNews.parse(FRONT_PAGE, &Target::page(ORIGIN), 2);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn page_without_rows_yields_nothing() {
        let items = HackerNews.parse("<html><body>rate limited</body></html>", &Target::page(ORIGIN), 30);
        assert!(items.is_empty());
    }
}
