//! Tolerant extraction of articles from free-form provider output.
//!
//! Generative providers are asked for JSON but routinely wrap it in prose or
//! markdown, pick their own top-level shape, and mix `title`/`Title` casing.
//! Nothing in here raises: anything unusable ends up as a `ParseFailure`,
//! which callers turn into an empty article list.

use chrono::Utc;
use serde_json::Value;

use super::NewsArticle;
use crate::sanitize::lenient_value;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_SUMMARY_CHARS: usize = 2000;
const MAX_RELEVANCE_CHARS: usize = 500;
const MAX_CATEGORY_CHARS: usize = 50;
const MAX_URL_CHARS: usize = 2048;
const MAX_DATE_CHARS: usize = 64;
const MAX_SOURCE_CHARS: usize = 100;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_SUMMARY: &str = "No summary available";
pub const DEFAULT_RELEVANCE: &str = "Related to search query";
pub const DEFAULT_CATEGORY: &str = "World";
pub const DEFAULT_SOURCE: &str = "Unknown";

/// Accepted spellings for each output field.
const TITLE_KEYS: &[&str] = &["title", "Title"];
const SUMMARY_KEYS: &[&str] = &["summary", "Summary"];
const RELEVANCE_KEYS: &[&str] = &["relevance", "Relevance"];
const CATEGORY_KEYS: &[&str] = &["category", "Category"];
const URL_KEYS: &[&str] = &["url", "URL"];
const DATE_KEYS: &[&str] = &["publishedDate", "PublishedDate"];
const SOURCE_KEYS: &[&str] = &["source", "Source"];

/// Why no articles could be read from a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    NoJsonFound,
    InvalidJson(String),
    NoArticleList,
}

/// Outcome of reading a provider response.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(Vec<NewsArticle>),
    Failed(ParseFailure),
}

impl ParseOutcome {
    /// Articles found, or an empty list on failure.
    pub fn into_articles(self) -> Vec<NewsArticle> {
        match self {
            ParseOutcome::Parsed(articles) => articles,
            ParseOutcome::Failed(reason) => {
                log::warn!("could not extract articles from provider response: {reason:?}");
                vec![]
            }
        }
    }
}

type Strategy = fn(&Value) -> Option<Vec<Value>>;

/// Ways to find the article list, tried in order. The first hit wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("top-level list", top_level_list),
    ("articles field", articles_field),
    ("results field", results_field),
    ("news field", news_field),
    ("titled values", titled_values),
];

/// Read articles out of raw provider text.
pub fn extract_articles(raw: &str) -> Vec<NewsArticle> {
    parse_response(raw).into_articles()
}

pub fn parse_response(raw: &str) -> ParseOutcome {
    let spans = json_spans(raw);
    if spans.is_empty() {
        return ParseOutcome::Failed(ParseFailure::NoJsonFound);
    }

    let mut failure = ParseFailure::NoJsonFound;
    for span in spans {
        let value = match serde_json::from_str::<Value>(span) {
            Ok(value) => value,
            Err(err) => {
                if !matches!(failure, ParseFailure::NoArticleList) {
                    failure = ParseFailure::InvalidJson(err.to_string());
                }
                continue;
            }
        };

        for (name, strategy) in STRATEGIES {
            if let Some(records) = strategy(&value) {
                log::debug!("article list resolved via {name}: {} records", records.len());
                let articles = records.iter().filter_map(normalize_article).collect();
                return ParseOutcome::Parsed(articles);
            }
        }
        failure = ParseFailure::NoArticleList;
    }

    ParseOutcome::Failed(failure)
}

/// Widest `{...}` span, then the widest `[...]` span as a fallback for
/// bare arrays.
fn json_spans(raw: &str) -> Vec<&str> {
    [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = raw.find(open)?;
            let end = raw.rfind(close)?;
            (end > start).then(|| &raw[start..=end])
        })
        .collect()
}

fn top_level_list(value: &Value) -> Option<Vec<Value>> {
    value.as_array().cloned()
}

fn list_field(value: &Value, key: &str) -> Option<Vec<Value>> {
    value.get(key)?.as_array().cloned()
}

fn articles_field(value: &Value) -> Option<Vec<Value>> {
    list_field(value, "articles")
}

fn results_field(value: &Value) -> Option<Vec<Value>> {
    list_field(value, "results")
}

fn news_field(value: &Value) -> Option<Vec<Value>> {
    list_field(value, "news")
}

fn titled_values(value: &Value) -> Option<Vec<Value>> {
    let object = value.as_object()?;
    let records: Vec<Value> = object
        .values()
        .filter(|v| v.is_object() && lookup(v, TITLE_KEYS).is_some())
        .cloned()
        .collect();

    if records.is_empty() {
        None
    } else {
        Some(records)
    }
}

fn lookup<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| record.get(*key))
}

/// Sanitized field value, or `None` when absent or empty after cleanup.
fn text_field(record: &Value, keys: &[&str], max_chars: usize) -> Option<String> {
    let text = lenient_value(lookup(record, keys), max_chars);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn normalize_article(record: &Value) -> Option<NewsArticle> {
    if !record.is_object() {
        return None;
    }

    Some(NewsArticle {
        title: text_field(record, TITLE_KEYS, MAX_TITLE_CHARS)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        summary: text_field(record, SUMMARY_KEYS, MAX_SUMMARY_CHARS)
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        relevance: text_field(record, RELEVANCE_KEYS, MAX_RELEVANCE_CHARS)
            .unwrap_or_else(|| DEFAULT_RELEVANCE.to_string()),
        category: text_field(record, CATEGORY_KEYS, MAX_CATEGORY_CHARS)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        url: text_field(record, URL_KEYS, MAX_URL_CHARS),
        published_date: text_field(record, DATE_KEYS, MAX_DATE_CHARS)
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
        source: text_field(record, SOURCE_KEYS, MAX_SOURCE_CHARS)
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_articles_field() {
        let articles = extract_articles(r#"{"articles":[{"title":"A"},{"title":"B"}]}"#);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "A");
        assert_eq!(articles[1].title, "B");
    }

    #[test]
    fn test_results_field_with_capitalized_keys() {
        let articles = extract_articles(r#"{"results":[{"Title":"X"}]}"#);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "X");
    }

    #[test]
    fn test_news_field() {
        let articles = extract_articles(r#"{"news":[{"Title":"N","Summary":"S"}]}"#);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].summary, "S");
    }

    #[test]
    fn test_not_json() {
        assert!(extract_articles("not json at all").is_empty());
        assert!(matches!(
            parse_response("not json at all"),
            ParseOutcome::Failed(ParseFailure::NoJsonFound)
        ));
    }

    #[test]
    fn test_broken_json() {
        assert!(extract_articles(r#"{"articles": [{"title": "A"}"#).is_empty());
        assert!(matches!(
            parse_response(r#"here: {"articles": [ } oops }"#),
            ParseOutcome::Failed(ParseFailure::InvalidJson(_))
        ));
    }

    #[test]
    fn test_json_wrapped_in_prose_and_fences() {
        let raw = "Sure! Here are the articles:\n```json\n{\"articles\":[{\"title\":\"Wrapped\"}]}\n```\nLet me know.";
        let articles = extract_articles(raw);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Wrapped");
    }

    #[test]
    fn test_top_level_array() {
        let articles = extract_articles(r#"[{"title":"One"},{"Title":"Two"}]"#);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].title, "Two");
    }

    #[test]
    fn test_citation_before_object() {
        let raw = r#"Per source [1]: {"a":{"title":"X"},"b":{"title":"Y"}}"#;
        let mut titles: Vec<String> = extract_articles(raw).into_iter().map(|a| a.title).collect();
        titles.sort();
        assert_eq!(titles, vec!["X", "Y"]);
    }

    #[test]
    fn test_bracket_span_used_when_object_span_fails() {
        let raw = r#"Found [{"title":"One"}] and {"title":"Two"}"#;
        let articles = extract_articles(raw);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "One");
    }

    #[test]
    fn test_titled_values_fallback() {
        let raw = r#"{"first":{"Title":"A"},"second":{"title":"B"},"meta":{"count":2},"note":"x"}"#;
        let mut titles: Vec<String> = extract_articles(raw).into_iter().map(|a| a.title).collect();
        titles.sort();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_object_without_articles() {
        assert!(matches!(
            parse_response(r#"{"status":"ok"}"#),
            ParseOutcome::Failed(ParseFailure::NoArticleList)
        ));
    }

    #[test]
    fn test_articles_field_takes_priority() {
        let raw = r#"{"results":[{"title":"R"}],"articles":[{"title":"A"}]}"#;
        let articles = extract_articles(raw);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "A");
    }

    #[test]
    fn test_defaults() {
        let articles = extract_articles(r#"{"articles":[{}]}"#);
        let article = &articles[0];

        assert_eq!(article.title, DEFAULT_TITLE);
        assert_eq!(article.summary, DEFAULT_SUMMARY);
        assert_eq!(article.relevance, DEFAULT_RELEVANCE);
        assert_eq!(article.category, DEFAULT_CATEGORY);
        assert_eq!(article.source, DEFAULT_SOURCE);
        assert_eq!(article.url, None);
        assert!(chrono::DateTime::parse_from_rfc3339(&article.published_date).is_ok());
    }

    #[test]
    fn test_all_fields_both_casings() {
        let raw = r#"{"articles":[
            {"Title":"T","Summary":"S","Relevance":"R","Category":"Tech","URL":"https://example.com/a","PublishedDate":"2024-05-01","Source":"Wire"},
            {"title":"t","summary":"s","relevance":"r","category":"Science","url":"https://example.com/b","publishedDate":"2024-05-02","source":"Desk"}
        ]}"#;
        let articles = extract_articles(raw);

        assert_eq!(articles[0].category, "Tech");
        assert_eq!(articles[0].url.as_deref(), Some("https://example.com/a"));
        assert_eq!(articles[0].published_date, "2024-05-01");
        assert_eq!(articles[0].source, "Wire");
        assert_eq!(articles[1].relevance, "r");
        assert_eq!(articles[1].url.as_deref(), Some("https://example.com/b"));
    }

    #[test]
    fn test_fields_are_sanitized() {
        let long_title = "T".repeat(300);
        let raw = serde_json::json!({
            "articles": [{
                "title": long_title,
                "summary": "Good <script>evil()</script>read\u{0000}",
                "relevance": 0.93
            }]
        })
        .to_string();
        let article = &extract_articles(&raw)[0];

        assert!(article.title.ends_with("..."));
        assert!(article.title.chars().count() <= MAX_TITLE_CHARS + 3);
        assert_eq!(article.summary, "Good read");
        assert_eq!(article.relevance, DEFAULT_RELEVANCE);
    }

    #[test]
    fn test_non_object_records_skipped() {
        let articles = extract_articles(r#"{"articles":["just a string",{"title":"Real"},42]}"#);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Real");
    }
}
