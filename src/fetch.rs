use std::time::Duration;

use reqwest::Client;

use crate::errors::{AppError, AppResult};

// See: https://stackoverflow.com/a/7001617/5155484
const ACCEPT: &str = "application/rss+xml, application/rdf+xml, application/atom+xml, \
                      application/feed+json, application/xml;q=0.9, text/xml;q=0.8";
const USER_AGENT: &str = concat!("feedloop/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A syndication document reduced to what the reconciler needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    /// None when the source omits a date; the reconciler substitutes the
    /// fetch time.
    pub published_at: Option<i32>,
    pub description: Option<String>,
}

pub fn client() -> Client {
    Client::new()
}

/// One GET with a bounded timeout, parsed into a `ParsedFeed`. No internal
/// retries; retry policy belongs to the scheduler.
pub async fn fetch_feed(client: &Client, url: &str, timeout: Duration) -> AppResult<ParsedFeed> {
    let response = client
        .get(url)
        .timeout(timeout)
        .header("Accept", ACCEPT)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(AppError::Fetch(format!("{url} returned {}", response.status())));
    }
    let body = response.bytes().await?;
    parse_document(&body)
}

/// Parses a syndication document body. A document without a non-empty
/// channel title is rejected with `Validation`, distinct from `Parse`, so
/// feed creation can refuse it while re-fetches just log and move on.
pub fn parse_document(body: &[u8]) -> AppResult<ParsedFeed> {
    let parsed = feed_rs::parser::parse(body)?;

    let title = parsed
        .title
        .map(|t| t.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("feed document has no channel title".to_string()))?;
    let description = parsed.description.map(|d| d.content);

    let mut items = Vec::with_capacity(parsed.entries.len());
    for entry in parsed.entries {
        // Links are the de-duplication key; an entry without one cannot be
        // reconciled.
        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            log::debug!("skipping entry without a link");
            continue;
        };
        let title = entry
            .title
            .map(|t| t.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| link.clone());
        let published_at = entry
            .published
            .or(entry.updated)
            .map(|p| p.timestamp() as i32);
        let description = entry.summary.map(|s| s.content);
        items.push(ParsedItem {
            title,
            link,
            published_at,
            description,
        });
    }

    Ok(ParsedFeed {
        title,
        description,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{serve_http_once, serve_http_stall};

    const RSS_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <description>Posts about examples</description>
    <item>
      <title>First post</title>
      <link>http://example.com/1</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
      <description>hello</description>
    </item>
    <item>
      <title>Undated post</title>
      <link>http://example.com/2</link>
    </item>
  </channel>
</rss>"#;

    const ATOM_DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:uuid:1</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <title>Entry one</title>
    <id>urn:uuid:2</id>
    <link href="http://example.com/atom/1"/>
    <updated>2024-01-02T00:00:00Z</updated>
  </entry>
</feed>"#;

    const NO_TITLE_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <description>no title here</description>
    <item>
      <title>orphan</title>
      <link>http://example.com/1</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss() {
        let parsed = parse_document(RSS_DOC.as_bytes()).unwrap();
        assert_eq!(parsed.title, "Example Blog");
        assert_eq!(parsed.description.as_deref(), Some("Posts about examples"));
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].title, "First post");
        assert_eq!(parsed.items[0].link, "http://example.com/1");
        assert!(parsed.items[0].published_at.is_some());
        assert_eq!(parsed.items[0].description.as_deref(), Some("hello"));
    }

    #[test]
    fn test_missing_date_is_none() {
        let parsed = parse_document(RSS_DOC.as_bytes()).unwrap();
        assert_eq!(parsed.items[1].published_at, None);
    }

    #[test]
    fn test_parse_atom() {
        let parsed = parse_document(ATOM_DOC.as_bytes()).unwrap();
        assert_eq!(parsed.title, "Atom Example");
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].link, "http://example.com/atom/1");
    }

    #[test]
    fn test_missing_channel_title_is_validation_error() {
        let err = parse_document(NO_TITLE_DOC.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = parse_document(b"not xml at all").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_feed_from_local_server() {
        let url = serve_http_once("200 OK", RSS_DOC);
        let parsed = fetch_feed(&client(), &url, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(parsed.title, "Example Blog");
        assert_eq!(parsed.items.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_feed_non_success_status_is_fetch_error() {
        let url = serve_http_once("404 Not Found", "gone");
        let err = fetch_feed(&client(), &url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_feed_times_out() {
        let url = serve_http_stall(Duration::from_secs(10));
        let err = fetch_feed(&client(), &url, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_feed_unreachable_host_is_fetch_error() {
        // Nothing listens here; the connection is refused immediately.
        let err = fetch_feed(
            &client(),
            "http://127.0.0.1:1/feed",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }
}
