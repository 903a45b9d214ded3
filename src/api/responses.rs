//! Shared API response types and query helpers
//!
//! Paginated lists are answered as `{count, next, previous, results}` where
//! `next`/`previous` are absolute URLs of the neighbouring pages (or `null`).

use axum::http::Uri;
use serde::Serialize;

use crate::config::PaginationConfig;
use crate::models::{ListParams, PagedResult};

/// Decoded query string that keeps repeated keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .unwrap_or_default()
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                (decode(key), decode(value))
            })
            .collect();
        Self(pairs)
    }

    /// First value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated key
    pub fn all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Non-negative integer value; absent or malformed values are `None`
    pub fn number(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// `1`/`true` style flag
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("1") | Some("true") | Some("True"))
    }

    /// `page` and `limit`, falling back to the configured page size
    pub fn list_params(&self, config: &PaginationConfig) -> ListParams {
        ListParams::new(
            self.number("page").unwrap_or(1),
            self.number("limit").unwrap_or(config.page_size),
            config.max_page_size,
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn with_page(&self, page: Option<u32>) -> String {
        let mut parts: Vec<String> = self
            .0
            .iter()
            .filter(|(k, _)| k != "page")
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        if let Some(page) = page {
            parts.push(format!("page={}", page));
        }
        parts.join("&")
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Page envelope
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap a paged result, linking neighbours relative to the request URI
    pub fn new(result: PagedResult<T>, public_url: &str, uri: &Uri) -> Self {
        let query = QueryPairs::parse(uri.query());
        let link = |page: Option<u32>| {
            let query = query.with_page(page);
            if query.is_empty() {
                format!("{}{}", public_url, uri.path())
            } else {
                format!("{}{}?{}", public_url, uri.path(), query)
            }
        };

        let next = result.has_next().then(|| link(Some(result.page + 1)));
        // The first page is linked without a page parameter
        let previous = result.has_prev().then(|| {
            let prev = result.page - 1;
            link((prev > 1).then_some(prev))
        });

        Self {
            count: result.total,
            next,
            previous,
            results: result.items,
        }
    }
}
