//! Pagination state machine
//!
//! Holds the configured paging strategy and the mutable state of one
//! enumeration. After every response [`Pagination::update_next_page`] decides
//! whether more data remains and what the next request looks like.
//!
//! Supported strategies:
//! - `Single`: exactly one page
//! - `NextPage`: the response carries the next URL at a dot-separated path
//! - `Offset`: skip/limit query parameters
//! - `Page`: a page-number query parameter
//!
//! When a counting key (the extraction key) is set, an empty extracted batch
//! ends paging whatever the strategy. Otherwise the strategy's own cursor
//! decides; for `NextPage` that is the presence of the next URL.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde_json::Value;
use url::Url;

/// Paging strategy with its strategy-specific keys
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaginationStrategy {
    #[default]
    Single,
    NextPage {
        key_path: Vec<String>,
    },
    Offset {
        skip_key: String,
        limit_key: Option<String>,
        /// Records per page, when known
        limit: Option<u64>,
        /// End on a batch smaller than `limit`
        stop_on_short_batch: bool,
    },
    Page {
        page_key: String,
        first_page: u64,
    },
}

/// Strategy-specific position of the next request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    None,
    Offset(u64),
    Page(u64),
    Url(String),
}

/// Look up a dot-separated path inside a JSON value.
///
/// Numeric segments index into arrays.
pub fn value_at_path<'a, S: AsRef<str>>(value: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| {
        let segment = segment.as_ref();
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Split a dot-separated key into path segments.
pub fn split_path(key: &str) -> Vec<String> {
    key.split('.').map(str::to_string).collect()
}

/// Pagination configuration plus per-enumeration state
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    strategy: PaginationStrategy,
    base_url: String,

    is_paging_started: bool,
    has_more_data: bool,
    is_last_batch_empty: bool,
    cursor: Option<Cursor>,
    counting_key: Option<Vec<String>>,
    pages_fetched: u64,
    records_counted: u64,
}

impl Pagination {
    /// Configured but not yet started.
    pub fn new(strategy: PaginationStrategy, url: impl Into<String>) -> Self {
        let mut pagination = Self::default();
        pagination.configure_paging(strategy, url);
        pagination
    }

    /// Store the strategy and base URL.
    pub fn configure_paging(&mut self, strategy: PaginationStrategy, url: impl Into<String>) {
        self.strategy = strategy;
        self.base_url = url.into();
        self.cursor = None;
    }

    /// Prepare a fresh enumeration.
    pub fn reset_paging(&mut self, counting_key: Option<&str>, url: &str) {
        self.base_url = url.to_string();
        self.counting_key = counting_key
            .filter(|k| !k.is_empty())
            .map(split_path);
        self.is_paging_started = true;
        self.has_more_data = true;
        self.is_last_batch_empty = false;
        self.pages_fetched = 0;
        self.records_counted = 0;
        self.cursor = Some(self.start_cursor());
    }

    fn start_cursor(&self) -> Cursor {
        match &self.strategy {
            PaginationStrategy::Single => Cursor::None,
            PaginationStrategy::NextPage { .. } => Cursor::Url(self.base_url.clone()),
            PaginationStrategy::Offset { .. } => Cursor::Offset(0),
            PaginationStrategy::Page { first_page, .. } => Cursor::Page(*first_page),
        }
    }

    pub fn strategy(&self) -> &PaginationStrategy {
        &self.strategy
    }

    pub fn is_paging_started(&self) -> bool {
        self.is_paging_started
    }

    pub fn is_last_batch_empty(&self) -> bool {
        self.is_last_batch_empty
    }

    /// Force the enumeration to stop after the current request.
    pub fn set_last_batch_empty(&mut self) {
        self.is_last_batch_empty = true;
    }

    /// Current cursor; the start cursor when paging has not begun.
    pub fn cursor(&self) -> Cursor {
        self.cursor.clone().unwrap_or_else(|| self.start_cursor())
    }

    /// Responses processed since the last reset.
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Records counted since the last reset.
    pub fn records_counted(&self) -> u64 {
        self.records_counted
    }

    pub fn has_next_page(&self) -> bool {
        self.has_more_data && !self.is_last_batch_empty
    }

    /// Extra query parameters for the next request.
    pub fn get_params(&self) -> BTreeMap<String, Value> {
        let mut params = BTreeMap::new();
        match (&self.strategy, self.cursor()) {
            (
                PaginationStrategy::Offset {
                    skip_key,
                    limit_key,
                    limit,
                    ..
                },
                Cursor::Offset(offset),
            ) => {
                params.insert(skip_key.clone(), Value::from(offset));
                if let (Some(key), Some(limit)) = (limit_key, limit) {
                    params.insert(key.clone(), Value::from(*limit));
                }
            }
            (PaginationStrategy::Page { page_key, .. }, Cursor::Page(page)) => {
                params.insert(page_key.clone(), Value::from(page));
            }
            _ => {}
        }
        params
    }

    /// URL of the next request.
    pub fn get_next_page_url(&self) -> String {
        match self.cursor() {
            Cursor::Url(url) => url,
            _ => self.base_url.clone(),
        }
    }

    /// Records in one response, when they can be counted.
    fn batch_size(&self, response: &Value) -> Option<usize> {
        if let Value::Array(items) = response {
            return Some(items.len());
        }
        let key = self.counting_key.as_ref()?;
        Some(
            value_at_path(response, key.as_slice())
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        )
    }

    /// Advance the cursor from the latest response.
    pub fn update_next_page(&mut self, response: &Value) {
        self.pages_fetched += 1;

        let batch = self.batch_size(response);
        if let Some(size) = batch {
            self.records_counted += size as u64;
            if size == 0 {
                debug!("Empty batch after {} page(s)", self.pages_fetched);
                self.is_last_batch_empty = true;
            }
        }

        let cursor = self.cursor();
        match &self.strategy {
            PaginationStrategy::Single => {
                self.has_more_data = false;
            }
            PaginationStrategy::NextPage { key_path } => {
                let next = value_at_path(response, key_path.as_slice()).and_then(|value| match value {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });
                match next {
                    Some(next) => {
                        let current = match &cursor {
                            Cursor::Url(url) => url.as_str(),
                            _ => self.base_url.as_str(),
                        };
                        self.cursor = Some(Cursor::Url(resolve_next_url(current, &next)));
                    }
                    None => {
                        debug!("No next page at '{}'", key_path.join("."));
                        self.has_more_data = false;
                    }
                }
            }
            PaginationStrategy::Offset {
                limit,
                stop_on_short_batch,
                ..
            } => {
                let offset = match cursor {
                    Cursor::Offset(offset) => offset,
                    _ => 0,
                };
                match batch {
                    Some(size) => {
                        let step = limit.unwrap_or(size as u64);
                        self.cursor = Some(Cursor::Offset(offset + step));
                        if *stop_on_short_batch && limit.is_some_and(|l| (size as u64) < l) {
                            debug!("Short batch of {} record(s), paging complete", size);
                            self.has_more_data = false;
                        }
                    }
                    None => {
                        warn!("Cannot count records in response, offset paging stops");
                        self.has_more_data = false;
                    }
                }
            }
            PaginationStrategy::Page { first_page, .. } => {
                let page = match cursor {
                    Cursor::Page(page) => page,
                    _ => *first_page,
                };
                if batch.is_some() {
                    self.cursor = Some(Cursor::Page(page + 1));
                } else {
                    warn!("Cannot count records in response, page paging stops");
                    self.has_more_data = false;
                }
            }
        }
    }
}

/// Resolve a next-page value against the URL that produced it.
///
/// Absolute URLs are used as is; paths and `?query` fragments are joined.
fn resolve_next_url(current: &str, next: &str) -> String {
    if Url::parse(next).is_ok() {
        return next.to_string();
    }
    match Url::parse(current).and_then(|base| base.join(next)) {
        Ok(joined) => joined.to_string(),
        Err(_) => next.to_string(),
    }
}
