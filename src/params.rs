//! # Request parameter extraction
//!
//! [`RequestParams`] is the raw query-string map a controller hands over, and
//! [`FilterSpec::extract`] normalizes it. Extraction never fails: anything malformed
//! is replaced by its default and reported through a `debug` tracing event.
//!
//! ## Recognized parameters
//!
//! | Parameter | Meaning | Default |
//! |---|---|---|
//! | `sortBy` | column to order by | the policy's default sort column |
//! | `sortOrder` | `asc` or `desc` | `asc` |
//! | `perPage` | page size, clamped to the policy maximum | policy default (10) |
//! | `page` | 1-based page number | 1 |
//! | `search` | free-text search | none |
//! | `dateStart` / `startDate` | lower date bound | none |
//! | `dateEnd` / `endDate` | upper date bound | none |
//!
//! Every other key is kept as a column filter and checked against the policy later,
//! when predicates are built.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use serde_with::{NoneAsEmptyString, serde_as};

use crate::policy::ColumnPolicy;

pub const SORT_BY: &str = "sortBy";
pub const SORT_ORDER: &str = "sortOrder";
pub const PER_PAGE: &str = "perPage";
pub const PAGE: &str = "page";
pub const SEARCH: &str = "search";

/// Accepted names for each date bound, in priority order.
pub const DATE_START_KEYS: [&str; 2] = ["dateStart", "startDate"];
pub const DATE_END_KEYS: [&str; 2] = ["dateEnd", "endDate"];

const RESERVED: [&str; 9] = [
    SORT_BY,
    SORT_ORDER,
    PER_PAGE,
    PAGE,
    SEARCH,
    DATE_START_KEYS[0],
    DATE_START_KEYS[1],
    DATE_END_KEYS[0],
    DATE_END_KEYS[1],
];

const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(time) => time,
    None => NaiveTime::MIN,
};

/// Raw request parameters. Empty values deserialize as absent.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(
    #[serde_as(as = "HashMap<_, NoneAsEmptyString>")] HashMap<String, Option<String>>,
);

impl RequestParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trimmed value for `key`, or `None` when absent or blank.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Option::as_deref)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), Some(value.into()));
    }

    /// Present, non-blank parameters with trimmed values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.keys().filter_map(|key| Some((key.as_str(), self.get(key)?)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    fn first_of(&self, keys: &[&str]) -> Option<(&'static str, &str)> {
        keys.iter().find_map(|key| {
            let value = self.get(key)?;
            let name = RESERVED.iter().copied().find(|reserved| reserved == key)?;
            Some((name, value))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

impl From<HashMap<String, String>> for RequestParams {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `asc`/`desc` in any letter case; anything else is `Asc`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            if !raw.eq_ignore_ascii_case("asc") {
                tracing::debug!(param = SORT_ORDER, value = raw, "ignoring unknown sort order");
            }
            Self::Asc
        }
    }
}

/// A date bound as written in the request: a calendar day with an optional time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateBound {
    date: NaiveDate,
    time: Option<NaiveTime>,
}

impl DateBound {
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]` and RFC 3339
    /// timestamps with an offset (converted to UTC).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::from_datetime(stamp.naive_utc()));
        }
        for format in [
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%dT%H:%M",
        ] {
            if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Self::from_datetime(stamp));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(|date| Self { date, time: None })
    }

    fn from_datetime(stamp: NaiveDateTime) -> Self {
        Self {
            date: stamp.date(),
            time: Some(stamp.time()),
        }
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub const fn has_time(&self) -> bool {
        self.time.is_some()
    }

    /// The bound used as a lower limit: midnight when no time was given.
    #[must_use]
    pub fn as_lower(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }

    /// The bound used as an upper limit: `23:59:59` when no time was given, so the
    /// whole day is included.
    #[must_use]
    pub fn as_upper(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(END_OF_DAY))
    }
}

/// Normalized filtering, sorting and paging intent of one request.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterSpec {
    /// Requested sort column. Not yet validated against the allow-list.
    pub sort_column: String,
    pub sort_direction: SortDirection,
    pub per_page: u64,
    pub page: u64,
    pub search_text: Option<String>,
    pub date_start: Option<DateBound>,
    pub date_end: Option<DateBound>,
    /// Every non-reserved parameter, keyed by column name.
    pub column_filters: BTreeMap<String, String>,
}

impl FilterSpec {
    /// Normalize raw parameters using `policy` for defaults.
    #[must_use]
    pub fn extract(params: &RequestParams, policy: &ColumnPolicy) -> Self {
        let sort_column = params
            .get(SORT_BY)
            .unwrap_or(policy.default_sort_column())
            .to_string();

        let sort_direction = params
            .get(SORT_ORDER)
            .map(SortDirection::parse)
            .unwrap_or_default();

        let per_page = positive(params.get(PER_PAGE), PER_PAGE)
            .map_or(policy.default_per_page(), |size| size.min(policy.max_per_page()));
        let page = positive(params.get(PAGE), PAGE).unwrap_or(1);

        let column_filters = params
            .iter()
            .filter(|(key, _)| !RESERVED.contains(key))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Self {
            sort_column,
            sort_direction,
            per_page,
            page,
            search_text: params.get(SEARCH).map(str::to_string),
            date_start: date_bound(params, &DATE_START_KEYS),
            date_end: date_bound(params, &DATE_END_KEYS),
            column_filters,
        }
    }
}

fn positive(raw: Option<&str>, param: &'static str) -> Option<u64> {
    let raw = raw?;
    let parsed = raw
        .parse::<i64>()
        .ok()
        .filter(|value| *value > 0)
        .and_then(|value| u64::try_from(value).ok());
    if parsed.is_none() {
        tracing::debug!(param, value = raw, "ignoring malformed paging value");
    }
    parsed
}

/// The first present key wins, even when its value turns out to be malformed.
fn date_bound(params: &RequestParams, keys: &[&str]) -> Option<DateBound> {
    let (param, raw) = params.first_of(keys)?;
    let bound = DateBound::parse(raw);
    if bound.is_none() {
        tracing::debug!(param, value = raw, "ignoring malformed date bound");
    }
    bound
}
