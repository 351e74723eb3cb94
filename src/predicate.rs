//! # Predicate building
//!
//! [`build_plan`] turns a [`FilterSpec`] into a [`QueryPlan`]: an ordered list of
//! store-agnostic [`Predicate`]s plus the sort and paging directive. It never talks to
//! a store.
//!
//! Predicates are emitted in a fixed order so two identical requests always produce
//! identical plans:
//!
//! 1. resource scopes (see [`Scope`]), when the caller attached any;
//! 2. the free-text search OR-group;
//! 3. the `name` substring match;
//! 4. the date range;
//! 5. equality filters, in column name order.
//!
//! Column identifiers inside predicates are always the `&'static str` held by the
//! [`ColumnPolicy`], never the string the request supplied.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::params::{FilterSpec, SortDirection};
use crate::policy::{ColumnKind, ColumnPolicy, MatchCase};

/// Column that gets a substring match instead of equality when filterable.
pub const NAME_COLUMN: &str = "name";

/// A typed equality operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Uuid(Uuid),
}

impl FilterValue {
    /// Coerce a raw request value to `kind`.
    #[must_use]
    pub fn coerce(raw: &str, kind: ColumnKind) -> Option<Self> {
        match kind {
            ColumnKind::Text => Some(Self::Text(raw.to_string())),
            ColumnKind::Integer => raw.parse().ok().map(Self::Integer),
            ColumnKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Self::Boolean(true)),
                "false" | "0" => Some(Self::Boolean(false)),
                _ => None,
            },
            ColumnKind::Uuid => Uuid::parse_str(raw).ok().map(Self::Uuid),
        }
    }
}

impl From<FilterValue> for sea_orm::Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Text(text) => text.into(),
            FilterValue::Integer(number) => number.into(),
            FilterValue::Boolean(flag) => flag.into(),
            FilterValue::Uuid(id) => id.into(),
        }
    }
}

/// One filtering condition. Top-level predicates in a plan are AND-ed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Equals {
        column: &'static str,
        value: FilterValue,
    },
    Contains {
        column: &'static str,
        needle: String,
    },
    /// Inclusive on both ends.
    Between {
        column: &'static str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    AtLeast {
        column: &'static str,
        bound: NaiveDateTime,
    },
    AtMost {
        column: &'static str,
        bound: NaiveDateTime,
    },
    /// Satisfied when any member is.
    AnyOf(Vec<Predicate>),
}

/// A trusted restriction fixed by composition code, such as "only this
/// instructor's courses". Applied before every request predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    column: &'static str,
    value: FilterValue,
}

impl Scope {
    #[must_use]
    pub fn eq(column: &'static str, value: FilterValue) -> Self {
        Self { column, value }
    }

    #[must_use]
    pub fn owner(column: &'static str, owner_id: Uuid) -> Self {
        Self::eq(column, FilterValue::Uuid(owner_id))
    }

    fn into_predicate(self) -> Predicate {
        Predicate::Equals {
            column: self.column,
            value: self.value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortDirective {
    pub column: &'static str,
    pub direction: SortDirection,
    /// Secondary ascending order, present unless the sort column already is the id.
    pub tiebreaker: Option<&'static str>,
}

/// Everything a store needs to run one listing query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPlan {
    predicates: Vec<Predicate>,
    scopes: usize,
    sort: SortDirective,
    per_page: u64,
    page: u64,
    match_case: MatchCase,
}

impl QueryPlan {
    /// Prepend a scope so it is evaluated before the request predicates. Several
    /// scopes keep the order they were attached in.
    #[must_use]
    pub fn scoped(mut self, scope: Scope) -> Self {
        self.predicates.insert(self.scopes, scope.into_predicate());
        self.scopes += 1;
        self
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub const fn sort(&self) -> SortDirective {
        self.sort
    }

    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    /// Number of rows to skip before the requested page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    #[must_use]
    pub const fn match_case(&self) -> MatchCase {
        self.match_case
    }
}

/// Build the predicate set and the sort/paging directive for one request.
#[must_use]
pub fn build_plan(spec: &FilterSpec, policy: &ColumnPolicy) -> QueryPlan {
    let mut predicates = Vec::new();

    if let Some(search) = search_group(spec, policy) {
        predicates.push(search);
    }

    if let Some((column, _)) = policy.filter_column(NAME_COLUMN)
        && let Some(needle) = spec.column_filters.get(NAME_COLUMN)
    {
        predicates.push(Predicate::Contains {
            column,
            needle: needle.clone(),
        });
    }

    if let Some(range) = date_range(spec, policy) {
        predicates.push(range);
    }

    for (key, raw) in &spec.column_filters {
        if key == NAME_COLUMN {
            continue;
        }
        let Some((column, kind)) = policy.filter_column(key) else {
            tracing::debug!(column = %key, "ignoring filter on undeclared column");
            continue;
        };
        match FilterValue::coerce(raw, kind) {
            Some(value) => predicates.push(Predicate::Equals { column, value }),
            None => tracing::debug!(column, value = %raw, ?kind, "ignoring filter value of wrong type"),
        }
    }

    let column = policy.resolve_sort_column(&spec.sort_column);
    if column != spec.sort_column {
        tracing::debug!(requested = %spec.sort_column, column, "sort column not allowed");
    }
    let id = policy.primary_key();
    let sort = SortDirective {
        column,
        direction: spec.sort_direction,
        tiebreaker: (column != id).then_some(id),
    };

    QueryPlan {
        predicates,
        scopes: 0,
        sort,
        per_page: spec.per_page.max(1),
        page: spec.page.max(1),
        match_case: policy.case(),
    }
}

fn search_group(spec: &FilterSpec, policy: &ColumnPolicy) -> Option<Predicate> {
    let needle = spec.search_text.as_deref().filter(|text| !text.is_empty())?;
    let columns = policy.searchable_columns();
    if columns.is_empty() {
        return None;
    }
    Some(Predicate::AnyOf(
        columns
            .iter()
            .map(|&column| Predicate::Contains {
                column,
                needle: needle.to_string(),
            })
            .collect(),
    ))
}

fn date_range(spec: &FilterSpec, policy: &ColumnPolicy) -> Option<Predicate> {
    let column = policy.date_range_column()?;
    let start = spec.date_start.map(|bound| bound.as_lower());
    let end = spec.date_end.map(|bound| bound.as_upper());
    match (start, end) {
        (Some(start), Some(end)) => Some(Predicate::Between { column, start, end }),
        (Some(bound), None) => Some(Predicate::AtLeast { column, bound }),
        (None, Some(bound)) => Some(Predicate::AtMost { column, bound }),
        (None, None) => None,
    }
}
