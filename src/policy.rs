//! # Column Policy
//!
//! A [`ColumnPolicy`] is the per-resource allow-list. It declares which columns a
//! request may filter on, which columns take part in free-text search, which column
//! carries the "date" used by range filters, and which column a listing sorts by when
//! the request does not say.
//!
//! Policies are built once, usually in a `static`, and only read afterwards:
//!
//! ```rust,ignore
//! use std::sync::LazyLock;
//! use filtercrate::policy::{ColumnKind, ColumnPolicy};
//!
//! static POST_POLICY: LazyLock<ColumnPolicy> = LazyLock::new(|| {
//!     ColumnPolicy::new("title")
//!         .searchable(["title", "body"])
//!         .filterable("status", ColumnKind::Text)
//!         .filterable("author_id", ColumnKind::Uuid)
//!         .date_column("published_at")
//! });
//! ```
//!
//! Every identifier is a `&'static str`. Predicates and sort directives copy their
//! column names out of the policy, so a column name taken from a request can never
//! reach the store.

/// Column identifiers that are always sortable, whatever the policy declares.
const ALWAYS_SORTABLE: [&str; 2] = ["id", "created_at"];

pub const DEFAULT_DATE_COLUMN: &str = "updated_at";
pub const DEFAULT_ID_COLUMN: &str = "id";
pub const DEFAULT_PER_PAGE: u64 = 10;
pub const DEFAULT_MAX_PER_PAGE: u64 = 1000;

/// Logical type of a filterable column, used to coerce equality values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Boolean,
    Uuid,
}

/// How substring predicates treat letter case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchCase {
    /// Both sides are upper-cased before comparing.
    #[default]
    Insensitive,
    /// The needle must appear with the exact same case.
    Sensitive,
}

/// Immutable allow-list for one resource type.
#[derive(Clone, Debug)]
pub struct ColumnPolicy {
    filterable: Vec<(&'static str, ColumnKind)>,
    searchable: Vec<&'static str>,
    date_column: &'static str,
    date_range: bool,
    default_sort_column: &'static str,
    id_column: &'static str,
    match_case: MatchCase,
    default_per_page: u64,
    max_per_page: u64,
}

impl ColumnPolicy {
    /// Start a policy whose listings sort by `default_sort_column` when the request
    /// does not name a column.
    #[must_use]
    pub fn new(default_sort_column: &'static str) -> Self {
        Self {
            filterable: Vec::new(),
            searchable: Vec::new(),
            date_column: DEFAULT_DATE_COLUMN,
            date_range: true,
            default_sort_column,
            id_column: DEFAULT_ID_COLUMN,
            match_case: MatchCase::default(),
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: DEFAULT_MAX_PER_PAGE,
        }
    }

    /// Declare a column that requests may filter on.
    ///
    /// Declaring the same column twice keeps the latest kind.
    #[must_use]
    pub fn filterable(mut self, column: &'static str, kind: ColumnKind) -> Self {
        self.filterable.retain(|(name, _)| *name != column);
        self.filterable.push((column, kind));
        self
    }

    /// Declare the columns searched by the free-text `search` parameter.
    #[must_use]
    pub fn searchable(mut self, columns: impl IntoIterator<Item = &'static str>) -> Self {
        for column in columns {
            if !self.searchable.contains(&column) {
                self.searchable.push(column);
            }
        }
        self
    }

    /// Use `column` for date-range filtering (and keep range filtering enabled).
    #[must_use]
    pub fn date_column(mut self, column: &'static str) -> Self {
        self.date_column = column;
        self.date_range = true;
        self
    }

    /// Ignore `dateStart`/`dateEnd` for this resource.
    #[must_use]
    pub fn without_date_range(mut self) -> Self {
        self.date_range = false;
        self
    }

    /// Override the primary identifier used as the sort fallback and tie-breaker.
    #[must_use]
    pub fn id_column(mut self, column: &'static str) -> Self {
        self.id_column = column;
        self
    }

    #[must_use]
    pub fn match_case(mut self, match_case: MatchCase) -> Self {
        self.match_case = match_case;
        self
    }

    /// Page size bounds. A zero `default` or `max` is ignored.
    #[must_use]
    pub fn per_page(mut self, default: u64, max: u64) -> Self {
        if max > 0 {
            self.max_per_page = max;
        }
        if default > 0 {
            self.default_per_page = default.min(self.max_per_page);
        }
        self
    }

    #[must_use]
    pub fn is_filterable(&self, column: &str) -> bool {
        self.filterable.iter().any(|(name, _)| *name == column)
    }

    #[must_use]
    pub fn is_searchable(&self, column: &str) -> bool {
        self.searchable.iter().any(|name| *name == column)
    }

    /// Whether `column` may appear in an ordering clause.
    #[must_use]
    pub fn is_sortable(&self, column: &str) -> bool {
        self.sortable_columns().any(|name| name == column)
    }

    /// The sort allow-list: `id`, `created_at`, the default sort column, every
    /// filterable and every searchable column. The configured id column is included
    /// when it differs from `id`.
    pub fn sortable_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        let id = std::iter::once(self.id_column).filter(|c| !ALWAYS_SORTABLE.contains(c));
        ALWAYS_SORTABLE
            .into_iter()
            .chain(id)
            .chain(std::iter::once(self.default_sort_column))
            .chain(self.filterable.iter().map(|(name, _)| *name))
            .chain(self.searchable.iter().copied())
    }

    /// Map a requested sort column onto its allow-listed identifier, or the id
    /// column when the request names anything else.
    #[must_use]
    pub fn resolve_sort_column(&self, requested: &str) -> &'static str {
        self.sortable_columns()
            .find(|name| *name == requested)
            .unwrap_or(self.id_column)
    }

    /// Allow-listed identifier and kind for a filterable column.
    #[must_use]
    pub fn filter_column(&self, column: &str) -> Option<(&'static str, ColumnKind)> {
        self.filterable.iter().copied().find(|(name, _)| *name == column)
    }

    pub fn filterable_columns(&self) -> impl Iterator<Item = (&'static str, ColumnKind)> + '_ {
        self.filterable.iter().copied()
    }

    #[must_use]
    pub fn searchable_columns(&self) -> &[&'static str] {
        &self.searchable
    }

    /// The date column, when range filtering is enabled.
    #[must_use]
    pub fn date_range_column(&self) -> Option<&'static str> {
        self.date_range.then_some(self.date_column)
    }

    #[must_use]
    pub const fn default_sort_column(&self) -> &'static str {
        self.default_sort_column
    }

    #[must_use]
    pub const fn primary_key(&self) -> &'static str {
        self.id_column
    }

    #[must_use]
    pub const fn case(&self) -> MatchCase {
        self.match_case
    }

    #[must_use]
    pub const fn default_per_page(&self) -> u64 {
        self.default_per_page
    }

    #[must_use]
    pub const fn max_per_page(&self) -> u64 {
        self.max_per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_policy() -> ColumnPolicy {
        ColumnPolicy::new("title")
            .searchable(["title", "detail"])
            .filterable("status", ColumnKind::Text)
            .filterable("category_id", ColumnKind::Integer)
    }

    #[test]
    fn test_membership_queries() {
        let policy = course_policy();
        assert!(policy.is_filterable("status"));
        assert!(!policy.is_filterable("title"));
        assert!(policy.is_searchable("detail"));
        assert!(!policy.is_searchable("status"));
    }

    #[test]
    fn test_sort_allow_list_contains_fixed_columns() {
        let policy = course_policy();
        let sortable: Vec<_> = policy.sortable_columns().collect();
        for column in ["id", "created_at", "status", "category_id", "title", "detail"] {
            assert!(sortable.contains(&column), "{column} should be sortable");
        }
        assert!(!policy.is_sortable("password_hash"));
        assert!(!policy.is_sortable("updated_at"));
    }

    #[test]
    fn test_resolve_sort_column_falls_back_to_id() {
        let policy = course_policy();
        assert_eq!(policy.resolve_sort_column("title"), "title");
        assert_eq!(policy.resolve_sort_column("title; DROP TABLE courses"), "id");
        assert_eq!(policy.resolve_sort_column(""), "id");
    }

    #[test]
    fn test_custom_id_column_is_sortable_and_fallback() {
        let policy = ColumnPolicy::new("name").id_column("uuid");
        assert!(policy.is_sortable("uuid"));
        assert_eq!(policy.resolve_sort_column("nope"), "uuid");
    }

    #[test]
    fn test_default_sort_column_is_sortable_on_its_own() {
        let policy = ColumnPolicy::new("name").filterable("id", ColumnKind::Integer);
        assert!(policy.is_sortable("name"));
        assert_eq!(policy.resolve_sort_column("name"), "name");
        assert!(!policy.is_sortable("description"));
    }

    #[test]
    fn test_redeclaring_filterable_keeps_latest_kind() {
        let policy = ColumnPolicy::new("id")
            .filterable("flag", ColumnKind::Text)
            .filterable("flag", ColumnKind::Boolean);
        assert_eq!(policy.filterable_columns().count(), 1);
        assert_eq!(policy.filter_column("flag"), Some(("flag", ColumnKind::Boolean)));
    }

    #[test]
    fn test_date_range_defaults_and_toggle() {
        let policy = ColumnPolicy::new("id");
        assert_eq!(policy.date_range_column(), Some("updated_at"));

        let disabled = ColumnPolicy::new("id").without_date_range();
        assert_eq!(disabled.date_range_column(), None);

        let custom = disabled.date_column("published_at");
        assert_eq!(custom.date_range_column(), Some("published_at"));
    }

    #[test]
    fn test_per_page_bounds() {
        let policy = ColumnPolicy::new("id");
        assert_eq!(policy.default_per_page(), 10);
        assert_eq!(policy.max_per_page(), 1000);

        let tight = ColumnPolicy::new("id").per_page(50, 20);
        assert_eq!(tight.max_per_page(), 20);
        assert_eq!(tight.default_per_page(), 20);

        let untouched = ColumnPolicy::new("id").per_page(0, 0);
        assert_eq!(untouched.default_per_page(), 10);
    }

    #[test]
    fn test_policy_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<ColumnPolicy>();
    }
}
