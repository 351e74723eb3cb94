//! # Pagination executor
//!
//! [`execute`] hands a [`QueryPlan`] to a [`RecordStore`] and shapes the answer
//! into a [`Page`]. The total always counts the filtered set before paging, so
//! `totalPages` stays correct whatever page was asked for.

use axum::http::HeaderMap;
use sea_orm::DbErr;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::errors::FilterError;
use crate::predicate::QueryPlan;
use crate::store::RecordStore;

/// Paging metadata returned next to the items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub per_page: u64,
}

impl Pagination {
    /// `total_pages` is never below 1, even for an empty result.
    #[must_use]
    pub fn new(total_items: u64, per_page: u64, current_page: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            current_page: current_page.max(1),
            total_pages: total_items.div_ceil(per_page).max(1),
            total_items,
            per_page,
        }
    }

    /// Rows skipped before the current page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.current_page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// One page of a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Transform every item, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }

    /// `Content-Range: <resource> <first>-<last>/<total>` for this page.
    ///
    /// Control characters in `resource_name` are dropped so the value is always a
    /// valid header.
    #[must_use]
    pub fn content_range(&self, resource_name: &str) -> HeaderMap {
        let total = self.pagination.total_items;
        let first = self.pagination.offset();
        let last = first
            .saturating_add(self.items.len() as u64)
            .saturating_sub(1)
            .max(first);
        let safe_name: String = resource_name.chars().filter(|c| !c.is_control()).collect();

        let mut headers = HeaderMap::new();
        if let Ok(value) = format!("{safe_name} {first}-{last}/{total}").parse() {
            headers.insert("Content-Range", value);
        } else if let Ok(value) = format!("items {first}-{last}/{total}").parse() {
            headers.insert("Content-Range", value);
        }
        headers
    }
}

/// Run `plan` against `store`.
///
/// When `cancel` fires before the store answers, the store future is dropped and
/// [`FilterError::Cancelled`] is returned.
///
/// # Errors
///
/// [`FilterError::QueryFailed`] when the store fails or cannot evaluate one of the
/// plan's predicates; [`FilterError::Cancelled`] on cancellation.
pub async fn execute<S>(
    store: &S,
    plan: &QueryPlan,
    cancel: Option<&CancellationToken>,
) -> Result<Page<S::Record>, FilterError>
where
    S: RecordStore + ?Sized,
{
    if let Some(predicate) = store.capabilities().first_unsupported(plan) {
        return Err(FilterError::query_failed(DbErr::Custom(format!(
            "store cannot evaluate predicate {predicate:?}"
        ))));
    }

    let outcome = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(FilterError::Cancelled),
                outcome = store.paginate(plan) => outcome,
            }
        }
        None => store.paginate(plan).await,
    };
    let (items, total) = outcome?;

    let pagination = Pagination::new(total, plan.per_page(), plan.page());
    tracing::debug!(
        items = items.len(),
        total,
        page = pagination.current_page,
        total_pages = pagination.total_pages,
        "list query finished"
    );
    Ok(Page { items, pagination })
}
