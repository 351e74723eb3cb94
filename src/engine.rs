//! # Listing engine
//!
//! One stateless engine serves every resource. A [`Listing`] pairs a
//! [`ColumnPolicy`] with optional trusted scopes and a cancellation token, and runs
//! the whole pipeline for one request:
//!
//! ```text
//! RequestParams -> FilterSpec -> QueryPlan (+ scopes) -> RecordStore -> Page
//! ```
//!
//! [`filter_query`] is the shortcut for a plain Sea-ORM select, and
//! [`ListResource`] is how a resource declares its policy, projection and prefetch
//! once so handlers only call [`ListResource::list`].

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, FromQueryResult, Select};
use tokio_util::sync::CancellationToken;

use crate::errors::FilterError;
use crate::pagination::{Page, execute};
use crate::params::{FilterSpec, RequestParams};
use crate::policy::ColumnPolicy;
use crate::predicate::{QueryPlan, Scope, build_plan};
use crate::store::{RecordStore, SqlStore};

/// A configured listing for one request.
#[derive(Clone, Debug)]
pub struct Listing<'a> {
    policy: &'a ColumnPolicy,
    scopes: Vec<Scope>,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Listing<'a> {
    #[must_use]
    pub const fn new(policy: &'a ColumnPolicy) -> Self {
        Self {
            policy,
            scopes: Vec::new(),
            cancel: None,
        }
    }

    /// Restrict the listing before any request predicate applies. `None` is a no-op.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<Option<Scope>>) -> Self {
        if let Some(scope) = scope.into() {
            self.scopes.push(scope);
        }
        self
    }

    #[must_use]
    pub fn cancel_on(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn plan(&self, params: &RequestParams) -> QueryPlan {
        let spec = FilterSpec::extract(params, self.policy);
        let plan = self
            .scopes
            .iter()
            .cloned()
            .fold(build_plan(&spec, self.policy), QueryPlan::scoped);
        tracing::debug!(?plan, "built list plan");
        plan
    }

    /// # Errors
    ///
    /// See [`execute`].
    pub async fn fetch<S>(
        &self,
        store: &S,
        params: &RequestParams,
    ) -> Result<Page<S::Record>, FilterError>
    where
        S: RecordStore + ?Sized,
    {
        execute(store, &self.plan(params), self.cancel).await
    }

    /// Await follow-up `work` for this listing unless the attached token fires first.
    ///
    /// # Errors
    ///
    /// [`FilterError::Cancelled`] when the token wins, otherwise the error of `work`.
    pub async fn until_cancelled<T>(
        &self,
        work: impl Future<Output = Result<T, DbErr>>,
    ) -> Result<T, FilterError> {
        match self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(FilterError::Cancelled),
                    outcome = work => Ok(outcome?),
                }
            }
            None => Ok(work.await?),
        }
    }

    /// Whether the attached token has already fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }
}

/// Filter, sort and paginate `select` according to `params` and `policy`.
///
/// # Errors
///
/// Returns [`FilterError::QueryFailed`] when the database fails.
pub async fn filter_query<E, M, C>(
    conn: &C,
    select: Select<E>,
    params: &RequestParams,
    policy: &ColumnPolicy,
) -> Result<Page<M>, FilterError>
where
    E: EntityTrait,
    M: FromQueryResult + Send + Sync + 'static,
    C: ConnectionTrait + Send + Sync,
{
    let store = SqlStore::<E, M, C>::new(conn, select);
    Listing::new(policy).fetch(&store, params).await
}

/// A resource that can be listed through the engine.
///
/// `Row` is what the projection selects; `Self` is what clients receive once the
/// related summaries have been attached by [`ListResource::prefetch`].
#[async_trait]
pub trait ListResource: Sized + Send + Sync {
    type Entity: EntityTrait;
    type Row: FromQueryResult + Send + Sync + 'static;

    const RESOURCE_NAME: &'static str;

    fn policy() -> &'static ColumnPolicy;

    /// The base select, restricted to the columns `Row` reads.
    fn projection() -> Select<Self::Entity>;

    /// Attach related summaries to one page of rows, in one query per relation.
    async fn prefetch<C>(conn: &C, rows: Vec<Self::Row>) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait + Send + Sync;

    /// # Errors
    ///
    /// [`FilterError::QueryFailed`] when the list query or a prefetch query fails,
    /// [`FilterError::Cancelled`] when `cancel` fires before both have finished.
    async fn list<C>(
        conn: &C,
        params: &RequestParams,
        scope: Option<Scope>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Page<Self>, FilterError>
    where
        C: ConnectionTrait + Send + Sync,
    {
        let listing = Listing::new(Self::policy()).scope(scope).cancel_on(cancel);
        let store = SqlStore::<Self::Entity, Self::Row, C>::new(conn, Self::projection());
        let Page { items, pagination } = listing.fetch(&store, params).await?;
        let items = listing.until_cancelled(Self::prefetch(conn, items)).await?;
        Ok(Page { items, pagination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ColumnKind;
    use crate::predicate::{FilterValue, Predicate};
    use uuid::Uuid;

    fn policy() -> ColumnPolicy {
        ColumnPolicy::new("title")
            .searchable(["title"])
            .filterable("status", ColumnKind::Text)
            .filterable("owner_id", ColumnKind::Uuid)
    }

    #[test]
    fn test_scope_precedes_request_predicates() {
        let policy = policy();
        let owner = Uuid::new_v4();
        let params: RequestParams = [("status", "draft"), ("owner_id", &*Uuid::new_v4().to_string())]
            .into_iter()
            .collect();

        let plan = Listing::new(&policy)
            .scope(Scope::owner("owner_id", owner))
            .plan(&params);

        assert_eq!(
            plan.predicates()[0],
            Predicate::Equals {
                column: "owner_id",
                value: FilterValue::Uuid(owner),
            }
        );
        assert_eq!(plan.predicates().len(), 3);
    }

    #[test]
    fn test_none_scope_is_ignored() {
        let policy = policy();
        let plan = Listing::new(&policy).scope(None).plan(&RequestParams::new());
        assert!(plan.predicates().is_empty());
        assert_eq!(plan.sort().column, "title");
    }

    #[test]
    fn test_cancel_state() {
        let policy = policy();
        let token = CancellationToken::new();
        let listing = Listing::new(&policy).cancel_on(Some(&token));
        assert!(!listing.is_cancelled());
        token.cancel();
        assert!(listing.is_cancelled());
        assert!(!Listing::new(&policy).is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_follow_up_work() {
        let policy = policy();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });
        let listing = Listing::new(&policy).cancel_on(Some(&token));
        let err = listing
            .until_cancelled(std::future::pending::<Result<(), DbErr>>())
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Cancelled));
    }

    #[tokio::test]
    async fn test_follow_up_work_without_cancellation() {
        let policy = policy();
        let token = CancellationToken::new();
        let listing = Listing::new(&policy).cancel_on(Some(&token));
        assert_eq!(listing.until_cancelled(async { Ok::<_, DbErr>(7) }).await.unwrap(), 7);

        let err = Listing::new(&policy)
            .until_cancelled(async { Err::<(), _>(DbErr::Custom("prefetch failed".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::QueryFailed { .. }));
    }
}
