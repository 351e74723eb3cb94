//! Sea-ORM backed [`RecordStore`].
//!
//! A [`SqlStore`] wraps a base `Select<E>` (the resource's projection, with any
//! relation-independent shaping already applied) and a connection. Plans are
//! translated into a `Condition`, an `ORDER BY` with the id tie-breaker, and a
//! `Paginator` call that yields both the page and the filtered total.

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{
    Condition, ConnectionTrait, DatabaseBackend, DbErr, EntityName, EntityTrait, FromQueryResult,
    IdenStatic, Iterable, Order, PaginatorTrait, QueryFilter, QueryOrder, Select, Value,
    sea_query::{Alias, BinOper, ConditionExpression, Expr, Func, LikeExpr, SimpleExpr},
};

use super::RecordStore;
use crate::params::SortDirection;
use crate::policy::MatchCase;
use crate::predicate::{Predicate, QueryPlan};

/// Escape LIKE wildcards so a needle always matches literally.
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn order(direction: SortDirection) -> Order {
    match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    }
}

/// Resolve an allow-listed identifier to the entity's column.
///
/// A policy naming a column the entity does not have is a composition mistake; it
/// surfaces as a query failure rather than a panic.
fn column<E: EntityTrait>(name: &str) -> Result<E::Column, DbErr> {
    E::Column::iter()
        .find(|column| column.as_str() == name)
        .ok_or_else(|| {
            DbErr::Custom(format!(
                "column `{name}` does not exist on `{}`",
                E::default().table_name()
            ))
        })
}

fn target<E: EntityTrait>(name: &str) -> Result<Expr, DbErr> {
    Ok(Expr::col((E::default(), column::<E>(name)?)))
}

fn contains<E: EntityTrait>(
    name: &str,
    needle: &str,
    case: MatchCase,
    backend: DatabaseBackend,
) -> Result<SimpleExpr, DbErr> {
    let target = target::<E>(name)?;
    let pattern = format!("%{}%", escape_like_wildcards(needle));
    Ok(match (case, backend) {
        // Both sides go through the database's UPPER so they fold identically.
        (MatchCase::Insensitive, _) => Expr::expr(Func::upper(target)).binary(
            BinOper::Like,
            escaped(Func::upper(Expr::val(pattern)).into()),
        ),
        (MatchCase::Sensitive, DatabaseBackend::Postgres) => {
            target.like(LikeExpr::new(pattern).escape('\\'))
        }
        // MySQL compares with the column collation unless one side is binary.
        (MatchCase::Sensitive, DatabaseBackend::MySql) => {
            instr(target.cast_as(Alias::new("BINARY")), needle)
        }
        // SQLite's LIKE folds ASCII case, INSTR does not.
        (MatchCase::Sensitive, DatabaseBackend::Sqlite) => instr(target.into(), needle),
    })
}

/// `pattern ESCAPE '\'`, in the shape `LikeExpr` produces.
fn escaped(pattern: SimpleExpr) -> SimpleExpr {
    SimpleExpr::Binary(
        Box::new(pattern),
        BinOper::Escape,
        Box::new(SimpleExpr::Constant('\\'.into())),
    )
}

fn instr(haystack: SimpleExpr, needle: &str) -> SimpleExpr {
    Expr::expr(
        Func::cust(Alias::new("INSTR"))
            .arg(haystack)
            .arg(Expr::val(needle.to_string())),
    )
    .gt(0)
}

fn translate<E: EntityTrait>(
    predicate: &Predicate,
    case: MatchCase,
    backend: DatabaseBackend,
) -> Result<ConditionExpression, DbErr> {
    let expr = match predicate {
        Predicate::Equals { column, value } => {
            target::<E>(column)?.eq(Value::from(value.clone()))
        }
        Predicate::Contains { column, needle } => contains::<E>(column, needle, case, backend)?,
        Predicate::Between { column, start, end } => {
            target::<E>(column)?.between(Value::from(*start), Value::from(*end))
        }
        Predicate::AtLeast { column, bound } => target::<E>(column)?.gte(Value::from(*bound)),
        Predicate::AtMost { column, bound } => target::<E>(column)?.lte(Value::from(*bound)),
        Predicate::AnyOf(members) => {
            let mut group = Condition::any();
            for member in members {
                group = group.add(translate::<E>(member, case, backend)?);
            }
            return Ok(ConditionExpression::Condition(group));
        }
    };
    Ok(ConditionExpression::SimpleExpr(expr))
}

/// Record store over a Sea-ORM `Select<E>`, yielding `M` rows.
///
/// `M` is usually a projection struct deriving `FromQueryResult` whose fields match
/// the columns selected by the base query.
pub struct SqlStore<'c, E, M, C>
where
    E: EntityTrait,
{
    conn: &'c C,
    select: Select<E>,
    _model: PhantomData<fn() -> M>,
}

impl<'c, E, M, C> SqlStore<'c, E, M, C>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    pub fn new(conn: &'c C, select: Select<E>) -> Self {
        Self {
            conn,
            select,
            _model: PhantomData,
        }
    }

    /// The AND of every predicate in `plan`.
    ///
    /// # Errors
    ///
    /// Fails when a predicate names a column the entity does not have.
    pub fn condition(&self, plan: &QueryPlan) -> Result<Condition, DbErr> {
        let backend = self.conn.get_database_backend();
        let mut condition = Condition::all();
        for predicate in plan.predicates() {
            condition = condition.add(translate::<E>(predicate, plan.match_case(), backend)?);
        }
        Ok(condition)
    }

    /// The filtered and ordered query, before the page window is applied.
    ///
    /// # Errors
    ///
    /// Fails when the plan names a column the entity does not have.
    pub fn query(&self, plan: &QueryPlan) -> Result<Select<E>, DbErr> {
        let sort = plan.sort();
        let mut query = self
            .select
            .clone()
            .filter(self.condition(plan)?)
            .order_by(column::<E>(sort.column)?, order(sort.direction));
        if let Some(tiebreaker) = sort.tiebreaker {
            query = query.order_by(column::<E>(tiebreaker)?, Order::Asc);
        }
        Ok(query)
    }
}

#[async_trait]
impl<'c, E, M, C> RecordStore for SqlStore<'c, E, M, C>
where
    E: EntityTrait,
    M: FromQueryResult + Send + Sync + 'static,
    C: ConnectionTrait + Send + Sync,
{
    type Record = M;

    async fn paginate(&self, plan: &QueryPlan) -> Result<(Vec<M>, u64), DbErr> {
        let query = self.query(plan)?;
        let entity = E::default();
        tracing::debug!(
            table = entity.table_name(),
            predicates = plan.predicates().len(),
            sort = plan.sort().column,
            per_page = plan.per_page(),
            page = plan.page(),
            "running list query"
        );
        let paginator = query.into_model::<M>().paginate(self.conn, plan.per_page());
        let total = paginator.num_items().await?;
        let past_the_end = plan
            .page()
            .checked_sub(1)
            .and_then(|skipped| skipped.checked_mul(plan.per_page()))
            .is_none_or(|offset| offset >= total);
        if past_the_end {
            tracing::debug!(total, page = plan.page(), "page starts past the filtered set");
            return Ok((Vec::new(), total));
        }
        let items = paginator.fetch_page(plan.page() - 1).await?;
        Ok((items, total))
    }
}
