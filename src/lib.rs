//! # filtercrate
//!
//! Filtering, free-text search, sorting and pagination for list endpoints backed by
//! Sea-ORM. Every request parameter is checked against a per-resource
//! [`ColumnPolicy`]; malformed input falls back to defaults instead of failing, and
//! only a storage failure (or cancellation) becomes an error.
//!
//! ```rust,ignore
//! use filtercrate::{RequestParams, filter_query};
//!
//! async fn list_posts(
//!     State(db): State<DatabaseConnection>,
//!     Query(params): Query<RequestParams>,
//! ) -> Result<Json<Page<post::Model>>, FilterError> {
//!     Ok(Json(filter_query(&db, post::Entity::find(), &params, &POST_POLICY).await?))
//! }
//! ```

pub mod catalog;
pub mod engine;
pub mod errors;
pub mod pagination;
pub mod params;
pub mod policy;
pub mod predicate;
pub mod store;

pub use engine::{ListResource, Listing, filter_query};
pub use errors::FilterError;
pub use pagination::{Page, Pagination, execute};
pub use params::{FilterSpec, RequestParams, SortDirection};
pub use policy::{ColumnKind, ColumnPolicy, MatchCase};
pub use predicate::{FilterValue, Predicate, QueryPlan, Scope, build_plan};
pub use store::{Capabilities, RecordStore, SqlStore};
