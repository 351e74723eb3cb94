//! # Catalog resources
//!
//! The resources this crate ships listings for:
//!
//! | Resource | Searchable | Filterable | Default sort |
//! |---|---|---|---|
//! | courses | `title`, `detail` | `status`, `level`, `category_id`, `instructor_id` | `title` |
//! | categories | `name`, `description` | `name` (substring) | `name` |
//!
//! Course listings embed instructor and category summaries. Both resources use
//! `updated_at` for date-range filters.
//!
//! [`router`] mounts the list endpoints on an axum `Router`; every response carries a
//! `Content-Range` header next to the JSON page.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::get,
};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::engine::ListResource;
use crate::errors::FilterError;
use crate::pagination::Page;
use crate::params::RequestParams;

pub mod category;
pub mod course;
pub mod instructor;

pub use category::{CATEGORY_POLICY, CategoryListing, CategorySummary, filter_categories};
pub use course::{COURSE_POLICY, CourseListing, filter_courses};
pub use instructor::InstructorSummary;

type Listed<T> = Result<(HeaderMap, Json<Page<T>>), FilterError>;

fn respond<T: ListResource>(page: Page<T>) -> (HeaderMap, Json<Page<T>>) {
    (page.content_range(T::RESOURCE_NAME), Json(page))
}

pub async fn list_courses(
    State(db): State<DatabaseConnection>,
    Query(params): Query<RequestParams>,
) -> Listed<CourseListing> {
    Ok(respond(filter_courses(&db, &params, None, None).await?))
}

/// Courses of one instructor; `id` is applied as a scope, not as a filter.
pub async fn list_instructor_courses(
    State(db): State<DatabaseConnection>,
    Path(id): Path<Uuid>,
    Query(params): Query<RequestParams>,
) -> Listed<CourseListing> {
    Ok(respond(filter_courses(&db, &params, Some(id), None).await?))
}

pub async fn list_categories(
    State(db): State<DatabaseConnection>,
    Query(params): Query<RequestParams>,
) -> Listed<CategoryListing> {
    Ok(respond(filter_categories(&db, &params, None).await?))
}

pub fn router(db: DatabaseConnection) -> Router {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/instructors/{id}/courses", get(list_instructor_courses))
        .route("/categories", get(list_categories))
        .with_state(db)
}
