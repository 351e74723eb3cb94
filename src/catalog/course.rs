use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{FromQueryResult, QuerySelect, Select, entity::prelude::*};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::category::{self, CategorySummary};
use super::instructor::{self, InstructorSummary};
use crate::engine::ListResource;
use crate::errors::FilterError;
use crate::pagination::Page;
use crate::params::RequestParams;
use crate::policy::{ColumnKind, ColumnPolicy};
use crate::predicate::Scope;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub detail: String,
    pub status: String,
    pub level: String,
    pub category_id: i32,
    pub instructor_id: Uuid,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::instructor::Entity",
        from = "Column::InstructorId",
        to = "super::instructor::Column::Id"
    )]
    Instructor,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::instructor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instructor.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Column owning a course; [`filter_courses`] scopes on it.
pub const OWNER_COLUMN: &str = "instructor_id";

pub static COURSE_POLICY: LazyLock<ColumnPolicy> = LazyLock::new(|| {
    ColumnPolicy::new("title")
        .searchable(["title", "detail"])
        .filterable("status", ColumnKind::Text)
        .filterable("level", ColumnKind::Text)
        .filterable("category_id", ColumnKind::Integer)
        .filterable(OWNER_COLUMN, ColumnKind::Uuid)
});

/// The columns a course listing reads.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult)]
pub struct CourseRow {
    pub id: i32,
    pub title: String,
    pub detail: String,
    pub status: String,
    pub level: String,
    pub category_id: i32,
    pub instructor_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A course as listed to clients, with its instructor and category summaries.
///
/// A summary is `None` when the referenced row does not exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseListing {
    pub id: i32,
    pub title: String,
    pub detail: String,
    pub status: String,
    pub level: String,
    pub category_id: i32,
    pub instructor_id: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub instructor: Option<InstructorSummary>,
    pub category: Option<CategorySummary>,
}

impl CourseListing {
    fn attach(
        row: CourseRow,
        instructors: &HashMap<Uuid, InstructorSummary>,
        categories: &HashMap<i32, CategorySummary>,
    ) -> Self {
        Self {
            instructor: instructors.get(&row.instructor_id).cloned(),
            category: categories.get(&row.category_id).cloned(),
            id: row.id,
            title: row.title,
            detail: row.detail,
            status: row.status,
            level: row.level,
            category_id: row.category_id,
            instructor_id: row.instructor_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ListResource for CourseListing {
    type Entity = Entity;
    type Row = CourseRow;

    const RESOURCE_NAME: &'static str = "courses";

    fn policy() -> &'static ColumnPolicy {
        &COURSE_POLICY
    }

    fn projection() -> Select<Entity> {
        Entity::find().select_only().columns([
            Column::Id,
            Column::Title,
            Column::Detail,
            Column::Status,
            Column::Level,
            Column::CategoryId,
            Column::InstructorId,
            Column::CreatedAt,
            Column::UpdatedAt,
        ])
    }

    async fn prefetch<C>(conn: &C, rows: Vec<CourseRow>) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait + Send + Sync,
    {
        let instructor_ids: BTreeSet<Uuid> = rows.iter().map(|row| row.instructor_id).collect();
        let category_ids: BTreeSet<i32> = rows.iter().map(|row| row.category_id).collect();

        let instructors = instructor::summaries(conn, instructor_ids.into_iter().collect()).await?;
        let categories = category::summaries(conn, category_ids.into_iter().collect()).await?;

        Ok(rows
            .into_iter()
            .map(|row| Self::attach(row, &instructors, &categories))
            .collect())
    }
}

/// List courses, restricted to one instructor's courses when `owner_id` is given.
///
/// The owner restriction is applied before any request filter, so an
/// `instructor_id` parameter can only narrow the result further.
///
/// # Errors
///
/// See [`ListResource::list`].
pub async fn filter_courses<C>(
    conn: &C,
    params: &RequestParams,
    owner_id: Option<Uuid>,
    cancel: Option<&CancellationToken>,
) -> Result<Page<CourseListing>, FilterError>
where
    C: ConnectionTrait + Send + Sync,
{
    let scope = owner_id.map(|id| Scope::owner(OWNER_COLUMN, id));
    CourseListing::list(conn, params, scope, cancel).await
}
