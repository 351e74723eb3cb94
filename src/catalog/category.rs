use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{FromQueryResult, QuerySelect, Select, entity::prelude::*};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::engine::ListResource;
use crate::errors::FilterError;
use crate::pagination::Page;
use crate::params::RequestParams;
use crate::policy::{ColumnKind, ColumnPolicy};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course::Entity")]
    Course,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// `name` is filterable, which makes it a substring match rather than equality.
pub static CATEGORY_POLICY: LazyLock<ColumnPolicy> = LazyLock::new(|| {
    ColumnPolicy::new("name")
        .searchable(["name", "description"])
        .filterable("name", ColumnKind::Text)
});

#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListing {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[async_trait]
impl ListResource for CategoryListing {
    type Entity = Entity;
    type Row = Self;

    const RESOURCE_NAME: &'static str = "categories";

    fn policy() -> &'static ColumnPolicy {
        &CATEGORY_POLICY
    }

    fn projection() -> Select<Entity> {
        Entity::find().select_only().columns([
            Column::Id,
            Column::Name,
            Column::Description,
            Column::CreatedAt,
            Column::UpdatedAt,
        ])
    }

    async fn prefetch<C>(_conn: &C, rows: Vec<Self>) -> Result<Vec<Self>, DbErr>
    where
        C: ConnectionTrait + Send + Sync,
    {
        Ok(rows)
    }
}

/// List categories.
///
/// # Errors
///
/// See [`ListResource::list`].
pub async fn filter_categories<C>(
    conn: &C,
    params: &RequestParams,
    cancel: Option<&CancellationToken>,
) -> Result<Page<CategoryListing>, FilterError>
where
    C: ConnectionTrait + Send + Sync,
{
    CategoryListing::list(conn, params, None, cancel).await
}

/// The category fields embedded in a course listing.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult, Serialize, ToSchema)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
}

pub(crate) async fn summaries<C>(
    conn: &C,
    ids: Vec<i32>,
) -> Result<HashMap<i32, CategorySummary>, DbErr>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let found = Entity::find()
        .select_only()
        .columns([Column::Id, Column::Name])
        .filter(Column::Id.is_in(ids))
        .into_model::<CategorySummary>()
        .all(conn)
        .await?;
    Ok(found.into_iter().map(|summary| (summary.id, summary)).collect())
}
