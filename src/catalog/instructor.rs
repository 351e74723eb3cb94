use std::collections::HashMap;

use sea_orm::{FromQueryResult, QuerySelect, entity::prelude::*};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "instructors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
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

/// The instructor fields embedded in a course listing.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult, Serialize, ToSchema)]
pub struct InstructorSummary {
    pub id: Uuid,
    pub name: String,
}

/// Summaries for `ids`, keyed by id. Unknown ids are simply absent.
pub(crate) async fn summaries<C>(
    conn: &C,
    ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, InstructorSummary>, DbErr>
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
        .into_model::<InstructorSummary>()
        .all(conn)
        .await?;
    Ok(found.into_iter().map(|summary| (summary.id, summary)).collect())
}
