#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use filtercrate::catalog::{category, course, instructor};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use uuid::Uuid;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Connected, but without any table.
pub async fn setup_empty_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    Database::connect("sqlite::memory:").await
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub async fn insert_instructor(db: &DatabaseConnection, name: &str) -> Result<Uuid, DbErr> {
    let now = at(2024, 1, 1, 0, 0);
    let model = instructor::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(model.id)
}

pub async fn insert_category(
    db: &DatabaseConnection,
    name: &str,
    description: Option<&str>,
) -> Result<i32, DbErr> {
    let now = at(2024, 1, 1, 0, 0);
    let model = category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model.id)
}

/// Course fixture; unset fields get neutral defaults.
#[derive(Clone, Debug)]
pub struct NewCourse {
    pub title: String,
    pub detail: String,
    pub status: &'static str,
    pub level: &'static str,
    pub category_id: i32,
    pub instructor_id: Uuid,
    pub updated_at: NaiveDateTime,
}

impl NewCourse {
    pub fn new(title: impl Into<String>, instructor_id: Uuid, category_id: i32) -> Self {
        Self {
            title: title.into(),
            detail: String::new(),
            status: "published",
            level: "beginner",
            category_id,
            instructor_id,
            updated_at: at(2024, 1, 1, 12, 0),
        }
    }

    pub fn detail(mut self, detail: &str) -> Self {
        self.detail = detail.to_string();
        self
    }

    pub fn status(mut self, status: &'static str) -> Self {
        self.status = status;
        self
    }

    pub fn level(mut self, level: &'static str) -> Self {
        self.level = level;
        self
    }

    pub fn updated_at(mut self, updated_at: NaiveDateTime) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub async fn insert(self, db: &DatabaseConnection) -> Result<i32, DbErr> {
        let model = course::ActiveModel {
            title: Set(self.title),
            detail: Set(self.detail),
            status: Set(self.status.to_string()),
            level: Set(self.level.to_string()),
            category_id: Set(self.category_id),
            instructor_id: Set(self.instructor_id),
            created_at: Set(self.updated_at),
            updated_at: Set(self.updated_at),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(model.id)
    }
}

/// One instructor and one category to hang courses on.
pub struct Fixture {
    pub db: DatabaseConnection,
    pub instructor: Uuid,
    pub category: i32,
}

pub async fn fixture() -> Fixture {
    let db = setup_test_db().await.unwrap();
    let instructor = insert_instructor(&db, "Ada Lovelace").await.unwrap();
    let category = insert_category(&db, "Programming", Some("Code and tooling"))
        .await
        .unwrap();
    Fixture {
        db,
        instructor,
        category,
    }
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateCatalogTables)]
    }
}

pub struct CreateCatalogTables;

impl MigrationName for CreateCatalogTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_catalog_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateCatalogTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Instructors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Instructors::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Instructors::Name).string().not_null())
                    .col(ColumnDef::new(Instructors::Email).string().not_null())
                    .col(ColumnDef::new(Instructors::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Instructors::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::Description).text().null())
                    .col(ColumnDef::new(Categories::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Categories::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Courses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Courses::Title).string().not_null())
                    .col(ColumnDef::new(Courses::Detail).text().not_null())
                    .col(ColumnDef::new(Courses::Status).string().not_null())
                    .col(ColumnDef::new(Courses::Level).string().not_null())
                    .col(ColumnDef::new(Courses::CategoryId).integer().not_null())
                    .col(ColumnDef::new(Courses::InstructorId).uuid().not_null())
                    .col(ColumnDef::new(Courses::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(Courses::UpdatedAt).date_time().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Courses::Table.into_iden(),
            Categories::Table.into_iden(),
            Instructors::Table.into_iden(),
        ] {
            manager.drop_table(Table::drop().table(table).to_owned()).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Instructors {
    Table,
    Id,
    Name,
    Email,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    Title,
    Detail,
    Status,
    Level,
    CategoryId,
    InstructorId,
    CreatedAt,
    UpdatedAt,
}
