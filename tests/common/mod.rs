#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use dynfilter::{ApiError, ApiResponse, FilterConfig, FilterQuery, FilterRequest, RecordOperations};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;

pub mod product_entity;
pub mod provider_entity;

use product_entity::Product;

/// Route `tracing` output through the test harness; `RUST_LOG=dynfilter=debug`
/// shows skipped keys and rejections.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = dynfilter::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

/// A migrated database holding three providers (codes 007, 042, 100) and six
/// products.
pub async fn setup_seeded_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;
    seed(&db).await?;
    Ok(db)
}

pub async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    let providers = [
        (1, "Acme", "007", "DE"),
        (2, "Mono Supplies", "042", "FR"),
        (3, "Zeta", "100", "US"),
    ];
    for (id, name, code, country) in providers {
        provider_entity::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            code: Set(code.to_string()),
            country: Set(country.to_string()),
        }
        .insert(db)
        .await?;
    }

    let products = [
        ("Laptop", "Electronics", 1200.0, 3, Some(1)),
        ("Phone", "Electronics", 800.0, 10, Some(2)),
        ("Cable", "Electronics", 15.0, 100, Some(3)),
        ("Teddy", "Toys", 25.0, 2, Some(2)),
        ("Puzzle", "Toys", 9.5, 0, None),
        ("Monitor", "Electronics", 300.0, 7, Some(1)),
    ]
    .into_iter()
    .map(|(name, category, price, stock, provider_id)| product_entity::ActiveModel {
        name: Set(name.to_string()),
        category: Set(category.to_string()),
        price: Set(price),
        stock: Set(stock),
        provider_id: Set(provider_id),
        api_token: Set(Some(format!("token-{name}"))),
        ..Default::default()
    })
    .collect();

    Product::save_many(db, products)
        .await
        .map_err(|err| DbErr::Custom(err.to_string()))?;
    Ok(())
}

async fn list_products(
    State(db): State<DatabaseConnection>,
    Query(query): Query<FilterQuery>,
) -> Result<ApiResponse<Vec<product_entity::Model>>, ApiError> {
    let request = FilterRequest::try_from(query)?;
    let (rows, pagination) =
        Product::paginate_filtered(&db, &request, &FilterConfig::default()).await?;
    Ok(ApiResponse::paginated("Products retrieved", rows, pagination))
}

async fn search_products(
    State(db): State<DatabaseConnection>,
    Json(request): Json<FilterRequest>,
) -> Result<ApiResponse<Vec<product_entity::Model>>, ApiError> {
    let rows = Product::find_filtered(&db, &request, &FilterConfig::default()).await?;
    Ok(ApiResponse::success("Products retrieved", rows))
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let api = Router::new()
        .route("/products", get(list_products))
        .route("/products/search", post(search_products))
        .with_state(db);

    Router::new().nest("/api/v1", api)
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateCatalogTables)]
    }
}

pub struct CreateCatalogTables;

#[async_trait::async_trait]
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
                    .table(Providers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Providers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Providers::Name).string().not_null())
                    .col(ColumnDef::new(Providers::Code).string().not_null())
                    .col(ColumnDef::new(Providers::Country).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Category).string().not_null())
                    .col(ColumnDef::new(Products::Price).double().not_null())
                    .col(ColumnDef::new(Products::Stock).integer().not_null())
                    .col(ColumnDef::new(Products::ProviderId).integer().null())
                    .col(ColumnDef::new(Products::ApiToken).string().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProductTags::ProductId).integer().not_null())
                    .col(ColumnDef::new(ProductTags::TagId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ProductTags::ProductId)
                            .col(ProductTags::TagId),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            ProductTags::Table.into_iden(),
            Products::Table.into_iden(),
            Providers::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Providers {
    Table,
    Id,
    Name,
    Code,
    Country,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Category,
    Price,
    Stock,
    ProviderId,
    ApiToken,
}

#[derive(DeriveIden)]
enum ProductTags {
    Table,
    ProductId,
    TagId,
}
