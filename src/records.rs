use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
    sea_query::{Alias, Expr, Query, SimpleExpr},
};

use crate::config::FilterConfig;
use crate::errors::{ApiError, FilterError};
use crate::filtering::{
    CustomFilterRegistry, FilterCompiler, Filterable, RelationLink, SeaOrmContext,
};
use crate::models::FilterRequest;
use crate::response::{PageRequest, Pagination};

/// Filtered reads and bulk writes for a Sea-ORM entity.
///
/// Implementors name their entity and active model, and optionally the
/// relation links and custom filters the compiler may use. Everything else
/// has a default.
#[async_trait]
pub trait RecordOperations: Filterable + Sized + Send + Sync
where
    <Self::Entity as EntityTrait>::Model: Sync + IntoActiveModel<Self::ActiveModel>,
{
    type Entity: EntityTrait + Sync;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + Sync;

    /// How each relation in the allow-list joins back to this entity.
    fn relation_links() -> Vec<(&'static str, RelationLink)> {
        Vec::new()
    }

    #[must_use]
    fn custom_filters() -> Option<&'static CustomFilterRegistry> {
        None
    }

    #[must_use]
    fn filter_context(backend: DatabaseBackend) -> SeaOrmContext {
        Self::relation_links().into_iter().fold(
            SeaOrmContext::for_entity::<Self::Entity>().with_backend(backend),
            |ctx, (name, link)| ctx.with_relation(name, link),
        )
    }

    /// Compile `request` into a context for this entity's table.
    ///
    /// # Errors
    ///
    /// Compiler rejections under `FilterPolicy::Reject`.
    fn compile(
        backend: DatabaseBackend,
        request: &FilterRequest,
        config: &FilterConfig,
    ) -> Result<SeaOrmContext, FilterError> {
        let mut compiler =
            FilterCompiler::new(Self::ENTITY_NAME, Self::allow_list()).with_config(*config);
        if let Some(registry) = Self::custom_filters() {
            compiler = compiler.with_custom_filters(registry);
        }
        compiler.apply(Self::filter_context(backend), request)
    }

    async fn find_filtered(
        db: &DatabaseConnection,
        request: &FilterRequest,
        config: &FilterConfig,
    ) -> Result<Vec<<Self::Entity as EntityTrait>::Model>, ApiError> {
        let ctx = Self::compile(db.get_database_backend(), request, config)?;
        Ok(ctx.apply_to(Self::Entity::find()).all(db).await?)
    }

    async fn paginate_filtered(
        db: &DatabaseConnection,
        request: &FilterRequest,
        config: &FilterConfig,
    ) -> Result<(Vec<<Self::Entity as EntityTrait>::Model>, Pagination), ApiError> {
        let page = PageRequest::from_request(request, config);
        let select = Self::compile(db.get_database_backend(), request, config)?
            .apply_to(Self::Entity::find());

        let total = PaginatorTrait::count(select.clone(), db).await?;
        let rows = select
            .offset(page.offset())
            .limit(page.limit())
            .all(db)
            .await?;
        tracing::debug!(
            entity = Self::ENTITY_NAME,
            total,
            page = page.page,
            per_page = page.per_page,
            "Paginated filtered query"
        );
        Ok((rows, page.pagination(total)))
    }

    async fn save_one(
        db: &DatabaseConnection,
        model: Self::ActiveModel,
    ) -> Result<<Self::Entity as EntityTrait>::Model, ApiError> {
        Ok(model.insert(db).await?)
    }

    /// Insert all models in one transaction. Returns the number inserted.
    async fn save_many(db: &DatabaseConnection, models: Vec<Self::ActiveModel>) -> Result<u64, ApiError> {
        if models.is_empty() {
            return Ok(0);
        }
        let txn = db.begin().await?;
        let inserted = Self::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;
        Ok(inserted)
    }

    /// Apply the set columns of `changes` to every row matching `request`.
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` when the request compiles to no predicate.
    async fn update_filtered(
        db: &DatabaseConnection,
        request: &FilterRequest,
        config: &FilterConfig,
        changes: Self::ActiveModel,
    ) -> Result<u64, ApiError> {
        let ctx = Self::compile(db.get_database_backend(), request, config)?;
        if ctx.is_empty() {
            return Err(unscoped_write("update", Self::ENTITY_NAME));
        }
        let result = Self::Entity::update_many()
            .set(changes)
            .filter(ctx.condition())
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Delete every row matching `request`.
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` when the request compiles to no predicate.
    async fn delete_filtered(
        db: &DatabaseConnection,
        request: &FilterRequest,
        config: &FilterConfig,
    ) -> Result<u64, ApiError> {
        let ctx = Self::compile(db.get_database_backend(), request, config)?;
        if ctx.is_empty() {
            return Err(unscoped_write("delete", Self::ENTITY_NAME));
        }
        let result = Self::Entity::delete_many()
            .filter(ctx.condition())
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

fn unscoped_write(action: &str, entity: &str) -> ApiError {
    tracing::warn!(action, entity, "Refusing unfiltered bulk write");
    ApiError::bad_request(format!(
        "Refusing to {action} every {entity} without a filter"
    ))
}

/// A many-to-many pivot table: `table(parent_column, related_column)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotLink {
    pub table: String,
    pub parent_column: String,
    pub related_column: String,
}

impl PivotLink {
    pub fn new(
        table: impl Into<String>,
        parent_column: impl Into<String>,
        related_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            parent_column: parent_column.into(),
            related_column: related_column.into(),
        }
    }
}

/// Replace the pivot rows of `parent` with one row per distinct id in
/// `related`, in one transaction. Returns the number of rows inserted.
///
/// # Errors
///
/// `ApiError::Database` when any statement fails; nothing is changed then.
pub async fn save_many_to_many(
    db: &DatabaseConnection,
    link: &PivotLink,
    parent: sea_orm::Value,
    related: Vec<sea_orm::Value>,
) -> Result<u64, ApiError> {
    let mut ids: Vec<sea_orm::Value> = Vec::with_capacity(related.len());
    for id in related {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let table = Alias::new(&link.table);
    let txn = db.begin().await?;
    let backend = txn.get_database_backend();

    let delete = Query::delete()
        .from_table(table.clone())
        .and_where(Expr::col(Alias::new(&link.parent_column)).eq(parent.clone()))
        .to_owned();
    let removed = txn.execute(backend.build(&delete)).await?.rows_affected();

    let mut inserted = 0;
    if !ids.is_empty() {
        let mut insert = Query::insert();
        insert.into_table(table).columns([
            Alias::new(&link.parent_column),
            Alias::new(&link.related_column),
        ]);
        for id in ids {
            insert
                .values([SimpleExpr::from(parent.clone()), SimpleExpr::from(id)])
                .map_err(|err| ApiError::internal("Failed to build pivot insert", Some(err.to_string())))?;
        }
        inserted = txn.execute(backend.build(&insert)).await?.rows_affected();
    }
    txn.commit().await?;

    tracing::debug!(table = %link.table, removed, inserted, "Replaced pivot rows");
    Ok(inserted)
}
