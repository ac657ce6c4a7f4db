use std::sync::LazyLock;

use dynfilter::{
    AllowList, Comparison, CustomFilterRegistry, FilterMethods, RecordOperations, RelationLink,
    impl_filterable,
};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category: String,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    pub stock: i32,
    pub provider_id: Option<i32>,
    pub api_token: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub struct Product;

impl_filterable!(
    Product,
    "Product",
    AllowList::new()
        .with_filters(["name", "category", "price", "stock", "provider_id", "api_token"])
        .with_ordering(["name", "price", "stock"])
        .with_relation("provider", &super::provider_entity::allow_list())
);

static CUSTOM_FILTERS: LazyLock<CustomFilterRegistry> = LazyLock::new(|| {
    let mut registry = CustomFilterRegistry::new();
    registry.register("Product", || {
        FilterMethods::new("ProductFilters").method("stock", |ctx, value| {
            if value == "low" {
                ctx.add_comparison("stock", Comparison::Lt, "5");
            } else if value == "out" {
                ctx.add_comparison("stock", Comparison::Eq, "0");
            }
        })
    });
    registry
});

#[async_trait::async_trait]
impl RecordOperations for Product {
    type Entity = Entity;
    type ActiveModel = ActiveModel;

    fn relation_links() -> Vec<(&'static str, RelationLink)> {
        vec![(
            "provider",
            RelationLink::belongs_to("providers", "provider_id")
                .with_columns_of::<super::provider_entity::Entity>(),
        )]
    }

    fn custom_filters() -> Option<&'static CustomFilterRegistry> {
        Some(&*CUSTOM_FILTERS)
    }
}
