use std::collections::HashMap;

use dynfilter::{
    AllowList, FilterCompiler, FilterConfig, FilterError, FilterPolicy, FilterRequest, Predicate,
    PredicateTree, RecordOperations, SortDirection, scope_filter,
};
use sea_orm::{ActiveValue::Set, EntityTrait};
use serde_json::json;

mod common;
use common::{product_entity, product_entity::Product, provider_entity, setup_seeded_db};

fn compile(request: &FilterRequest) -> Result<PredicateTree, FilterError> {
    scope_filter::<Product, _>(
        PredicateTree::new(),
        request,
        FilterConfig::default(),
        Product::custom_filters(),
    )
}

fn compile_silent(request: &FilterRequest) -> PredicateTree {
    scope_filter::<Product, _>(
        PredicateTree::new(),
        request,
        FilterConfig::default().with_policy(FilterPolicy::Silent),
        Product::custom_filters(),
    )
    .unwrap()
}

#[test]
fn test_disallowed_field_under_both_policies() {
    let request = FilterRequest::new().filter("discount:gt", "5");
    assert_eq!(
        compile(&request).unwrap_err(),
        FilterError::DisallowedField {
            field: "discount".into()
        }
    );
    assert!(compile_silent(&request).is_empty());
}

#[test]
fn test_sensitive_fields_cannot_be_allowed() {
    let allow_list = AllowList::new()
        .with_filters(["password", "api_token", "name"])
        .with_ordering(["password"]);
    assert_eq!(allow_list.allowed_filters().collect::<Vec<_>>(), ["name"]);
    assert_eq!(allow_list.allowed_ordering().count(), 0);

    for field in ["password", "api_token"] {
        let request = FilterRequest::new().filter(format!("{field}:eq"), "x");
        let err = FilterCompiler::new("User", &allow_list)
            .apply(PredicateTree::new(), &request)
            .unwrap_err();
        assert_eq!(err.key(), field);
    }
}

#[test]
fn test_set_membership_values() {
    let tree = compile(&FilterRequest::new().filter("name:in", "a, b,c")).unwrap();
    assert_eq!(
        tree.predicates(),
        &[Predicate::Set {
            field: "name".into(),
            values: vec!["a".into(), "b".into(), "c".into()],
            negated: false
        }]
    );

    let tree = compile(&FilterRequest::new().filter("name:nIn", "solo")).unwrap();
    assert_eq!(
        tree.predicates(),
        &[Predicate::Set {
            field: "name".into(),
            values: vec!["solo".into()],
            negated: true
        }]
    );
}

#[test]
fn test_range_bounds_and_malformed_ranges() {
    let tree = compile(&FilterRequest::new().filter("price:between", "10,50")).unwrap();
    assert_eq!(tree.to_string(), "price BETWEEN 10 AND 50");

    for malformed in ["10", "10,20,30", "10,", ""] {
        let request = FilterRequest::new().filter("price:nBetween", malformed);
        let err = compile(&request).unwrap_err();
        assert!(
            matches!(err, FilterError::MalformedValue { ref key, .. } if key == "price:nBetween"),
            "{malformed:?}"
        );
        assert!(compile_silent(&request).is_empty(), "{malformed:?}");
    }
}

#[test]
fn test_order_direction() {
    let tree = compile(&FilterRequest::new().order_by("-price")).unwrap();
    assert_eq!(tree.orders(), &[("price".to_string(), SortDirection::Desc)]);

    let tree = compile(&FilterRequest::new().order_by("price")).unwrap();
    assert_eq!(tree.orders(), &[("price".to_string(), SortDirection::Asc)]);

    let err = compile(&FilterRequest::new().order_by("-category")).unwrap_err();
    assert_eq!(
        err,
        FilterError::DisallowedOrderField {
            field: "category".into()
        }
    );
}

#[test]
fn test_relation_filter_wraps_pattern_in_exists() {
    let tree = compile(&FilterRequest::new().relation_filter("provider.name:like", "mo")).unwrap();
    assert_eq!(
        tree.predicates(),
        &[Predicate::Exists {
            relation: "provider".into(),
            predicates: vec![Predicate::Pattern {
                field: "name".into(),
                pattern: "%mo%".into(),
                negated: false
            }]
        }]
    );
    assert_eq!(tree.to_string(), "EXISTS(provider WHERE name LIKE '%mo%')");
}

#[test]
fn test_custom_filter_and_missing_handler() {
    let request = FilterRequest::new().custom_filter("stock", json!("low"));
    assert_eq!(compile(&request).unwrap().to_string(), "stock < 5");

    let without_handlers = scope_filter::<Product, _>(
        PredicateTree::new(),
        &request,
        FilterConfig::default(),
        None,
    )
    .unwrap();
    assert!(without_handlers.is_empty());
}

#[test]
fn test_compiling_twice_is_deterministic() {
    let request: FilterRequest = serde_json::from_value(json!({
        "filters": {"stock:lt": 50, "category:eq": "Toys", "name:nLike": "x", "provider_id:nNull": ""},
        "relationFilters": {"provider.country:in": ["FR", "DE"], "provider.name:eq": "Acme"},
        "customFilters": {"stock": "low"},
        "orderBy": "-price"
    }))
    .unwrap();

    let first = compile(&request).unwrap();
    let second = compile(&request).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn test_end_to_end_scenario() {
    let request: FilterRequest = serde_json::from_value(json!({
        "filters": {"category:eq": "Electronics", "price:gte": "500"}
    }))
    .unwrap();
    let allow_list = AllowList::new().with_filters(["category", "price"]);
    let tree = FilterCompiler::new("Product", &allow_list)
        .apply(PredicateTree::new(), &request)
        .unwrap();
    assert_eq!(tree.to_string(), "category = 'Electronics' AND price >= 500");
}

#[tokio::test]
async fn test_in_memory_evaluation_agrees_with_sqlite() {
    let db = setup_seeded_db().await.unwrap();
    for (name, price) in [("007", 1.0), ("1e3", 2.0), ("1.50", 3.0)] {
        Product::save_one(
            &db,
            product_entity::ActiveModel {
                name: Set(name.to_string()),
                category: Set("Parts".to_string()),
                price: Set(price),
                stock: Set(1),
                provider_id: Set(Some(3)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let config = FilterConfig::default();
    let providers: HashMap<i32, serde_json::Value> = provider_entity::Entity::find()
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|provider| (provider.id, serde_json::to_value(&provider).unwrap()))
        .collect();
    let rows: Vec<serde_json::Value> = Product::find_filtered(&db, &FilterRequest::new(), &config)
        .await
        .unwrap()
        .iter()
        .map(|product| {
            let mut row = serde_json::to_value(product).unwrap();
            if let Some(provider) = product.provider_id.and_then(|id| providers.get(&id)) {
                row["provider"] = provider.clone();
            }
            row
        })
        .collect();

    let requests = [
        FilterRequest::new().filter("category:eq", "Electronics").filter("price:gte", "500"),
        FilterRequest::new().filter("name:like", "ON"),
        FilterRequest::new().filter("price:nBetween", "10,1000"),
        FilterRequest::new().filter("provider_id:nNull", ""),
        FilterRequest::new().filter("provider_id:neq", "2"),
        FilterRequest::new().filter("stock:in", "0,2,3"),
        FilterRequest::new().custom_filter("stock", json!("out")),
        FilterRequest::new().filter("name:eq", "007"),
        FilterRequest::new().filter("name:in", "1e3,1.50"),
        FilterRequest::new().filter("name:between", "0,2"),
        FilterRequest::new().filter("name:gt", "1"),
        FilterRequest::new().filter("name:regexp", "^[LM]"),
        FilterRequest::new().filter("name:nRegexp", r"^\d"),
        FilterRequest::new().relation_filter("provider.code:in", "007,042"),
        FilterRequest::new().relation_filter("provider.code:eq", "100"),
        FilterRequest::new().relation_filter("provider.name:regexp", "^Mono"),
    ];
    for request in requests {
        let request = request.order_by("-price");
        let from_db: Vec<i64> = Product::find_filtered(&db, &request, &config)
            .await
            .unwrap()
            .into_iter()
            .map(|product| i64::from(product.id))
            .collect();
        let in_memory: Vec<i64> = compile(&request)
            .unwrap()
            .apply_to(rows.clone())
            .iter()
            .map(|row| row["id"].as_i64().unwrap())
            .collect();
        assert!(!from_db.is_empty(), "{request:?}");
        assert_eq!(in_memory, from_db, "{request:?}");
    }
}
