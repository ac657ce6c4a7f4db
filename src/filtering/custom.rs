//! Custom filters: per-entity predicates the operator table cannot express.
//!
//! Handlers are trusted code. They receive the raw request value, unvalidated,
//! and write whatever they like into the query context. Each entity maps to
//! at most one handler in a [`CustomFilterRegistry`] built at startup; a fresh
//! handler is constructed for every compile pass that carries custom filters.
//!
//! ```rust
//! use dynfilter::filtering::{CustomFilterRegistry, FilterMethods, QueryContext};
//! use dynfilter::Comparison;
//!
//! let mut registry = CustomFilterRegistry::new();
//! registry.register("Product", || {
//!     FilterMethods::new("ProductFilters").method("stock", |ctx, value| {
//!         if value == "low" {
//!             ctx.add_comparison("stock", Comparison::Lt, "5");
//!         }
//!     })
//! });
//!
//! assert!(registry.resolve("Product").is_some());
//! assert!(registry.resolve("Order").is_none());
//! ```

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::context::QueryContext;
use crate::config::FilterConfig;
use crate::errors::FilterError;

/// Outcome of asking a handler to run a named filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodCall {
    Applied,
    Missing,
}

/// An entity's custom filter handler.
pub trait CustomFilters {
    /// Reported when a method is missing, e.g. `ProductFilters`.
    fn handler_name(&self) -> &str;

    /// Run the filter named `method` with the caller's raw value.
    fn call(&mut self, method: &str, value: &Value, ctx: &mut dyn QueryContext) -> MethodCall;
}

type FilterMethod = Box<dyn Fn(&mut dyn QueryContext, &Value) + Send + Sync>;

/// A [`CustomFilters`] handler assembled from named closures.
pub struct FilterMethods {
    name: String,
    methods: HashMap<String, FilterMethod>,
}

impl FilterMethods {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut dyn QueryContext, &Value) + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }
}

impl CustomFilters for FilterMethods {
    fn handler_name(&self) -> &str {
        &self.name
    }

    fn call(&mut self, method: &str, value: &Value, ctx: &mut dyn QueryContext) -> MethodCall {
        match self.methods.get(method) {
            Some(run) => {
                run(ctx, value);
                MethodCall::Applied
            }
            None => MethodCall::Missing,
        }
    }
}

type HandlerFactory = Box<dyn Fn() -> Box<dyn CustomFilters> + Send + Sync>;

/// Entity name to custom filter handler constructor.
#[derive(Default)]
pub struct CustomFilterRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl CustomFilterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler constructor for `entity`, replacing any previous one.
    pub fn register<H, F>(&mut self, entity: impl Into<String>, factory: F) -> &mut Self
    where
        H: CustomFilters + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.factories.insert(
            entity.into(),
            Box::new(move || Box::new(factory()) as Box<dyn CustomFilters>),
        );
        self
    }

    /// A fresh handler for `entity`, or `None` when it has no custom filters.
    #[must_use]
    pub fn resolve(&self, entity: &str) -> Option<Box<dyn CustomFilters>> {
        self.factories.get(entity).map(|factory| factory())
    }
}

impl std::fmt::Debug for CustomFilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entities: Vec<&String> = self.factories.keys().collect();
        entities.sort();
        f.debug_struct("CustomFilterRegistry")
            .field("entities", &entities)
            .finish()
    }
}

/// Run the request's custom filters through the entity's handler.
///
/// No registry, or no handler for the entity, makes this a no-op.
///
/// # Errors
///
/// Under `FilterPolicy::Reject`, `FilterError::UnknownCustomFilter` for the
/// first key the handler does not define.
pub fn dispatch_custom(
    ctx: &mut dyn QueryContext,
    entity: &str,
    registry: Option<&CustomFilterRegistry>,
    filters: &BTreeMap<String, Value>,
    config: &FilterConfig,
) -> Result<(), FilterError> {
    if filters.is_empty() {
        return Ok(());
    }
    let Some(mut handler) = registry.and_then(|registry| registry.resolve(entity)) else {
        tracing::debug!(entity, count = filters.len(), "No custom filter handler, skipping");
        return Ok(());
    };

    for (method, value) in filters {
        if handler.call(method, value, ctx) == MethodCall::Missing {
            config.policy.enforce(FilterError::UnknownCustomFilter {
                method: method.clone(),
                handler: handler.handler_name().to_string(),
            })?;
        }
    }
    Ok(())
}
