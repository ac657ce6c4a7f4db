use super::allow_list::{AllowList, Filterable};
use super::conditions::compile_filters;
use super::context::QueryContext;
use super::custom::{CustomFilterRegistry, dispatch_custom};
use super::relations::compile_relation_filters;
use super::sort::compile_order;
use crate::config::FilterConfig;
use crate::errors::FilterError;
use crate::models::FilterRequest;

/// Compiles [`FilterRequest`]s for one entity into a [`QueryContext`].
///
/// Steps always run in the same order: field filters, relation filters,
/// custom filters, ordering. Every predicate is ANDed.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'a> {
    entity: &'a str,
    allow_list: &'a AllowList,
    config: FilterConfig,
    custom: Option<&'a CustomFilterRegistry>,
}

impl<'a> FilterCompiler<'a> {
    /// A compiler with the default configuration (`FilterPolicy::Reject`) and
    /// no custom filters.
    #[must_use]
    pub fn new(entity: &'a str, allow_list: &'a AllowList) -> Self {
        Self {
            entity,
            allow_list,
            config: FilterConfig::default(),
            custom: None,
        }
    }

    #[must_use]
    pub fn for_entity<E: Filterable>() -> FilterCompiler<'static> {
        FilterCompiler::new(E::ENTITY_NAME, E::allow_list())
    }

    #[must_use]
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_custom_filters(mut self, registry: &'a CustomFilterRegistry) -> Self {
        self.custom = Some(registry);
        self
    }

    /// Compile `request` into `ctx` and hand the context back.
    ///
    /// On error the partially built context is dropped, never returned.
    ///
    /// # Errors
    ///
    /// Under `FilterPolicy::Reject`, the first rejection of any step.
    pub fn apply<Q: QueryContext>(&self, mut ctx: Q, request: &FilterRequest) -> Result<Q, FilterError> {
        let span = tracing::debug_span!("scope_filter", entity = %self.entity);
        let _guard = span.enter();

        compile_filters(&mut ctx, self.allow_list, &self.config, &request.filters)?;
        compile_relation_filters(&mut ctx, self.allow_list, &self.config, &request.relation_filters)?;
        dispatch_custom(
            &mut ctx,
            self.entity,
            self.custom,
            &request.custom_filters,
            &self.config,
        )?;
        compile_order(
            &mut ctx,
            self.allow_list,
            &self.config,
            request.order_by.as_deref(),
        )?;

        tracing::debug!(
            filters = request.filters.len(),
            relation_filters = request.relation_filters.len(),
            custom_filters = request.custom_filters.len(),
            "Filter request compiled"
        );
        Ok(ctx)
    }
}

/// Compile `request` against entity `E` in one call.
///
/// # Errors
///
/// See [`FilterCompiler::apply`].
pub fn scope_filter<E, Q>(
    ctx: Q,
    request: &FilterRequest,
    config: FilterConfig,
    custom: Option<&CustomFilterRegistry>,
) -> Result<Q, FilterError>
where
    E: Filterable,
    Q: QueryContext,
{
    let mut compiler = FilterCompiler::new(E::ENTITY_NAME, E::allow_list()).with_config(config);
    if let Some(registry) = custom {
        compiler = compiler.with_custom_filters(registry);
    }
    compiler.apply(ctx, request)
}
