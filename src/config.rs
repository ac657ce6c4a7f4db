//! Compiler configuration.
//!
//! [`FilterConfig`] is plain data: build it in code, deserialize it from an
//! application config file, or read it from `DYNFILTER_*` environment
//! variables with [`FilterConfig::from_env`].

use serde::{Deserialize, Serialize};

use crate::errors::FilterError;

/// Maximum accepted length of a single filter value.
pub const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// What happens to a key outside the allow-list.
///
/// Unknown operators and malformed keys are dropped under both policies; the
/// policy only governs allow-list misses, unknown custom filters, and
/// malformed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPolicy {
    /// Drop the offending key and keep compiling.
    Silent,
    /// Abort the whole pass with an error naming the key.
    #[default]
    Reject,
}

impl FilterPolicy {
    /// Route a rejection through the policy: `Err` under `Reject`, `Ok` under
    /// `Silent`.
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged when the policy is [`FilterPolicy::Reject`].
    pub fn enforce(self, err: FilterError) -> Result<(), FilterError> {
        match self {
            Self::Reject => Err(err),
            Self::Silent => {
                tracing::debug!(key = %err.key(), reason = %err, "Dropping filter key");
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub policy: FilterPolicy,
    pub max_value_length: usize,
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            policy: FilterPolicy::Reject,
            max_value_length: MAX_FIELD_VALUE_LENGTH,
            default_per_page: 15,
            max_per_page: 100,
        }
    }
}

impl FilterConfig {
    #[must_use]
    pub fn with_policy(mut self, policy: FilterPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Read `DYNFILTER_POLICY`, `DYNFILTER_MAX_VALUE_LENGTH`,
    /// `DYNFILTER_DEFAULT_PER_PAGE` and `DYNFILTER_MAX_PER_PAGE`. Unset
    /// variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a variable is set to a value that does not parse.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::with_prefix("DYNFILTER").try_parsing(true))
    }

    /// Build from any `config` source layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the source cannot be read or does not match
    /// the expected shape.
    pub fn load<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
