//! Configuration schemas, expressed as the typed config an extension deserializes into.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("does not match {schema}: {source}")]
    Mismatch {
        schema: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("violates {schema}: {reason}")]
    Rule { schema: &'static str, reason: String },
}

type Check = Arc<dyn Fn(&Value) -> Result<(), SchemaError> + Send + Sync>;

/// Validates a configuration value by deserializing it into `T`.
///
/// Typed configs should use `#[serde(deny_unknown_fields)]` so that stray keys are reported.
#[derive(Clone)]
pub struct Schema {
    name: &'static str,
    check: Check,
}

impl Schema {
    pub fn of<T: DeserializeOwned + 'static>() -> Self {
        Self::of_with::<T, _>(|_| Ok(()))
    }

    /// Like [`Schema::of`], with an extra rule over the parsed value.
    pub fn of_with<T, F>(rule: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<T>();
        Self {
            name,
            check: Arc::new(move |value: &Value| {
                let parsed = T::deserialize(value).map_err(|source| SchemaError::Mismatch {
                    schema: name,
                    source,
                })?;
                rule(&parsed).map_err(|reason| SchemaError::Rule {
                    schema: name,
                    reason,
                })
            }),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        (self.check)(value)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema").field(&self.name).finish()
    }
}
