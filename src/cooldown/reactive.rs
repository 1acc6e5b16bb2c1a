//! Settings that are either a literal or computed per invocation.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

/// Asynchronous setting computation over the bot state `B` and invocation context `C`.
pub type ComputeFn<T, B, C> =
    Arc<dyn for<'a> Fn(&'a B, &'a C) -> BoxFuture<'a, anyhow::Result<T>> + Send + Sync>;

pub enum Reactive<T, B, C> {
    Literal(T),
    Computed(ComputeFn<T, B, C>),
}

impl<T, B, C> Reactive<T, B, C> {
    pub fn computed<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a B, &'a C) -> BoxFuture<'a, anyhow::Result<T>> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Wraps a synchronous, infallible computation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&B, &C) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        Self::computed(move |bot, ctx| futures::future::ready(Ok(f(bot, ctx))).boxed())
    }

    pub async fn resolve(&self, bot: &B, ctx: &C) -> anyhow::Result<T>
    where
        T: Clone,
    {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Computed(f) => f(bot, ctx).await,
        }
    }
}

impl<T: Clone, B, C> Clone for Reactive<T, B, C> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Computed(f) => Self::Computed(f.clone()),
        }
    }
}

impl<T: fmt::Debug, B, C> fmt::Debug for Reactive<T, B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<T, B, C> From<T> for Reactive<T, B, C> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

impl<B, C> From<&str> for Reactive<String, B, C> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}
