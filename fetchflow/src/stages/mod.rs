//! Stage resolvers.
//!
//! A stage resolver performs one asynchronous lookup and reports either a
//! value or a [`ResolveError`]. Resolvers are composed into a
//! [`PipelineController`](crate::pipeline::PipelineController), where the
//! first resolver consumes raw input and the second consumes the first
//! resolver's output.

mod input;

pub use input::Validate;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::ResolveError;

/// Trait for pipeline stage resolvers.
#[async_trait]
pub trait StageResolver: Send + Sync {
    /// Value consumed by this stage.
    type Input: Send + Sync;
    /// Value produced on success.
    type Output: Send;

    /// Returns the name of the resolver, used in logs and events.
    fn name(&self) -> &str;

    /// Performs the lookup. Exactly one attempt; no retry.
    async fn resolve(&self, input: &Self::Input) -> Result<Self::Output, ResolveError>;

    /// Maps a failure to the message shown to the user.
    fn failure_message(&self, error: &ResolveError) -> String {
        error.user_message()
    }
}

#[async_trait]
impl<R> StageResolver for Arc<R>
where
    R: StageResolver + ?Sized,
{
    type Input = R::Input;
    type Output = R::Output;

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn resolve(&self, input: &Self::Input) -> Result<Self::Output, ResolveError> {
        (**self).resolve(input).await
    }

    fn failure_message(&self, error: &ResolveError) -> String {
        (**self).failure_message(error)
    }
}

/// A resolver built from a closure returning a boxed future.
pub struct FnResolver<I, O, F>
where
    F: Fn(&I) -> BoxFuture<'static, Result<O, ResolveError>> + Send + Sync,
{
    name: String,
    func: F,
    _phantom: PhantomData<fn(&I) -> O>,
}

impl<I, O, F> FnResolver<I, O, F>
where
    F: Fn(&I) -> BoxFuture<'static, Result<O, ResolveError>> + Send + Sync,
{
    /// Creates a new closure-based resolver.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

impl<I, O, F> Debug for FnResolver<I, O, F>
where
    F: Fn(&I) -> BoxFuture<'static, Result<O, ResolveError>> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<I, O, F> StageResolver for FnResolver<I, O, F>
where
    I: Send + Sync,
    O: Send,
    F: Fn(&I) -> BoxFuture<'static, Result<O, ResolveError>> + Send + Sync,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, input: &I) -> Result<O, ResolveError> {
        (self.func)(input).await
    }
}

/// A second stage that forwards the first stage's output unchanged.
///
/// Used by single-lookup pipelines, where the first stage's value is the
/// final result.
pub struct Passthrough<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Passthrough<T> {
    /// Creates a new passthrough stage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for Passthrough<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Passthrough<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passthrough")
    }
}

#[async_trait]
impl<T> StageResolver for Passthrough<T>
where
    T: Clone + Send + Sync,
{
    type Input = T;
    type Output = T;

    fn name(&self) -> &str {
        "passthrough"
    }

    async fn resolve(&self, input: &T) -> Result<T, ResolveError> {
        Ok(input.clone())
    }
}
