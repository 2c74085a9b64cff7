//! The handler contract.
//!
//! A [`Handler`] is the unit of registration in the dispatch engine: a named
//! value exposing a pure `matches` predicate and an async `handle` action.
//! Concrete kinds (message handlers, command handlers, conversations, ...)
//! are small structs implementing this one trait; the group table stores
//! them as trait objects.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use courier_core::Update;

use crate::context::Context;
use crate::outcome::HandlerResult;

/// A registered unit of update processing.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Stable identity, used for removal by name. Need not be globally
    /// unique; removal takes the first handler with this name in a group.
    fn name(&self) -> &str;

    /// Whether this handler wants the update.
    ///
    /// Must be pure and total: no side effects, and safe to call for every
    /// update kind (returning `false` for irrelevant kinds rather than
    /// panicking).
    fn matches(&self, update: &Update) -> bool;

    /// Processes a matched update.
    ///
    /// May block on outbound calls and may fail; the returned
    /// [`Outcome`](crate::Outcome) steers the dispatcher's routing.
    async fn handle(&self, ctx: Arc<Context>) -> HandlerResult;
}

/// A shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// A type-erased async callback invoked by the concrete handler kinds.
pub type Callback = Arc<dyn Fn(Arc<Context>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Erases an async function into a [`Callback`].
pub fn into_callback<F, Fut>(f: F) -> Callback
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}
