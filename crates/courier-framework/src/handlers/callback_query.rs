//! Handler for inline-keyboard button presses.

use std::sync::Arc;

use async_trait::async_trait;

use courier_core::{Update, UpdateKind};

use crate::context::Context;
use crate::handler::{Callback, Handler, into_callback};
use crate::outcome::HandlerResult;

/// Runs a callback for callback queries, optionally restricted to payloads
/// with a given prefix.
pub struct CallbackQueryHandler {
    name: String,
    prefix: Option<String>,
    callback: Callback,
}

impl CallbackQueryHandler {
    /// Creates a handler matching every callback query.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            prefix: None,
            callback: into_callback(f),
        }
    }

    /// Restricts the handler to queries whose data starts with `prefix`.
    ///
    /// Queries without any data never match a prefixed handler.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

#[async_trait]
impl Handler for CallbackQueryHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, update: &Update) -> bool {
        let UpdateKind::CallbackQuery(query) = &update.kind else {
            return false;
        };
        match &self.prefix {
            Some(prefix) => query
                .data
                .as_deref()
                .is_some_and(|data| data.starts_with(prefix)),
            None => true,
        }
    }

    async fn handle(&self, ctx: Arc<Context>) -> HandlerResult {
        (self.callback)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use crate::testutil::{callback_update, text_update};

    fn pager() -> CallbackQueryHandler {
        CallbackQueryHandler::new("pager", |_ctx| async { Ok(Outcome::Done) })
            .with_prefix("page:")
    }

    #[test]
    fn prefix_restricts_matches() {
        let handler = pager();

        assert!(handler.matches(&callback_update(1, 20, "page:2")));
        assert!(!handler.matches(&callback_update(2, 20, "vote:yes")));
        assert!(!handler.matches(&text_update(3, 10, 20, "page:2")));
    }

    #[test]
    fn unprefixed_handler_matches_any_query() {
        let handler = CallbackQueryHandler::new("any", |_ctx| async { Ok(Outcome::Done) });

        assert!(handler.matches(&callback_update(1, 20, "whatever")));
        assert!(!handler.matches(&text_update(2, 10, 20, "hi")));
    }
}
