//! Handler for slash commands.

use std::sync::Arc;

use async_trait::async_trait;

use courier_core::{Update, UpdateKind};

use crate::context::Context;
use crate::handler::{Callback, Handler, into_callback};
use crate::outcome::HandlerResult;

/// Runs a callback for messages carrying a specific `/command`.
///
/// Both the bare form (`/start`) and the addressed form (`/start@some_bot`)
/// match; command names compare case-insensitively. The handler's match
/// predicate has no client handle, so the `@suffix` is not checked against
/// the bot's own username — an addressed command for another bot still
/// matches and should be filtered by the callback if that matters.
pub struct CommandHandler {
    name: String,
    command: String,
    callback: Callback,
}

impl CommandHandler {
    /// Creates a handler for `/command` (pass the name without the slash).
    pub fn new<F, Fut>(command: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let command = command.into().to_lowercase();
        Self {
            name: format!("command:{command}"),
            command,
            callback: into_callback(f),
        }
    }

    fn is_match(&self, text: &str) -> bool {
        let Some(rest) = text.strip_prefix('/') else {
            return false;
        };
        let first_token = rest.split_whitespace().next().unwrap_or("");
        let command = first_token.split('@').next().unwrap_or("");
        command.eq_ignore_ascii_case(&self.command)
    }
}

#[async_trait]
impl Handler for CommandHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, update: &Update) -> bool {
        match &update.kind {
            UpdateKind::Message(m) => m.text.as_deref().is_some_and(|t| self.is_match(t)),
            _ => false,
        }
    }

    async fn handle(&self, ctx: Arc<Context>) -> HandlerResult {
        (self.callback)(ctx).await
    }
}

/// Splits the arguments following a command.
///
/// `command_args("/ban @spammer 7d")` yields `["@spammer", "7d"]`.
pub fn command_args(text: &str) -> Vec<&str> {
    text.split_whitespace().skip(1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use crate::testutil::text_update;

    fn start() -> CommandHandler {
        CommandHandler::new("start", |_ctx| async { Ok(Outcome::Done) })
    }

    #[test]
    fn matches_bare_and_addressed_forms() {
        let handler = start();

        assert!(handler.matches(&text_update(1, 10, 20, "/start")));
        assert!(handler.matches(&text_update(2, 10, 20, "/start@my_bot")));
        assert!(handler.matches(&text_update(3, 10, 20, "/START now")));
        assert!(handler.matches(&text_update(4, 10, 20, "/start arg1 arg2")));
    }

    #[test]
    fn rejects_other_commands_and_plain_text() {
        let handler = start();

        assert!(!handler.matches(&text_update(1, 10, 20, "/starting")));
        assert!(!handler.matches(&text_update(2, 10, 20, "/stop")));
        assert!(!handler.matches(&text_update(3, 10, 20, "start")));
        assert!(!handler.matches(&text_update(4, 10, 20, "say /start")));
    }

    #[test]
    fn handler_name_embeds_the_command() {
        assert_eq!(start().name(), "command:start");
    }

    #[test]
    fn args_skip_the_command_token() {
        assert_eq!(command_args("/ban @spammer 7d"), vec!["@spammer", "7d"]);
        assert!(command_args("/ban").is_empty());
    }
}
