//! Multi-turn conversation state machines.
//!
//! A [`Conversation`] is a composite [`Handler`]: it owns entry-point
//! handlers, per-state handler lists and fallback handlers, and tracks a
//! current state per conversation key (derived from the sender, the chat,
//! or both). Registered into a dispatcher group it behaves like any other
//! handler; registered inside another conversation's state list it becomes
//! a nested state machine, and ending it can forward a transition to the
//! enclosing conversation.
//!
//! Handler selection order is fixed: entry points (only while no state is
//! recorded, or always when re-entry is enabled), then the current state's
//! handlers, then fallbacks. Within each list, registration order decides.
//!
//! State is only written after a sub-handler returns successfully with a
//! transition instruction, so a failed handler never leaves a half-applied
//! transition behind. Per-key correctness assumes the transport delivers
//! updates for one key in order; no serialization is applied across keys.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use courier_core::Update;

use crate::context::Context;
use crate::handler::{BoxedHandler, Handler};
use crate::outcome::{HandlerError, HandlerResult, Outcome, Transition};

/// How the conversation key is derived from an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// One state per sender, across all chats.
    Sender,
    /// One state per chat, shared by everyone in it.
    Chat,
    /// One state per (sender, chat) pair.
    #[default]
    SenderAndChat,
}

impl KeyStrategy {
    /// Derives the conversation key for an update, if the update carries the
    /// identities this strategy needs.
    pub fn key_for(&self, update: &Update) -> Option<ConversationKey> {
        let chat_id = update.effective_chat().map(|c| c.id);
        let user_id = update.effective_sender().map(|u| u.id);
        match self {
            Self::Sender => user_id.map(|user_id| ConversationKey {
                chat_id: None,
                user_id: Some(user_id),
            }),
            Self::Chat => chat_id.map(|chat_id| ConversationKey {
                chat_id: Some(chat_id),
                user_id: None,
            }),
            Self::SenderAndChat => match (chat_id, user_id) {
                (Some(chat_id), Some(user_id)) => Some(ConversationKey {
                    chat_id: Some(chat_id),
                    user_id: Some(user_id),
                }),
                _ => None,
            },
        }
    }
}

/// Identifies one conversation instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    /// The chat component, when the strategy uses it.
    pub chat_id: Option<i64>,
    /// The sender component, when the strategy uses it.
    pub user_id: Option<i64>,
}

/// Where a conversation keeps its per-key current state.
///
/// The in-memory default suits single-process bots; a persistent backend can
/// implement this to survive restarts. Implementations must apply each call
/// atomically.
pub trait ConversationStorage: Send + Sync {
    /// The current state for a key, or `None` when the conversation has not
    /// been entered.
    fn current_state(&self, key: &ConversationKey) -> Option<String>;

    /// Records `state` as the key's current state.
    fn set_state(&self, key: ConversationKey, state: String);

    /// Removes the key's state entirely.
    fn clear(&self, key: &ConversationKey);
}

/// Process-local conversation storage.
#[derive(Default)]
pub struct InMemoryStorage {
    states: Mutex<HashMap<ConversationKey, String>>,
}

impl InMemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStorage for InMemoryStorage {
    fn current_state(&self, key: &ConversationKey) -> Option<String> {
        self.states.lock().get(key).cloned()
    }

    fn set_state(&self, key: ConversationKey, state: String) {
        self.states.lock().insert(key, state);
    }

    fn clear(&self, key: &ConversationKey) {
        self.states.lock().remove(key);
    }
}

/// A per-key finite state machine over multiple updates.
pub struct Conversation {
    name: String,
    entry_points: Vec<BoxedHandler>,
    states: HashMap<String, Vec<BoxedHandler>>,
    fallbacks: Vec<BoxedHandler>,
    key_strategy: KeyStrategy,
    allow_reentry: bool,
    storage: Arc<dyn ConversationStorage>,
    /// Sub-handler selected by `matches`, consumed by `handle`. Keyed by
    /// conversation key; assumes in-order delivery per key.
    pending: Mutex<HashMap<ConversationKey, BoxedHandler>>,
}

impl Conversation {
    /// Starts building a conversation.
    pub fn builder(name: impl Into<String>) -> ConversationBuilder {
        ConversationBuilder::new(name)
    }

    /// The conversation's registered name.
    pub fn conversation_name(&self) -> &str {
        &self.name
    }

    /// The current state for an update's key, mainly useful in tests and
    /// introspection tooling.
    pub fn state_of(&self, update: &Update) -> Option<String> {
        let key = self.key_strategy.key_for(update)?;
        self.storage.current_state(&key)
    }

    /// Picks the first matching sub-handler according to the selection order.
    fn select(&self, current: Option<&str>, update: &Update) -> Option<BoxedHandler> {
        let state_handlers = current.and_then(|state| self.states.get(state));

        let entry_points = match (current, self.allow_reentry) {
            // Not started: only entry points may match.
            (None, _) => Some(&self.entry_points),
            // Mid-conversation with re-entry: entry points first.
            (Some(_), true) => Some(&self.entry_points),
            (Some(_), false) => None,
        };

        // Fallbacks only apply once the conversation has been entered.
        let fallbacks = current.map(|_| &self.fallbacks);

        let candidates = entry_points
            .into_iter()
            .flatten()
            .chain(state_handlers.into_iter().flatten())
            .chain(fallbacks.into_iter().flatten());

        for handler in candidates {
            if handler.matches(update) {
                return Some(Arc::clone(handler));
            }
        }
        None
    }

    /// Applies a transition instruction after a sub-handler succeeded.
    fn apply(&self, key: ConversationKey, transition: Transition) -> HandlerResult {
        match transition {
            Transition::To(state) => {
                if !self.states.contains_key(&state) {
                    return Err(HandlerError::UnknownState {
                        conversation: self.name.clone(),
                        state,
                    });
                }
                debug!(conversation = %self.name, state = %state, "conversation advanced");
                self.storage.set_state(key, state);
                Ok(Outcome::Done)
            }
            Transition::End => {
                debug!(conversation = %self.name, "conversation ended");
                self.storage.clear(&key);
                Ok(Outcome::Done)
            }
            Transition::EndAndForward(parent) => {
                debug!(conversation = %self.name, "conversation ended, forwarding to parent");
                self.storage.clear(&key);
                Ok(Outcome::Transition(*parent))
            }
        }
    }
}

#[async_trait]
impl Handler for Conversation {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, update: &Update) -> bool {
        let Some(key) = self.key_strategy.key_for(update) else {
            return false;
        };
        let current = self.storage.current_state(&key);

        match self.select(current.as_deref(), update) {
            Some(handler) => {
                self.pending.lock().insert(key, handler);
                true
            }
            None => false,
        }
    }

    async fn handle(&self, ctx: Arc<Context>) -> HandlerResult {
        let Some(key) = self.key_strategy.key_for(ctx.update()) else {
            // `matches` derived a key for this update; its absence here
            // means the update was never matched by this conversation.
            return Ok(Outcome::ContinueGroup);
        };

        // Take the handler memoised by `matches`; re-select if the memo is
        // gone (e.g. the update was routed via `process` twice).
        let selected = self.pending.lock().remove(&key);
        let handler = match selected {
            Some(handler) => handler,
            None => {
                let current = self.storage.current_state(&key);
                match self.select(current.as_deref(), ctx.update()) {
                    Some(handler) => handler,
                    None => return Ok(Outcome::ContinueGroup),
                }
            }
        };

        match handler.handle(ctx).await {
            Ok(Outcome::Transition(transition)) => self.apply(key, transition),
            // Anything else passes through unchanged; the state is untouched.
            other => other,
        }
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("name", &self.name)
            .field("entry_points", &self.entry_points.len())
            .field("states", &self.states.len())
            .field("fallbacks", &self.fallbacks.len())
            .field("key_strategy", &self.key_strategy)
            .field("allow_reentry", &self.allow_reentry)
            .finish()
    }
}

/// Builder for [`Conversation`].
pub struct ConversationBuilder {
    name: String,
    entry_points: Vec<BoxedHandler>,
    states: HashMap<String, Vec<BoxedHandler>>,
    fallbacks: Vec<BoxedHandler>,
    key_strategy: KeyStrategy,
    allow_reentry: bool,
    storage: Option<Arc<dyn ConversationStorage>>,
}

impl ConversationBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_points: Vec::new(),
            states: HashMap::new(),
            fallbacks: Vec::new(),
            key_strategy: KeyStrategy::default(),
            allow_reentry: false,
            storage: None,
        }
    }

    /// Adds an entry-point handler.
    pub fn entry_point(mut self, handler: BoxedHandler) -> Self {
        self.entry_points.push(handler);
        self
    }

    /// Declares a state and the handlers valid while in it.
    pub fn state(mut self, name: impl Into<String>, handlers: Vec<BoxedHandler>) -> Self {
        self.states.insert(name.into(), handlers);
        self
    }

    /// Adds a fallback handler, consulted after the current state's handlers.
    pub fn fallback(mut self, handler: BoxedHandler) -> Self {
        self.fallbacks.push(handler);
        self
    }

    /// Sets how conversation keys are derived.
    pub fn key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }

    /// Keeps entry points matchable mid-conversation.
    pub fn allow_reentry(mut self, allow: bool) -> Self {
        self.allow_reentry = allow;
        self
    }

    /// Replaces the default in-memory state storage.
    pub fn storage(mut self, storage: Arc<dyn ConversationStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Builds the conversation.
    pub fn build(self) -> Conversation {
        Conversation {
            name: self.name,
            entry_points: self.entry_points,
            states: self.states,
            fallbacks: self.fallbacks,
            key_strategy: self.key_strategy,
            allow_reentry: self.allow_reentry,
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(InMemoryStorage::new())),
            pending: Mutex::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Probe, TestClient, text_update};

    fn ctx_for(update: &Update) -> Arc<Context> {
        Arc::new(Context::new(TestClient::boxed(), Arc::new(update.clone())))
    }

    /// Runs one update through the conversation the way the dispatcher
    /// would: `matches` first, then `handle` when it matched.
    async fn step(conversation: &Conversation, update: &Update) -> Option<HandlerResult> {
        if !conversation.matches(update) {
            return None;
        }
        Some(conversation.handle(ctx_for(update)).await)
    }

    fn start_probe() -> Arc<Probe> {
        Arc::new(
            Probe::new("start")
                .matching(|u| {
                    u.effective_message()
                        .is_some_and(|m| m.text_or_empty() == "/start")
                })
                .returning(|| Ok(Outcome::transition("ASKED"))),
        )
    }

    fn signup() -> (Conversation, Arc<Probe>, Arc<Probe>) {
        let entry = start_probe();
        let answer = Arc::new(
            Probe::new("answer").returning(|| Ok(Outcome::end_conversation())),
        );
        let conversation = Conversation::builder("signup")
            .entry_point(Arc::clone(&entry) as _)
            .state("ASKED", vec![Arc::clone(&answer) as _])
            .build();
        (conversation, entry, answer)
    }

    #[tokio::test]
    async fn entry_then_state_then_not_started_again() {
        let (conversation, entry, answer) = signup();

        // Before entry, state handlers do not match.
        let plain = text_update(1, 10, 20, "hello");
        assert!(step(&conversation, &plain).await.is_none());

        // Entry point starts the conversation.
        let start = text_update(2, 10, 20, "/start");
        assert!(matches!(step(&conversation, &start).await, Some(Ok(Outcome::Done))));
        assert_eq!(conversation.state_of(&start).as_deref(), Some("ASKED"));
        assert_eq!(entry.call_count(), 1);

        // In state ASKED, the state handler takes over and ends it.
        let reply = text_update(3, 10, 20, "Alice");
        assert!(matches!(step(&conversation, &reply).await, Some(Ok(Outcome::Done))));
        assert_eq!(answer.call_count(), 1);
        assert!(conversation.state_of(&reply).is_none());

        // Ended: back to entry points only.
        let after = text_update(4, 10, 20, "anything");
        assert!(step(&conversation, &after).await.is_none());
    }

    #[tokio::test]
    async fn entry_points_do_not_match_mid_conversation_without_reentry() {
        let (conversation, entry, _answer) = signup();

        let start = text_update(1, 10, 20, "/start");
        step(&conversation, &start).await;
        assert_eq!(entry.call_count(), 1);

        // `/start` mid-conversation does not re-trigger the entry point; the
        // ASKED handler (match-all) consumes it instead.
        let again = text_update(2, 10, 20, "/start");
        step(&conversation, &again).await;
        assert_eq!(entry.call_count(), 1);
    }

    #[tokio::test]
    async fn reentry_lets_entry_points_win_mid_conversation() {
        let entry = start_probe();
        let answer = Arc::new(Probe::new("answer"));
        let conversation = Conversation::builder("signup")
            .entry_point(Arc::clone(&entry) as _)
            .state("ASKED", vec![Arc::clone(&answer) as _])
            .allow_reentry(true)
            .build();

        let start = text_update(1, 10, 20, "/start");
        step(&conversation, &start).await;
        let again = text_update(2, 10, 20, "/start");
        step(&conversation, &again).await;

        assert_eq!(entry.call_count(), 2);
        assert_eq!(answer.call_count(), 0);
    }

    #[tokio::test]
    async fn fallbacks_run_when_no_state_handler_matches() {
        let entry = start_probe();
        let asked = Arc::new(
            Probe::new("asked").matching(|u| {
                u.effective_message()
                    .is_some_and(|m| m.text_or_empty().starts_with("name:"))
            }),
        );
        let cancel = Arc::new(
            Probe::new("cancel").returning(|| Ok(Outcome::end_conversation())),
        );
        let conversation = Conversation::builder("signup")
            .entry_point(Arc::clone(&entry) as _)
            .state("ASKED", vec![Arc::clone(&asked) as _])
            .fallback(Arc::clone(&cancel) as _)
            .build();

        step(&conversation, &text_update(1, 10, 20, "/start")).await;

        // Does not match the state handler, falls through to the fallback.
        let noise = text_update(2, 10, 20, "???");
        assert!(matches!(step(&conversation, &noise).await, Some(Ok(Outcome::Done))));
        assert_eq!(asked.call_count(), 0);
        assert_eq!(cancel.call_count(), 1);
        assert!(conversation.state_of(&noise).is_none());
    }

    #[tokio::test]
    async fn fallbacks_do_not_match_before_entry() {
        let fallback = Arc::new(Probe::new("cancel"));
        let conversation = Conversation::builder("signup")
            .entry_point(start_probe() as _)
            .state("ASKED", vec![])
            .fallback(Arc::clone(&fallback) as _)
            .build();

        assert!(step(&conversation, &text_update(1, 10, 20, "hi")).await.is_none());
        assert_eq!(fallback.call_count(), 0);
    }

    #[tokio::test]
    async fn sender_key_isolates_users_in_the_same_chat() {
        let conversation = Conversation::builder("quiz")
            .entry_point(start_probe() as _)
            .state("ASKED", vec![Arc::new(Probe::new("answer")) as _])
            .key_strategy(KeyStrategy::Sender)
            .build();

        let user_a = text_update(1, 10, 20, "/start");
        step(&conversation, &user_a).await;

        // Same chat, different sender: still not started.
        let user_b = text_update(2, 10, 21, "hello");
        assert!(step(&conversation, &user_b).await.is_none());
        assert_eq!(conversation.state_of(&user_a).as_deref(), Some("ASKED"));
        assert!(conversation.state_of(&user_b).is_none());
    }

    #[tokio::test]
    async fn chat_key_shares_state_between_users() {
        let answer = Arc::new(Probe::new("answer"));
        let conversation = Conversation::builder("quiz")
            .entry_point(start_probe() as _)
            .state("ASKED", vec![Arc::clone(&answer) as _])
            .key_strategy(KeyStrategy::Chat)
            .build();

        step(&conversation, &text_update(1, 10, 20, "/start")).await;

        // A different sender in the same chat continues the conversation.
        step(&conversation, &text_update(2, 10, 21, "blue")).await;
        assert_eq!(answer.call_count(), 1);
    }

    #[tokio::test]
    async fn transition_to_undeclared_state_is_an_error_and_keeps_state() {
        let entry = Arc::new(
            Probe::new("start")
                .matching(|u| {
                    u.effective_message()
                        .is_some_and(|m| m.text_or_empty() == "/start")
                })
                .returning(|| Ok(Outcome::transition("NOWHERE"))),
        );
        let conversation = Conversation::builder("broken")
            .entry_point(entry as _)
            .state("SOMEWHERE", vec![Arc::new(Probe::new("x")) as _])
            .build();

        let start = text_update(1, 10, 20, "/start");
        let result = step(&conversation, &start).await.expect("matched");
        assert!(matches!(
            result,
            Err(HandlerError::UnknownState { ref state, .. }) if state == "NOWHERE"
        ));
        // The failed transition must not be half-applied.
        assert!(conversation.state_of(&start).is_none());
    }

    #[tokio::test]
    async fn sub_handler_error_leaves_state_untouched() {
        let entry = start_probe();
        let failing = Arc::new(
            Probe::new("failing").returning(|| Err(HandlerError::msg("db down"))),
        );
        let conversation = Conversation::builder("signup")
            .entry_point(Arc::clone(&entry) as _)
            .state("ASKED", vec![failing as _])
            .build();

        let start = text_update(1, 10, 20, "/start");
        step(&conversation, &start).await;

        let reply = text_update(2, 10, 20, "Alice");
        let result = step(&conversation, &reply).await.expect("matched");
        assert!(result.is_err());
        assert_eq!(conversation.state_of(&reply).as_deref(), Some("ASKED"));
    }

    #[tokio::test]
    async fn nested_conversation_forwards_a_transition_to_its_parent() {
        // Child: entered by "/child", ends forwarding the parent to WRAP_UP.
        let child_entry = Arc::new(
            Probe::new("child-entry")
                .matching(|u| {
                    u.effective_message()
                        .is_some_and(|m| m.text_or_empty() == "/child")
                })
                .returning(|| Ok(Outcome::transition("INNER"))),
        );
        let child_finish = Arc::new(Probe::new("child-finish").returning(|| {
            Ok(Outcome::end_and_forward(Transition::to("WRAP_UP")))
        }));
        let child = Arc::new(
            Conversation::builder("child")
                .entry_point(child_entry as _)
                .state("INNER", vec![child_finish as _])
                .build(),
        );

        // Parent: ASKED advances into NESTED, which delegates to the child.
        let wrap_up = Arc::new(Probe::new("wrap-up"));
        let to_nested = Arc::new(
            Probe::new("to-nested").returning(|| Ok(Outcome::transition("NESTED"))),
        );
        let parent = Conversation::builder("parent")
            .entry_point(start_probe() as _)
            .state("ASKED", vec![to_nested as _])
            .state("NESTED", vec![Arc::clone(&child) as BoxedHandler])
            .state("WRAP_UP", vec![Arc::clone(&wrap_up) as _])
            .build();

        // Enter the parent and advance into the NESTED state.
        step(&parent, &text_update(1, 10, 20, "/start")).await;
        step(&parent, &text_update(2, 10, 20, "next")).await;
        let probe_update = text_update(0, 10, 20, "x");
        assert_eq!(parent.state_of(&probe_update).as_deref(), Some("NESTED"));

        // Enter the child, then let it finish and forward.
        step(&parent, &text_update(3, 10, 20, "/child")).await;
        let finish = text_update(4, 10, 20, "done");
        let result = step(&parent, &finish).await.expect("matched");
        assert!(matches!(result, Ok(Outcome::Done)));

        // Child ended, parent advanced to the forwarded state.
        assert!(child.state_of(&finish).is_none());
        assert_eq!(parent.state_of(&finish).as_deref(), Some("WRAP_UP"));

        // The WRAP_UP handler now receives updates.
        step(&parent, &text_update(5, 10, 20, "bye")).await;
        assert_eq!(wrap_up.call_count(), 1);
    }
}
