//! Control-flow signals returned by handlers.
//!
//! A handler finishes with `Result<Outcome, HandlerError>`: control flow is
//! an explicit enum, errors are errors. The dispatcher never has to compare
//! error values against sentinels to decide what to do next.

use thiserror::Error;

/// What the dispatcher should do after a handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The update was handled; move on to the next group.
    Done,
    /// Behave as if this handler had not matched: keep scanning the current
    /// group for another match.
    ContinueGroup,
    /// Stop visiting any further groups for this update.
    EndGroups,
    /// A conversation state-machine instruction. Only meaningful when the
    /// handler runs inside a [`Conversation`](crate::Conversation); anywhere
    /// else it is reported as [`HandlerError::StrayTransition`].
    Transition(Transition),
}

impl Outcome {
    /// Moves the enclosing conversation to the named state.
    pub fn transition(state: impl Into<String>) -> Self {
        Self::Transition(Transition::To(state.into()))
    }

    /// Ends the enclosing conversation; its key reverts to "not started".
    pub fn end_conversation() -> Self {
        Self::Transition(Transition::End)
    }

    /// Ends the enclosing conversation and forwards a transition to the
    /// conversation one level up (for nested conversations).
    pub fn end_and_forward(parent: Transition) -> Self {
        Self::Transition(Transition::EndAndForward(Box::new(parent)))
    }
}

/// A conversation state-machine instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move to the named state.
    To(String),
    /// End the conversation; the key's state entry is removed.
    End,
    /// End this conversation and re-signal the enclosing conversation with
    /// the inner transition.
    EndAndForward(Box<Transition>),
}

impl Transition {
    /// Transition to the named state.
    pub fn to(state: impl Into<String>) -> Self {
        Self::To(state.into())
    }
}

/// Result type returned by [`Handler::handle`](crate::Handler::handle).
pub type HandlerResult = Result<Outcome, HandlerError>;

/// Application-level handler failures.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A conversation was asked to move to a state it does not declare.
    /// This is a bug in the state-graph definition, not a runtime condition.
    #[error("conversation '{conversation}' has no state named '{state}'")]
    UnknownState {
        /// The conversation reporting the bad transition.
        conversation: String,
        /// The undeclared state name.
        state: String,
    },

    /// A state transition surfaced outside of any conversation, i.e. from a
    /// handler registered directly into a group.
    #[error("state transition returned outside of a conversation")]
    StrayTransition,

    /// An outbound API call failed.
    #[error(transparent)]
    Api(#[from] courier_core::ApiError),

    /// A free-form failure message.
    #[error("{0}")]
    Message(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Creates a free-form error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// What the dispatcher should do after the error callback handled a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorAction {
    /// Treat the handler as having run: move on to the next group.
    #[default]
    Noop,
    /// Keep scanning the current group for another match.
    ContinueGroup,
    /// Stop visiting any further groups for this update.
    EndGroups,
}
