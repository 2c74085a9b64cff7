//! Per-update context handed to handlers.
//!
//! One [`Context`] is created per dispatched update — lazily, the first time
//! a handler in some group matches, so updates that match nothing never pay
//! for it. The same `Arc<Context>` is then shared by every handler invoked
//! for that update and dropped when routing finishes.
//!
//! Besides the update and the client handle, the context carries a scratch
//! map keyed by type, letting handlers in earlier groups pass derived data
//! to handlers in later groups within the same dispatch pass.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use courier_core::{BoxedClient, Chat, Message, Update, User};

/// The context object passed to handlers while one update is processed.
pub struct Context {
    client: BoxedClient,
    update: Arc<Update>,
    scratch: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Context {
    /// Creates a context for one update.
    pub fn new(client: BoxedClient, update: Arc<Update>) -> Self {
        Self {
            client,
            update,
            scratch: Mutex::new(HashMap::new()),
        }
    }

    /// The update being processed.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// A shared handle to the update.
    pub fn update_arc(&self) -> Arc<Update> {
        Arc::clone(&self.update)
    }

    /// The client handle for issuing outbound calls.
    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    /// A clone of the client `Arc`.
    pub fn client_arc(&self) -> BoxedClient {
        Arc::clone(&self.client)
    }

    /// The message this update is about, if any.
    pub fn effective_message(&self) -> Option<&Message> {
        self.update.effective_message()
    }

    /// The chat this update happened in, if any.
    pub fn effective_chat(&self) -> Option<&Chat> {
        self.update.effective_chat()
    }

    /// The user who caused this update, if any.
    pub fn effective_sender(&self) -> Option<&User> {
        self.update.effective_sender()
    }

    /// Stores a value in the scratch map, overwriting any previous value of
    /// the same type. Visible to every later handler in this dispatch pass.
    pub fn set_state<T: Send + Sync + 'static>(&self, value: T) {
        self.scratch.lock().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a cloned value from the scratch map.
    pub fn get_state<T: Clone + 'static>(&self) -> Option<T> {
        self.scratch
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Whether a value of type `T` is present in the scratch map.
    pub fn has_state<T: 'static>(&self) -> bool {
        self.scratch.lock().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a value from the scratch map.
    pub fn take_state<T: 'static>(&self) -> Option<T> {
        self.scratch
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("update_id", &self.update.update_id)
            .field("kind", &self.update.kind_name())
            .finish_non_exhaustive()
    }
}
