//! Bot registry for running many bot identities in one process.
//!
//! Each registered bot gets a [`BotEntry`]: a dedicated update channel the
//! transport pushes into, and a cooperative stop signal the transport's
//! polling or webhook loop is expected to observe. At most one live entry
//! exists per token; removing and re-adding a token yields a fresh entry
//! with a fresh channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, info};

use courier_core::Update;

use crate::error::{RuntimeError, RuntimeResult};

/// One live bot identity: its inbound update channel and stop signal.
pub struct BotEntry {
    token: String,
    updates: mpsc::Sender<Update>,
    stop: watch::Sender<bool>,
}

impl BotEntry {
    /// The bot token this entry belongs to.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The sender the transport pushes decoded updates into.
    ///
    /// Sends block when the dispatcher is saturated; that backpressure is
    /// deliberate and should stall the producing loop.
    pub fn sender(&self) -> mpsc::Sender<Update> {
        self.updates.clone()
    }

    /// Signals the owning transport loop to stop.
    pub fn stop(&self) {
        // Receivers may already be gone during teardown.
        let _ = self.stop.send(true);
    }

    /// Whether a stop has been requested.
    pub fn should_stop(&self) -> bool {
        *self.stop.borrow()
    }

    /// A receiver that resolves when a stop is requested, for `select!`-style
    /// loops.
    pub fn stopped(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }
}

impl std::fmt::Debug for BotEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotEntry")
            .field("token", &self.token)
            .field("should_stop", &self.should_stop())
            .finish()
    }
}

/// Thread-safe map from bot token to its [`BotEntry`].
#[derive(Default)]
pub struct BotRegistry {
    bots: RwLock<HashMap<String, Arc<BotEntry>>>,
}

impl BotRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bot and creates its update channel.
    ///
    /// Returns the entry plus the receiving end of the channel, which the
    /// caller hands to the dispatcher. Fails if the token is already
    /// registered.
    pub async fn add_bot(
        &self,
        token: &str,
        buffer: usize,
    ) -> RuntimeResult<(Arc<BotEntry>, mpsc::Receiver<Update>)> {
        let mut bots = self.bots.write().await;
        if bots.contains_key(token) {
            return Err(RuntimeError::BotExists(token.to_string()));
        }

        let (updates_tx, updates_rx) = mpsc::channel(buffer);
        let (stop_tx, _stop_rx) = watch::channel(false);
        let entry = Arc::new(BotEntry {
            token: token.to_string(),
            updates: updates_tx,
            stop: stop_tx,
        });

        bots.insert(token.to_string(), Arc::clone(&entry));
        info!(token, "bot registered");
        Ok((entry, updates_rx))
    }

    /// Removes and returns a bot's entry.
    ///
    /// The entry is not stopped; callers that want to end its loops should
    /// call [`BotEntry::stop`] on the returned entry.
    pub async fn remove_bot(&self, token: &str) -> Option<Arc<BotEntry>> {
        let removed = self.bots.write().await.remove(token);
        if removed.is_some() {
            info!(token, "bot removed");
        }
        removed
    }

    /// Looks up a bot's entry.
    pub async fn get(&self, token: &str) -> Option<Arc<BotEntry>> {
        self.bots.read().await.get(token).cloned()
    }

    /// Returns an independent snapshot of all entries.
    pub async fn all(&self) -> Vec<Arc<BotEntry>> {
        self.bots.read().await.values().cloned().collect()
    }

    /// Number of registered bots.
    pub async fn count(&self) -> usize {
        self.bots.read().await.len()
    }

    /// Signals every bot to stop and clears the registry.
    pub async fn stop_all(&self) {
        let mut bots = self.bots.write().await;
        info!(count = bots.len(), "stopping all bots");
        for entry in bots.values() {
            entry.stop();
            debug!(token = entry.token(), "stop signalled");
        }
        bots.clear();
    }
}

impl std::fmt::Debug for BotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BotRegistry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_token_is_rejected() {
        let registry = BotRegistry::new();

        let first = registry.add_bot("token-a", 8).await;
        assert!(first.is_ok());

        let second = registry.add_bot("token-a", 8).await;
        assert!(matches!(second, Err(RuntimeError::BotExists(t)) if t == "token-a"));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn remove_then_re_add_yields_a_fresh_entry() {
        let registry = BotRegistry::new();

        let (entry, _rx) = registry.add_bot("token-a", 8).await.expect("add");
        entry.stop();

        let removed = registry.remove_bot("token-a").await.expect("present");
        assert!(removed.should_stop());
        assert!(registry.get("token-a").await.is_none());

        let (fresh, _rx) = registry.add_bot("token-a", 8).await.expect("re-add");
        assert!(!fresh.should_stop());
    }

    #[tokio::test]
    async fn stop_all_signals_and_clears() {
        let registry = BotRegistry::new();
        let (a, _rx_a) = registry.add_bot("a", 8).await.expect("add a");
        let (b, _rx_b) = registry.add_bot("b", 8).await.expect("add b");

        registry.stop_all().await;

        assert!(a.should_stop());
        assert!(b.should_stop());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn snapshot_is_unaffected_by_later_mutation() {
        let registry = BotRegistry::new();
        let _keep_a = registry.add_bot("a", 8).await.expect("add a");

        let snapshot = registry.all().await;
        registry.remove_bot("a").await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn stopped_receiver_observes_the_signal() {
        let registry = BotRegistry::new();
        let (entry, _rx) = registry.add_bot("a", 8).await.expect("add");

        let mut stopped = entry.stopped();
        assert!(!*stopped.borrow());

        entry.stop();
        stopped.changed().await.expect("signal");
        assert!(*stopped.borrow());
    }
}
