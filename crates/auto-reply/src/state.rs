//! Per-channel registries of the responder.
//!
//! All state is memory-resident and keyed by an opaque channel id. Unknown
//! ids read as the default (disabled, idle, not greeted, empty history).
//! The mutex is never held across `.await` points.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use {afk_common::types::ConversationMessage, serde::Serialize, tokio_util::sync::CancellationToken};

/// Maximum number of history entries retained per channel.
pub const MAX_HISTORY: usize = 10;

/// What a status indicator should show for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Inactive,
    Active,
    Processing,
    /// Covered by global mode without per-channel activation.
    Global,
}

#[derive(Default)]
struct Registries {
    enabled: HashSet<String>,
    /// Channel id → claim id of the pipeline holding it.
    processing: HashMap<String, u64>,
    greeted: HashSet<String>,
    history: HashMap<String, VecDeque<ConversationMessage>>,
    away_reasons: HashMap<String, String>,
    typing: HashMap<String, CancellationToken>,
    /// Bumped on every toggle of the channel.
    epochs: HashMap<String, u64>,
}

impl Registries {
    fn bump_epoch(&mut self, channel_id: &str) {
        *self.epochs.entry(channel_id.to_string()).or_default() += 1;
    }

    fn append_history(&mut self, channel_id: &str, entry: ConversationMessage) -> Vec<ConversationMessage> {
        let history = self.history.entry(channel_id.to_string()).or_default();
        history.push_back(entry);
        while history.len() > MAX_HISTORY {
            history.pop_front();
        }
        history.iter().cloned().collect()
    }
}

/// Owned, injectable store for every piece of responder state.
pub struct StateStore {
    inner: Mutex<Registries>,
    global_mode: AtomicBool,
    next_claim: AtomicU64,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(false)
    }
}

impl StateStore {
    pub fn new(global_mode: bool) -> Self {
        Self {
            inner: Mutex::new(Registries::default()),
            global_mode: AtomicBool::new(global_mode),
            next_claim: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registries> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Activation ──────────────────────────────────────────────────────────

    pub fn is_enabled(&self, channel_id: &str) -> bool {
        self.lock().enabled.contains(channel_id)
    }

    /// Enabled individually or covered by global mode.
    pub fn is_active(&self, channel_id: &str) -> bool {
        self.global_mode() || self.is_enabled(channel_id)
    }

    /// Start a fresh activation: no greeting yet, empty history, the given
    /// away reason (or none).
    pub fn enable(&self, channel_id: &str, away_reason: Option<String>) {
        let mut reg = self.lock();
        reg.enabled.insert(channel_id.to_string());
        reg.greeted.remove(channel_id);
        reg.history.remove(channel_id);
        match away_reason {
            Some(reason) => {
                reg.away_reasons.insert(channel_id.to_string(), reason);
            },
            None => {
                reg.away_reasons.remove(channel_id);
            },
        }
        reg.bump_epoch(channel_id);
    }

    /// Full per-channel reset. Typing leases are released by the typing
    /// driver, which also emits the stop signal.
    pub fn disable(&self, channel_id: &str) {
        let mut reg = self.lock();
        reg.enabled.remove(channel_id);
        reg.processing.remove(channel_id);
        reg.greeted.remove(channel_id);
        reg.history.remove(channel_id);
        reg.away_reasons.remove(channel_id);
        reg.bump_epoch(channel_id);
    }

    /// Activation counter used to detect work that outlived its activation.
    pub fn epoch(&self, channel_id: &str) -> u64 {
        self.lock().epochs.get(channel_id).copied().unwrap_or_default()
    }

    pub fn enabled_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.lock().enabled.iter().cloned().collect();
        channels.sort();
        channels
    }

    pub fn clear_enabled(&self) {
        self.lock().enabled.clear();
    }

    pub fn global_mode(&self) -> bool {
        self.global_mode.load(Ordering::SeqCst)
    }

    pub fn set_global_mode(&self, enabled: bool) {
        self.global_mode.store(enabled, Ordering::SeqCst);
    }

    // ── In-flight guard ─────────────────────────────────────────────────────

    pub fn is_processing(&self, channel_id: &str) -> bool {
        self.lock().processing.contains_key(channel_id)
    }

    /// Claim the channel for one response pipeline.
    ///
    /// Returns `None` while another claim is held. The claim is released when
    /// the guard drops.
    pub fn try_begin_processing(self: &Arc<Self>, channel_id: &str) -> Option<ProcessingGuard> {
        let mut reg = self.lock();
        if reg.processing.contains_key(channel_id) {
            return None;
        }
        let claim = self.next_claim.fetch_add(1, Ordering::SeqCst);
        reg.processing.insert(channel_id.to_string(), claim);
        Some(ProcessingGuard {
            store: Arc::clone(self),
            channel_id: channel_id.to_string(),
            claim,
        })
    }

    pub fn processing_count(&self) -> usize {
        self.lock().processing.len()
    }

    fn release(&self, channel_id: &str, claim: u64) {
        let mut reg = self.lock();
        if reg.processing.get(channel_id) == Some(&claim) {
            reg.processing.remove(channel_id);
        }
    }

    // ── Greeting latch ──────────────────────────────────────────────────────

    pub fn is_greeted(&self, channel_id: &str) -> bool {
        self.lock().greeted.contains(channel_id)
    }

    pub fn mark_greeted(&self, channel_id: &str) {
        self.lock().greeted.insert(channel_id.to_string());
    }

    // ── History ─────────────────────────────────────────────────────────────

    pub fn history(&self, channel_id: &str) -> Vec<ConversationMessage> {
        self.lock()
            .history
            .get(channel_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append an entry, evict the oldest beyond [`MAX_HISTORY`], and return
    /// the retained history.
    pub fn push_history(&self, channel_id: &str, entry: ConversationMessage) -> Vec<ConversationMessage> {
        self.lock().append_history(channel_id, entry)
    }

    /// Append only while `epoch` is still the channel's activation.
    ///
    /// Returns `false`, leaving the history untouched, when a toggle happened
    /// since `epoch` was read.
    pub fn push_history_if_epoch(
        &self,
        channel_id: &str,
        epoch: u64,
        entry: ConversationMessage,
    ) -> bool {
        let mut reg = self.lock();
        if reg.epochs.get(channel_id).copied().unwrap_or_default() != epoch {
            return false;
        }
        reg.append_history(channel_id, entry);
        true
    }

    pub fn clear_history(&self, channel_id: &str) {
        self.lock().history.remove(channel_id);
    }

    // ── Away reason ─────────────────────────────────────────────────────────

    pub fn away_reason(&self, channel_id: &str) -> Option<String> {
        self.lock().away_reasons.get(channel_id).cloned()
    }

    // ── Typing leases ───────────────────────────────────────────────────────

    /// Store a new lease, returning the one it replaces.
    pub fn replace_typing_lease(
        &self,
        channel_id: &str,
        lease: CancellationToken,
    ) -> Option<CancellationToken> {
        self.lock().typing.insert(channel_id.to_string(), lease)
    }

    pub fn take_typing_lease(&self, channel_id: &str) -> Option<CancellationToken> {
        self.lock().typing.remove(channel_id)
    }

    pub fn take_all_typing_leases(&self) -> Vec<(String, CancellationToken)> {
        self.lock().typing.drain().collect()
    }

    pub fn has_typing_lease(&self, channel_id: &str) -> bool {
        self.lock().typing.contains_key(channel_id)
    }

    // ── Bulk ────────────────────────────────────────────────────────────────

    /// Reset every registry and cancel every typing lease. Global mode is a
    /// setting and survives.
    pub fn clear_all(&self) {
        let mut reg = self.lock();
        for lease in reg.typing.values() {
            lease.cancel();
        }
        *reg = Registries::default();
    }

    /// Status for a polling indicator.
    pub fn channel_status(&self, channel_id: &str) -> ChannelStatus {
        let reg = self.lock();
        if reg.processing.contains_key(channel_id) {
            ChannelStatus::Processing
        } else if reg.enabled.contains(channel_id) {
            ChannelStatus::Active
        } else if self.global_mode() {
            ChannelStatus::Global
        } else {
            ChannelStatus::Inactive
        }
    }
}

/// Exclusive claim on a channel's response pipeline.
#[must_use = "the claim is released as soon as the guard is dropped"]
pub struct ProcessingGuard {
    store: Arc<StateStore>,
    channel_id: String,
    claim: u64,
}

impl ProcessingGuard {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.store.release(&self.channel_id, self.claim);
    }
}

impl std::fmt::Debug for ProcessingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingGuard")
            .field("channel_id", &self.channel_id)
            .field("claim", &self.claim)
            .finish()
    }
}
