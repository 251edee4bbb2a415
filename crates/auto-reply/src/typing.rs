//! Typing indicator keep-alive.
//!
//! Hosts expire a typing indicator after a few seconds, so it is renewed on a
//! fixed period for as long as a lease is held: acquire, renew, release.

use std::{future::Future, sync::Arc, time::Duration};

use {
    afk_channels::ChannelOutbound,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::state::StateStore;

/// Default renewal period of the typing indicator.
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_secs(8);

/// Run `renew` every `period` until `lease` is cancelled.
///
/// The first renewal happens one period after the call.
pub fn spawn_lease_renewal<F, Fut>(
    lease: CancellationToken,
    period: Duration,
    mut renew: F,
) -> tokio::task::JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = lease.cancelled() => break,
                _ = tokio::time::sleep(period) => renew().await,
            }
        }
    })
}

/// Starts and stops the per-channel typing signal.
pub struct TypingIndicator {
    outbound: Arc<dyn ChannelOutbound>,
    state: Arc<StateStore>,
    interval: Duration,
}

impl TypingIndicator {
    pub fn new(outbound: Arc<dyn ChannelOutbound>, state: Arc<StateStore>, interval: Duration) -> Self {
        Self {
            outbound,
            state,
            interval,
        }
    }

    /// Emit "typing" now and keep renewing it until [`stop`](Self::stop).
    ///
    /// An existing lease for the channel is cancelled first.
    pub async fn start(&self, channel_id: &str) {
        debug!(channel_id, "starting typing indicator");

        let lease = CancellationToken::new();
        if let Some(previous) = self.state.replace_typing_lease(channel_id, lease.clone()) {
            previous.cancel();
        }

        emit_typing(self.outbound.as_ref(), channel_id).await;

        let outbound = Arc::clone(&self.outbound);
        let channel = channel_id.to_string();
        spawn_lease_renewal(lease, self.interval, move || {
            let outbound = Arc::clone(&outbound);
            let channel = channel.clone();
            async move { emit_typing(outbound.as_ref(), &channel).await }
        });
    }

    /// Release the channel's lease, if any, and clear the indicator.
    pub async fn stop(&self, channel_id: &str) {
        debug!(channel_id, "stopping typing indicator");
        if let Some(lease) = self.state.take_typing_lease(channel_id) {
            lease.cancel();
        }
        emit_stop(self.outbound.as_ref(), channel_id).await;
    }

    /// Release every lease (shutdown).
    pub async fn stop_all(&self) {
        for (channel_id, lease) in self.state.take_all_typing_leases() {
            lease.cancel();
            emit_stop(self.outbound.as_ref(), &channel_id).await;
        }
    }
}

async fn emit_typing(outbound: &dyn ChannelOutbound, channel_id: &str) {
    if let Err(e) = outbound.send_typing(channel_id).await {
        warn!(channel_id, error = %e, "typing indicator failed");
    }
}

async fn emit_stop(outbound: &dyn ChannelOutbound, channel_id: &str) {
    if let Err(e) = outbound.stop_typing(channel_id).await {
        warn!(channel_id, error = %e, "failed to clear typing indicator");
    }
}
