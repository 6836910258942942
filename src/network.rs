//! Connectivity tracking.

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::backend::Backend;

/// Shared online/offline flag with change notification.
#[derive(Clone)]
pub struct Connectivity {
    online: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { online: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Records the current state. Subscribers are only woken on an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!("{}", if online { "🌐 Back online" } else { "📴 Connection lost" });
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Periodically pings the backend and feeds the result into `connectivity`
/// until `shutdown` flips to true or its sender is dropped.
pub async fn probe_loop(
    connectivity: Connectivity,
    backend: Arc<dyn Backend>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reachable = backend.ping().await.is_ok();
                debug!("Connectivity probe: reachable={reachable}");
                connectivity.set_online(reachable);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
