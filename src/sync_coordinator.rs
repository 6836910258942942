use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::network::Connectivity;
use crate::session::{SessionEvent, SessionManager};
use crate::sync::{SyncOutcome, SyncService};

/// What the coordinator is doing right now. Mirrors the engine's
/// single-flight guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    ReconcilingInFlight,
}

/// Decides when to run a reconciliation pass.
///
/// Triggers are the initial load, a login, a reconnect with queued work and a
/// periodic timer that only runs while signed in and online. A manual logout
/// wipes local task state.
pub struct SyncCoordinator {
    sync: SyncService,
    session: SessionManager,
    connectivity: Connectivity,
    interval: Option<Duration>,
    events: broadcast::Receiver<SessionEvent>,
    online_rx: watch::Receiver<bool>,
}

impl SyncCoordinator {
    /// `interval` of `None` disables the periodic timer. Session and
    /// connectivity changes are observed from this point on.
    pub fn new(
        sync: SyncService,
        session: SessionManager,
        connectivity: Connectivity,
        interval: Option<Duration>,
    ) -> Self {
        let events = session.subscribe_events();
        let online_rx = connectivity.subscribe();
        Self {
            sync,
            session,
            connectivity,
            interval,
            events,
            online_rx,
        }
    }

    pub fn from_config(
        sync: SyncService,
        session: SessionManager,
        connectivity: Connectivity,
        config: &SyncConfig,
    ) -> Self {
        Self::new(sync, session, connectivity, config.interval())
    }

    pub fn state(&self) -> CoordinatorState {
        if self.sync.is_syncing() {
            CoordinatorState::ReconcilingInFlight
        } else {
            CoordinatorState::Idle
        }
    }

    /// Runs until `shutdown` flips to true or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut was_online = *self.online_rx.borrow_and_update();
        let mut timer: Option<Interval> = None;

        info!("🚀 Sync coordinator started");
        if self.session.current().is_some() && was_online {
            self.run_sync("initial load").await;
        }

        loop {
            self.rearm(&mut timer);

            tokio::select! {
                event = self.events.recv() => match event {
                    Ok(SessionEvent::LoggedIn(session)) => {
                        info!("🔑 {} logged in", session.username);
                        self.run_sync("login").await;
                    }
                    Ok(SessionEvent::LoggedOut { manual }) => self.on_logout(manual).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️  Missed {skipped} session events, resyncing from current state");
                        if self.session.current().is_some() {
                            self.run_sync("login").await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = self.online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *self.online_rx.borrow_and_update();
                    if online && !was_online && self.has_queued_work() {
                        self.run_sync("reconnect").await;
                    }
                    was_online = online;
                }
                _ = tick(&mut timer) => self.run_sync("timer").await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("🛑 Sync coordinator stopped");
    }

    fn has_queued_work(&self) -> bool {
        self.session.current().is_some() && self.sync.status().pending_count > 0
    }

    /// The timer exists exactly while a session and connectivity are present.
    fn rearm(&self, timer: &mut Option<Interval>) {
        let wanted = self.interval.filter(|_| self.session.current().is_some() && self.connectivity.is_online());
        match (wanted, timer.is_some()) {
            (Some(period), false) => {
                debug!("Arming sync timer every {period:?}");
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                *timer = Some(ticker);
            }
            (None, true) => {
                debug!("Cancelling sync timer");
                *timer = None;
            }
            _ => {}
        }
    }

    async fn on_logout(&self, manual: bool) {
        if manual {
            if let Err(e) = self.sync.clear_all().await {
                error!("❌ Failed to clear local data after logout: {e:#}");
            }
        } else {
            info!("🔒 Session ended, keeping local tasks for the next login");
        }
    }

    async fn run_sync(&self, reason: &str) {
        debug!("Sync triggered by {reason}");
        match self.sync.sync().await {
            Ok(SyncOutcome::Completed(report)) => {
                info!("✅ Sync ({reason}) done: {} synchronized", report.synchronized());
            }
            Ok(SyncOutcome::InProgress) => debug!("Sync ({reason}) ignored, a pass is already running"),
            Ok(outcome) => debug!("Sync ({reason}) finished: {outcome:?}"),
            Err(e) => error!("❌ Sync ({reason}) failed: {e:#}"),
        }
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
