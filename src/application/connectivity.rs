// Connectivity monitor: one boolean, edge-triggered listeners.
//
// Purpose
// - Maintain the last-known "is the network reachable" state and notify
//   subscribers exactly on transitions, not on every check.
//
// Responsibilities
// - Combine the platform-level signal (`report_reachability`) with the
//   outcome of real network calls, because link-layer "online" is necessary
//   but not sufficient (captive portals, server outages).
// - Never touch storage and never initiate a sync; it only observes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::subscriptions::{SubscriberRegistry, Subscription};
use crate::core::ports::{ReachabilityProbe, SubmitError};

pub struct ConnectivityMonitor {
    online: Mutex<bool>,
    listeners: SubscriberRegistry<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: Mutex::new(initially_online),
            listeners: SubscriberRegistry::new(),
        }
    }

    /// Last-known state. Never blocks on the network.
    pub fn is_online(&self) -> bool {
        *self.online.lock().unwrap()
    }

    /// Registers a transition listener. Each listener fires at most once per
    /// transition, with the new state; order across listeners is unspecified.
    pub fn add_listener(&self, callback: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.listeners.subscribe(callback)
    }

    /// Feeds the platform reachability signal in. Listeners are notified only
    /// when the state actually changes, so a flapping source cannot amplify.
    pub fn report_reachability(&self, online: bool) {
        let changed = {
            let mut current = self.online.lock().unwrap();
            let changed = *current != online;
            *current = online;
            changed
        };
        if changed {
            if online {
                tracing::info!("network reachable");
            } else {
                tracing::warn!("network unreachable");
            }
            self.listeners.notify(&online);
        }
    }

    /// A real call over the network succeeded.
    pub fn report_success(&self) {
        self.report_reachability(true);
    }

    /// A submit attempt failed. Degrades to offline only for failure classes
    /// that mean the link itself is gone; a 4xx or 5xx proves the network
    /// round-trip worked.
    pub fn report_submit_error(&self, error: &SubmitError) {
        if error.is_connectivity_loss() {
            self.report_reachability(false);
        } else {
            self.report_reachability(true);
        }
    }
}

/// Recurring reachability probe feeding the monitor. A freshness nicety for
/// the UI, not part of the correctness core; the interval is caller-chosen
/// and the task ends when the monitor is dropped.
pub fn spawn_probe_loop(
    monitor: Arc<ConnectivityMonitor>,
    probe: Arc<dyn ReachabilityProbe>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let monitor = Arc::downgrade(&monitor);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(monitor) = monitor.upgrade() else {
                break;
            };
            let reachable = probe.check().await;
            tracing::debug!(reachable, "reachability probe");
            monitor.report_reachability(reachable);
        }
    })
}
