//! Background tasks that keep the use-count table in sync with the overlay.
//!
//! Shaped after `PseudosettleService::run`: a `tokio::select!` loop reading
//! a broadcast channel, with a `watch<bool>` as the stop signal instead of
//! `pseudosettle`'s oneshot, since this loop needs to keep running across
//! many stop checks rather than exit on the first one.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::init::InitPolicy;
use crate::overlay::Overlay;
use crate::table::UseCountTable;

/// Drive the use-count table's initialization from the overlay's
/// peer-admission stream until `stop` is set or the stream closes.
pub async fn run_added_listener(
    overlay: Arc<dyn Overlay>,
    table: Arc<UseCountTable>,
    policy: InitPolicy,
    mut events: broadcast::Receiver<crate::overlay::AddedPeer>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!("load balancer added-peer listener stopping");
                    return;
                }
            }

            event = events.recv() => {
                match event {
                    Ok(added) => {
                        let initial = policy.initial_count(
                            overlay.as_ref(),
                            &table,
                            &added.peer.overlay,
                            added.proximity_order,
                        );
                        trace!(
                            peer = %added.peer.overlay,
                            po = added.proximity_order,
                            initial_count = initial,
                            "initializing use count for newly admitted peer"
                        );
                        table.init(added.peer.overlay, initial);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "added-peer listener lagged, some admissions were missed");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("added-peer channel closed, stopping listener");
                        return;
                    }
                }
            }
        }
    }
}

/// Drive the use-count table's cleanup from the overlay's peer-departure
/// stream until `stop` is set or the stream closes.
pub async fn run_removed_listener(
    table: Arc<UseCountTable>,
    mut events: broadcast::Receiver<crate::overlay::RemovedPeer>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!("load balancer removed-peer listener stopping");
                    return;
                }
            }

            event = events.recv() => {
                match event {
                    Ok(removed) => {
                        trace!(peer = %removed.peer.overlay, "removing use count for departed peer");
                        table.remove(&removed.peer.overlay);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "removed-peer listener lagged, some departures were missed");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("removed-peer channel closed, stopping listener");
                        return;
                    }
                }
            }
        }
    }
}
