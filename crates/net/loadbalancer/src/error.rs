//! Error types for the peer load balancer.

/// Errors surfaced by the load balancer's enumeration API.
///
/// The core is designed to be errorless on the hot path (see the crate
/// docs): only capability-filtered enumeration can fail and return
/// `Err(FilteredEnumerationFailure)`. `EventStreamClosed` is never
/// constructed by this crate — a listener losing its event stream is
/// reported via `tracing::warn!` instead (by the time it happens the
/// triggering overlay event has already been consumed, and there is no
/// caller left waiting on a result to hand an error back to) — but the
/// variant is kept so the error type documents every failure mode an
/// `Overlay` implementation might want to surface, not just the one this
/// crate happens to propagate today.
#[derive(Debug, thiserror::Error)]
pub enum LoadBalancerError {
    /// The overlay rejected a capability filter (e.g. an unknown capability
    /// key). The caller receives no bins; there is nothing to retry except
    /// calling again with a known key.
    #[error("overlay rejected capability filter {capability:?}")]
    FilteredEnumerationFailure {
        /// The capability key that was rejected.
        capability: String,
    },
    /// An overlay event stream closed underneath a listener. Logged, not
    /// returned; see the type-level docs.
    #[error("event stream closed: {which}")]
    EventStreamClosed {
        /// Which stream closed (`"added"` or `"removed"`).
        which: &'static str,
    },
}
